// src/provider/llm.rs — Bind an agent definition to a model provider

use std::sync::Arc;

use async_trait::async_trait;

use super::structured::{extract_json, StructuredSchema};
use super::{ChatRequest, Message, ModelProvider};
use crate::core::participant::{AgentSpec, AugmentedLlm, LlmFactory};
use crate::core::types::{MessageInput, RequestParams, Response};
use crate::infra::errors::RefineError;

const DEFAULT_MAX_TOKENS: u32 = 4096;
const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Structured answers are graded/parsed, keep them close to deterministic.
const STRUCTURED_TEMPERATURE: f32 = 0.1;

/// An [`AugmentedLlm`] backed by a [`ModelProvider`].
pub struct ProviderLlm {
    provider: Arc<dyn ModelProvider>,
    model: String,
    name: String,
    instruction: Option<String>,
}

impl ProviderLlm {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        model: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            name: name.into(),
            instruction: None,
        }
    }

    pub fn with_instruction(mut self, instruction: Option<String>) -> Self {
        self.instruction = instruction;
        self
    }

    fn build_request(
        &self,
        messages: Vec<Message>,
        params: Option<&RequestParams>,
        temperature: f32,
    ) -> ChatRequest {
        let system = match (
            self.instruction.as_deref(),
            params.and_then(|p| p.system_prompt.as_deref()),
        ) {
            (Some(a), Some(b)) => Some(format!("{a}\n\n{b}")),
            (Some(a), None) => Some(a.to_string()),
            (None, Some(b)) => Some(b.to_string()),
            (None, None) => None,
        };

        ChatRequest {
            model: params
                .and_then(|p| p.model.clone())
                .unwrap_or_else(|| self.model.clone()),
            messages,
            max_tokens: Some(
                params
                    .and_then(|p| p.max_tokens)
                    .unwrap_or(DEFAULT_MAX_TOKENS),
            ),
            temperature: Some(params.and_then(|p| p.temperature).unwrap_or(temperature)),
            system,
        }
    }
}

#[async_trait]
impl AugmentedLlm for ProviderLlm {
    fn name(&self) -> &str {
        &self.name
    }

    fn instruction(&self) -> Option<&str> {
        self.instruction.as_deref()
    }

    async fn generate(
        &self,
        message: MessageInput,
        params: Option<&RequestParams>,
    ) -> Result<Response, RefineError> {
        let request = self.build_request(message.into_messages(), params, DEFAULT_TEMPERATURE);
        let response = self.provider.chat(request).await?;
        tracing::debug!(
            agent = %self.name,
            provider = %self.provider.id(),
            tokens = response.usage.total(),
            stop_reason = ?response.stop_reason,
            "Generation complete",
        );
        if response.stop_reason.is_truncated() {
            tracing::warn!(agent = %self.name, "Response cut off at the max_tokens limit");
        }
        Ok(vec![Message::assistant(response.content)])
    }

    async fn generate_structured_value(
        &self,
        message: MessageInput,
        schema: &StructuredSchema,
        params: Option<&RequestParams>,
    ) -> Result<serde_json::Value, RefineError> {
        let mut messages = message.into_messages();
        messages.push(Message::user(schema.instruction()));

        let request = self.build_request(messages, params, STRUCTURED_TEMPERATURE);
        let response = self.provider.chat(request).await?;
        if response.stop_reason.is_truncated() {
            tracing::warn!(
                agent = %self.name,
                schema = %schema.name,
                "Structured response cut off at the max_tokens limit",
            );
        }

        extract_json(&response.content).ok_or_else(|| RefineError::Structured {
            schema: schema.name.clone(),
            message: format!(
                "model '{}' did not return JSON: {}",
                self.name,
                truncate(&response.content, 200)
            ),
        })
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Builds [`ProviderLlm`]s for agent definitions, all on one provider/model.
pub struct ProviderFactory {
    provider: Arc<dyn ModelProvider>,
    model: String,
}

impl ProviderFactory {
    pub fn new(provider: Arc<dyn ModelProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

impl LlmFactory for ProviderFactory {
    fn create(&self, agent: &AgentSpec) -> Result<Arc<dyn AugmentedLlm>, RefineError> {
        Ok(Arc::new(
            ProviderLlm::new(self.provider.clone(), self.model.clone(), agent.name.clone())
                .with_instruction(agent.instruction.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::EvaluationResult;
    use crate::provider::{ChatResponse, Role, StopReason, TokenUsage};
    use std::sync::Mutex;

    /// Returns a fixed reply and keeps every request it saw.
    struct RecordingProvider {
        reply: String,
        stop_reason: StopReason,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl RecordingProvider {
        fn new(reply: &str) -> Arc<Self> {
            Self::stopping(reply, StopReason::EndTurn)
        }

        fn stopping(reply: &str, stop_reason: StopReason) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.into(),
                stop_reason,
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ModelProvider for RecordingProvider {
        fn id(&self) -> &str {
            "recording"
        }

        fn name(&self) -> &str {
            "Recording Provider"
        }

        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, RefineError> {
            self.requests.lock().unwrap().push(request);
            Ok(ChatResponse {
                content: self.reply.clone(),
                usage: TokenUsage {
                    input_tokens: 10,
                    output_tokens: 5,
                },
                stop_reason: self.stop_reason.clone(),
            })
        }
    }

    #[tokio::test]
    async fn test_generate_uses_instruction_as_system() {
        let provider = RecordingProvider::new("Bonjour");
        let factory = ProviderFactory::new(provider.clone(), "mock-model");
        let llm = factory
            .create(&AgentSpec::new("translator").with_instruction("Translate to French"))
            .unwrap();

        let out = llm.generate("Hello".into(), None).await.unwrap();

        assert_eq!(out, vec![Message::assistant("Bonjour")]);
        let reqs = provider.requests.lock().unwrap();
        assert_eq!(reqs[0].system.as_deref(), Some("Translate to French"));
        assert_eq!(reqs[0].model, "mock-model");
        assert_eq!(reqs[0].messages[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_request_params_override() {
        let provider = RecordingProvider::new("ok");
        let llm = ProviderLlm::new(provider.clone(), "default-model", "w");
        let params = RequestParams {
            model: Some("other-model".into()),
            temperature: Some(0.0),
            max_tokens: Some(64),
            system_prompt: Some("Be brief".into()),
        };

        llm.generate("Hi".into(), Some(&params)).await.unwrap();

        let reqs = provider.requests.lock().unwrap();
        assert_eq!(reqs[0].model, "other-model");
        assert_eq!(reqs[0].temperature, Some(0.0));
        assert_eq!(reqs[0].max_tokens, Some(64));
        assert_eq!(reqs[0].system.as_deref(), Some("Be brief"));
    }

    #[tokio::test]
    async fn test_structured_value_parsed_from_fence() {
        let provider = RecordingProvider::new(
            "```json\n{\"rating\": \"EXCELLENT\", \"feedback\": \"\", \"needs_improvement\": false}\n```",
        );
        let llm = ProviderLlm::new(provider.clone(), "m", "Evaluator");
        let schema = StructuredSchema::of::<EvaluationResult>();

        let v = llm
            .generate_structured_value("grade this".into(), &schema, None)
            .await
            .unwrap();

        assert_eq!(v["rating"], "EXCELLENT");
        let reqs = provider.requests.lock().unwrap();
        assert_eq!(reqs[0].messages.len(), 2);
        assert!(reqs[0].messages[1].content.contains("JSON schema"));
        assert_eq!(reqs[0].temperature, Some(STRUCTURED_TEMPERATURE));
    }

    #[tokio::test]
    async fn test_structured_value_without_json_errors() {
        let provider = RecordingProvider::new("I think it is good.");
        let llm = ProviderLlm::new(provider, "m", "Evaluator");
        let schema = StructuredSchema::of::<EvaluationResult>();

        let err = llm
            .generate_structured_value("grade".into(), &schema, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RefineError::Structured { .. }));
    }

    #[tokio::test]
    async fn test_truncated_generation_still_returned() {
        let provider = RecordingProvider::stopping("Once upon a", StopReason::MaxTokens);
        let llm = ProviderLlm::new(provider, "m", "writer");

        let out = llm.generate("Tell a story".into(), None).await.unwrap();

        assert_eq!(out, vec![Message::assistant("Once upon a")]);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
