// src/provider/openai_compat.rs — OpenAI-compatible chat completions provider
//
// Works with OpenAI, Ollama (/v1), Groq, DeepSeek, OpenRouter and any other
// endpoint that speaks `POST {base_url}/chat/completions`.

use std::time::Duration;

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, ModelProvider, StopReason, TokenUsage};
use crate::infra::errors::RefineError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

pub struct OpenAICompatProvider {
    id_str: String,
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAICompatProvider {
    pub fn new(id: impl Into<String>, api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            id_str: id.into(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn provider_error(&self, message: impl Into<String>, retriable: bool) -> RefineError {
        RefineError::Provider {
            provider: self.id_str.clone(),
            message: message.into(),
            retriable,
        }
    }
}

/// Request body for `/chat/completions`.
pub fn build_request_body(request: &ChatRequest) -> serde_json::Value {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = &request.system {
        messages.push(serde_json::json!({"role": "system", "content": system}));
    }
    for m in &request.messages {
        messages.push(serde_json::json!({
            "role": m.role.as_str(),
            "content": m.content,
        }));
    }

    let mut body = serde_json::json!({
        "model": request.model,
        "messages": messages,
    });
    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = serde_json::json!(max_tokens);
    }
    if let Some(temp) = request.temperature {
        body["temperature"] = serde_json::json!(temp);
    }
    body
}

/// Pull content, usage and stop reason out of a completion response.
pub fn parse_response_body(resp: &serde_json::Value) -> ChatResponse {
    let choice = &resp["choices"][0];
    ChatResponse {
        content: choice["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string(),
        usage: TokenUsage {
            input_tokens: resp["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: resp["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
        },
        stop_reason: StopReason::from_finish_reason(choice["finish_reason"].as_str()),
    }
}

#[async_trait]
impl ModelProvider for OpenAICompatProvider {
    fn id(&self) -> &str {
        &self.id_str
    }

    fn name(&self) -> &str {
        "OpenAI-compatible"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, RefineError> {
        let body = build_request_body(&request);

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header(
                "User-Agent",
                format!("koi-refine/{}", env!("CARGO_PKG_VERSION")),
            )
            .timeout(REQUEST_TIMEOUT)
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.provider_error(e.to_string(), e.is_timeout() || e.is_connect()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(self.provider_error(
                format!("HTTP {status}: {error_body}"),
                status.as_u16() == 429 || status.is_server_error(),
            ));
        }

        let resp: serde_json::Value = response
            .json()
            .await
            .map_err(|e| self.provider_error(e.to_string(), false))?;

        Ok(parse_response_body(&resp))
    }
}
