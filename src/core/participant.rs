// src/core/participant.rs — Generator/evaluator adapters, resolved once at construction

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use super::types::{MessageInput, RequestParams, Response};
use crate::infra::errors::RefineError;
use crate::provider::structured::{self, StructuredSchema};
use crate::provider::Message;

/// Name given to the agent built from free-text evaluation criteria.
pub const EVALUATOR_AGENT_NAME: &str = "Evaluator";

/// A bound generation capability (an LLM with its agent configuration applied).
#[async_trait]
pub trait AugmentedLlm: Send + Sync {
    fn name(&self) -> &str;

    fn instruction(&self) -> Option<&str> {
        None
    }

    async fn generate(
        &self,
        message: MessageInput,
        params: Option<&RequestParams>,
    ) -> Result<Response, RefineError>;

    /// Produce a JSON value matching `schema`.
    async fn generate_structured_value(
        &self,
        message: MessageInput,
        schema: &StructuredSchema,
        params: Option<&RequestParams>,
    ) -> Result<serde_json::Value, RefineError>;

    /// Render one message as text. With `content_only`, a message without
    /// content renders as the empty string instead of its debug form.
    fn render(&self, message: &Message, content_only: bool) -> String {
        if !message.content.is_empty() {
            message.content.clone()
        } else if content_only {
            String::new()
        } else {
            message.to_string()
        }
    }
}

/// Opaque token returned by [`ScopedResource::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle(pub u64);

/// A connection or tool lifecycle owned by a participant.
///
/// Acquired around each individual call and released right after, never held
/// across loop iterations.
#[async_trait]
pub trait ScopedResource: Send + Sync {
    async fn acquire(&self) -> Result<ResourceHandle, RefineError>;
    fn release(&self, handle: ResourceHandle);
}

/// Releases its handle on drop, including on error and cancellation paths.
pub struct ResourceGuard {
    resource: Arc<dyn ScopedResource>,
    handle: Option<ResourceHandle>,
}

impl ResourceGuard {
    pub async fn acquire(resource: Arc<dyn ScopedResource>) -> Result<Self, RefineError> {
        let handle = resource.acquire().await?;
        Ok(Self {
            resource,
            handle: Some(handle),
        })
    }
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.resource.release(handle);
        }
    }
}

/// A bare agent definition. Needs an [`LlmFactory`] to become callable.
#[derive(Clone)]
pub struct AgentSpec {
    pub name: String,
    pub instruction: Option<String>,
    pub resource: Option<Arc<dyn ScopedResource>>,
}

impl AgentSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instruction: None,
            resource: None,
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn with_resource(mut self, resource: Arc<dyn ScopedResource>) -> Self {
        self.resource = Some(resource);
        self
    }
}

impl std::fmt::Debug for AgentSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSpec")
            .field("name", &self.name)
            .field("instruction", &self.instruction)
            .field("has_resource", &self.resource.is_some())
            .finish()
    }
}

/// Builds a bound LLM from an agent definition.
pub trait LlmFactory: Send + Sync {
    fn create(&self, agent: &AgentSpec) -> Result<Arc<dyn AugmentedLlm>, RefineError>;
}

impl<F> LlmFactory for F
where
    F: Fn(&AgentSpec) -> Result<Arc<dyn AugmentedLlm>, RefineError> + Send + Sync,
{
    fn create(&self, agent: &AgentSpec) -> Result<Arc<dyn AugmentedLlm>, RefineError> {
        self(agent)
    }
}

/// What may be supplied as the generator.
pub enum OptimizerInput {
    Llm(Arc<dyn AugmentedLlm>),
    Agent(AgentSpec),
}

impl From<Arc<dyn AugmentedLlm>> for OptimizerInput {
    fn from(llm: Arc<dyn AugmentedLlm>) -> Self {
        OptimizerInput::Llm(llm)
    }
}

impl From<AgentSpec> for OptimizerInput {
    fn from(agent: AgentSpec) -> Self {
        OptimizerInput::Agent(agent)
    }
}

/// What may be supplied as the evaluator.
pub enum EvaluatorInput {
    Llm(Arc<dyn AugmentedLlm>),
    Agent(AgentSpec),
    /// Free-text criteria, wrapped into an agent named [`EVALUATOR_AGENT_NAME`].
    Criteria(String),
}

impl From<Arc<dyn AugmentedLlm>> for EvaluatorInput {
    fn from(llm: Arc<dyn AugmentedLlm>) -> Self {
        EvaluatorInput::Llm(llm)
    }
}

impl From<AgentSpec> for EvaluatorInput {
    fn from(agent: AgentSpec) -> Self {
        EvaluatorInput::Agent(agent)
    }
}

impl From<&str> for EvaluatorInput {
    fn from(criteria: &str) -> Self {
        EvaluatorInput::Criteria(criteria.to_string())
    }
}

impl From<String> for EvaluatorInput {
    fn from(criteria: String) -> Self {
        EvaluatorInput::Criteria(criteria)
    }
}

/// Where a resolved participant came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantOrigin {
    Bound,
    Agent,
    Criteria,
}

/// Uniform adapter over a generator or evaluator.
#[derive(Clone)]
pub struct Participant {
    llm: Arc<dyn AugmentedLlm>,
    origin: ParticipantOrigin,
    name: String,
    instruction: Option<String>,
    resource: Option<Arc<dyn ScopedResource>>,
}

impl Participant {
    fn bound(llm: Arc<dyn AugmentedLlm>) -> Self {
        Self {
            name: llm.name().to_string(),
            instruction: llm.instruction().map(str::to_string),
            llm,
            origin: ParticipantOrigin::Bound,
            resource: None,
        }
    }

    fn from_agent(
        agent: AgentSpec,
        factory: Option<&dyn LlmFactory>,
        origin: ParticipantOrigin,
        role: &str,
    ) -> Result<Self, RefineError> {
        if agent.name.trim().is_empty() {
            return Err(RefineError::config(format!("{role} agent has an empty name")));
        }
        let factory = factory.ok_or_else(|| {
            RefineError::config(format!(
                "llm_factory is required when the {role} is an agent ('{}')",
                agent.name
            ))
        })?;
        let llm = factory.create(&agent)?;
        Ok(Self {
            llm,
            origin,
            name: agent.name,
            instruction: agent.instruction,
            resource: agent.resource,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instruction(&self) -> Option<&str> {
        self.instruction.as_deref()
    }

    pub fn origin(&self) -> ParticipantOrigin {
        self.origin
    }

    pub fn has_resource(&self) -> bool {
        self.resource.is_some()
    }

    async fn scope(&self) -> Result<Option<ResourceGuard>, RefineError> {
        match &self.resource {
            Some(resource) => Ok(Some(ResourceGuard::acquire(resource.clone()).await?)),
            None => Ok(None),
        }
    }

    pub async fn generate(
        &self,
        message: MessageInput,
        params: Option<&RequestParams>,
    ) -> Result<Response, RefineError> {
        let _guard = self.scope().await?;
        self.llm.generate(message, params).await
    }

    pub async fn generate_structured<T>(
        &self,
        message: MessageInput,
        params: Option<&RequestParams>,
    ) -> Result<T, RefineError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let schema = StructuredSchema::of::<T>();
        let value = self
            .generate_structured_value(message, &schema, params)
            .await?;
        structured::from_value(value, &schema.name)
    }

    /// Untyped form of [`Participant::generate_structured`].
    pub async fn generate_structured_value(
        &self,
        message: MessageInput,
        schema: &StructuredSchema,
        params: Option<&RequestParams>,
    ) -> Result<serde_json::Value, RefineError> {
        let _guard = self.scope().await?;
        self.llm
            .generate_structured_value(message, schema, params)
            .await
    }

    pub fn render(&self, message: &Message, content_only: bool) -> String {
        self.llm.render(message, content_only)
    }

    /// Full response as prompt text, one rendered message per line.
    pub fn render_response(&self, response: &Response) -> String {
        response
            .iter()
            .map(|m| self.render(m, false))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl std::fmt::Debug for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Participant")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("has_resource", &self.resource.is_some())
            .finish()
    }
}

pub fn resolve_optimizer(
    input: OptimizerInput,
    factory: Option<&dyn LlmFactory>,
) -> Result<Participant, RefineError> {
    match input {
        OptimizerInput::Llm(llm) => Ok(Participant::bound(llm)),
        OptimizerInput::Agent(agent) => {
            Participant::from_agent(agent, factory, ParticipantOrigin::Agent, "optimizer")
        }
    }
}

pub fn resolve_evaluator(
    input: EvaluatorInput,
    factory: Option<&dyn LlmFactory>,
) -> Result<Participant, RefineError> {
    match input {
        EvaluatorInput::Llm(llm) => Ok(Participant::bound(llm)),
        EvaluatorInput::Agent(agent) => {
            Participant::from_agent(agent, factory, ParticipantOrigin::Agent, "evaluator")
        }
        EvaluatorInput::Criteria(criteria) => Participant::from_agent(
            AgentSpec::new(EVALUATOR_AGENT_NAME).with_instruction(criteria),
            factory,
            ParticipantOrigin::Criteria,
            "evaluator",
        ),
    }
}
