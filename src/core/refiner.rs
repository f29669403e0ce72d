// src/core/refiner.rs — Evaluator-optimizer refinement controller

use std::sync::Arc;

use async_trait::async_trait;
use tracing::field::Empty;
use tracing::{Instrument, Span};

use super::participant::{
    resolve_evaluator, resolve_optimizer, AugmentedLlm, EvaluatorInput, LlmFactory,
    OptimizerInput, Participant,
};
use super::prompts::{build_eval_prompt, build_refinement_prompt};
use super::rating::QualityRating;
use super::types::*;
use crate::infra::errors::RefineError;
use crate::provider::structured::StructuredSchema;
use crate::provider::Message;

type ProgressFn = Box<dyn Fn(RefinementEvent) + Send + Sync>;

/// Drives the generate → evaluate → refine loop.
///
/// Long-lived and reusable: every call builds its own [`RefinementSession`],
/// so concurrent calls on one instance do not interfere.
pub struct Refiner {
    name: String,
    pub(crate) optimizer: Participant,
    evaluator: Participant,
    config: RefinerConfig,
    /// Optional callback for real-time progress events.
    on_progress: Option<ProgressFn>,
}

/// Collects construction inputs; participants are resolved in [`RefinerBuilder::build`].
pub struct RefinerBuilder {
    optimizer: OptimizerInput,
    evaluator: EvaluatorInput,
    name: Option<String>,
    config: RefinerConfig,
    llm_factory: Option<Arc<dyn LlmFactory>>,
}

impl RefinerBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn min_rating(mut self, rating: QualityRating) -> Self {
        self.config.min_rating = rating;
        self
    }

    pub fn max_refinements(mut self, n: u32) -> Self {
        self.config.max_refinements = n;
        self
    }

    pub fn config(mut self, config: RefinerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn llm_factory(mut self, factory: impl LlmFactory + 'static) -> Self {
        self.llm_factory = Some(Arc::new(factory));
        self
    }

    /// Resolve both participants. Fails if an agent is given without a factory.
    pub fn build(self) -> Result<Refiner, RefineError> {
        let factory = self.llm_factory.as_deref();
        let optimizer = resolve_optimizer(self.optimizer, factory)?;
        let evaluator = resolve_evaluator(self.evaluator, factory)?;
        let name = self.name.unwrap_or_else(|| optimizer.name().to_string());

        tracing::debug!(
            refiner = %name,
            optimizer = %optimizer.name(),
            evaluator = %evaluator.name(),
            optimizer_scoped = optimizer.has_resource(),
            evaluator_scoped = evaluator.has_resource(),
            min_rating = %self.config.min_rating,
            max_refinements = self.config.max_refinements,
            "Refiner constructed",
        );

        Ok(Refiner {
            name,
            optimizer,
            evaluator,
            config: self.config,
            on_progress: None,
        })
    }
}

impl Refiner {
    pub fn builder(
        optimizer: impl Into<OptimizerInput>,
        evaluator: impl Into<EvaluatorInput>,
    ) -> RefinerBuilder {
        RefinerBuilder {
            optimizer: optimizer.into(),
            evaluator: evaluator.into(),
            name: None,
            config: RefinerConfig::default(),
            llm_factory: None,
        }
    }

    /// Set a callback for real-time progress events.
    pub fn with_progress(mut self, cb: impl Fn(RefinementEvent) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(cb));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The optimizer's instruction, if it has one.
    pub fn instruction(&self) -> Option<&str> {
        self.optimizer.instruction()
    }

    pub fn config(&self) -> RefinerConfig {
        self.config
    }

    pub fn optimizer(&self) -> &Participant {
        &self.optimizer
    }

    pub fn evaluator(&self) -> &Participant {
        &self.evaluator
    }

    fn emit(&self, event: RefinementEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    /// Run a session and return only the best response.
    pub async fn generate(
        &self,
        message: impl Into<MessageInput>,
        params: Option<&RequestParams>,
    ) -> Result<Response, RefineError> {
        Ok(self.refine(message, params).await?.response)
    }

    /// Run a session and return the best response together with its audit trail.
    pub async fn refine(
        &self,
        message: impl Into<MessageInput>,
        params: Option<&RequestParams>,
    ) -> Result<RefinementOutcome, RefineError> {
        let span = tracing::info_span!(
            "refiner.generate",
            refiner = %self.name,
            agent_name = %self.optimizer.name(),
            request_params = Empty,
            best_rating = Empty,
        );
        record_request_params(&span, params);

        let outcome = self
            .run_session(message.into(), params)
            .instrument(span.clone())
            .await?;
        span.record("best_rating", tracing::field::display(outcome.best_rating));
        Ok(outcome)
    }

    async fn run_session(
        &self,
        message: MessageInput,
        params: Option<&RequestParams>,
    ) -> Result<RefinementOutcome, RefineError> {
        let original_request = message.as_request_text();
        let criteria = self.evaluator.instruction().unwrap_or_default();
        let min_rating = self.config.min_rating;

        // 1. Initial generation
        let mut response = self.optimizer.generate(message, params).await?;
        tracing::debug!(messages = response.len(), "Initial response generated");
        self.emit(RefinementEvent::InitialResponse {
            messages: response.len(),
        });

        let mut session = RefinementSession::new(response.clone());
        let mut decision = RefinementDecision::Exhausted;
        let mut refinement_count: u32 = 0;

        // 2. Evaluate / refine loop
        while refinement_count < self.config.max_refinements {
            let attempt = refinement_count + 1;
            let current_text = self.optimizer.render_response(&response);

            let eval_prompt =
                build_eval_prompt(criteria, &original_request, &current_text, attempt);
            let evaluation: EvaluationResult = self
                .evaluator
                .generate_structured(eval_prompt.into(), params)
                .await?;

            tracing::debug!(
                event = "evaluation_result",
                refinement = refinement_count,
                attempt,
                rating = %evaluation.rating,
                needs_improvement = evaluation.needs_improvement,
                feedback = %evaluation.feedback,
                focus_areas = ?evaluation.focus_areas,
                "Evaluator result",
            );
            self.emit(RefinementEvent::Evaluated {
                attempt,
                rating: evaluation.rating,
                needs_improvement: evaluation.needs_improvement,
                feedback: evaluation.feedback.clone(),
            });

            let rating = evaluation.rating;
            let needs_improvement = evaluation.needs_improvement;

            if session.record(attempt, response.clone(), evaluation.clone()) {
                tracing::debug!(
                    event = "new_best_response",
                    refinement = refinement_count,
                    rating = %rating,
                    "New best response",
                );
                self.emit(RefinementEvent::NewBest { attempt, rating });
            }

            if rating >= min_rating || !needs_improvement {
                decision = if rating >= min_rating {
                    RefinementDecision::Accept
                } else {
                    RefinementDecision::Satisfied
                };
                tracing::info!(
                    event = "acceptable_quality_reached",
                    refinement = refinement_count,
                    rating = %rating,
                    needs_improvement,
                    min_rating = %min_rating,
                    "Acceptable quality {} reached",
                    rating,
                );
                self.emit(RefinementEvent::AcceptableQuality {
                    attempt,
                    rating,
                    needs_improvement,
                    min_rating,
                });
                break;
            }

            // 3. Refine
            let refinement_prompt =
                build_refinement_prompt(&original_request, &current_text, &evaluation, attempt);
            response = self
                .optimizer
                .generate(refinement_prompt.into(), params)
                .await?;

            tracing::debug!(
                event = "optimizer_response",
                refinement = refinement_count,
                messages = response.len(),
                "Optimizer result",
            );
            self.emit(RefinementEvent::Refined {
                attempt,
                messages: response.len(),
            });

            refinement_count += 1;
        }

        tracing::debug!(
            best_rating = %session.best_rating(),
            evaluations = session.records.len(),
            decision = %decision,
            "Refinement finished",
        );
        self.emit(RefinementEvent::Complete {
            evaluations: session.records.len(),
            best_rating: session.best_rating(),
            decision,
        });

        Ok(session.finish(decision))
    }
}

/// Annotate an entry span with the caller's request params, when given.
pub(crate) fn record_request_params(span: &Span, params: Option<&RequestParams>) {
    if let Some(p) = params {
        span.record("request_params", tracing::field::debug(p));
    }
}

/// A refiner is itself a generator, so it can be the optimizer of an outer refiner.
#[async_trait]
impl AugmentedLlm for Refiner {
    fn name(&self) -> &str {
        Refiner::name(self)
    }

    fn instruction(&self) -> Option<&str> {
        Refiner::instruction(self)
    }

    async fn generate(
        &self,
        message: MessageInput,
        params: Option<&RequestParams>,
    ) -> Result<Response, RefineError> {
        Refiner::generate(self, message, params).await
    }

    async fn generate_structured_value(
        &self,
        message: MessageInput,
        schema: &StructuredSchema,
        params: Option<&RequestParams>,
    ) -> Result<serde_json::Value, RefineError> {
        let text = self.generate_str(message, params).await?;
        self.optimizer
            .generate_structured_value(text.into(), schema, params)
            .await
    }

    fn render(&self, message: &Message, content_only: bool) -> String {
        self.optimizer.render(message, content_only)
    }
}

impl std::fmt::Debug for Refiner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Refiner")
            .field("name", &self.name)
            .field("optimizer", &self.optimizer)
            .field("evaluator", &self.evaluator)
            .field("config", &self.config)
            .finish()
    }
}
