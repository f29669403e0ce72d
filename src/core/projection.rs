// src/core/projection.rs — Render the refined response as text or a typed value

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::field::Empty;
use tracing::Instrument;

use super::refiner::{record_request_params, Refiner};
use super::types::{MessageInput, RequestParams, Response};
use crate::infra::errors::RefineError;

/// Outcome of serializing a structured result for the trace.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceRecord {
    /// JSON form of the coerced value.
    Structured(String),
    /// Serialization failed; the plain text the value was coerced from.
    Unstructured(String),
}

impl TraceRecord {
    pub fn for_value<T: Serialize>(value: &T, fallback_text: &str) -> Self {
        match serde_json::to_string(value) {
            Ok(json) => TraceRecord::Structured(json),
            Err(e) => {
                tracing::warn!("Structured response not serializable for trace: {}", e);
                TraceRecord::Unstructured(fallback_text.to_string())
            }
        }
    }
}

impl Refiner {
    /// Join the content of each message, skipping empty ones.
    pub fn render_text(&self, response: &Response) -> String {
        response
            .iter()
            .map(|m| self.optimizer.render(m, true))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Refine, then return the best response as plain text.
    pub async fn generate_str(
        &self,
        message: impl Into<MessageInput>,
        params: Option<&RequestParams>,
    ) -> Result<String, RefineError> {
        let span = tracing::info_span!(
            "refiner.generate_str",
            refiner = %self.name(),
            agent_name = %self.optimizer.name(),
            request_params = Empty,
            response = Empty,
        );
        record_request_params(&span, params);

        let response = self
            .generate(message, params)
            .instrument(span.clone())
            .await?;
        let text = self.render_text(&response);

        span.record("response", text.as_str());
        Ok(text)
    }

    /// Refine, then have the optimizer coerce the text into `T`.
    pub async fn generate_structured<T>(
        &self,
        message: impl Into<MessageInput>,
        params: Option<&RequestParams>,
    ) -> Result<T, RefineError>
    where
        T: DeserializeOwned + Serialize + JsonSchema,
    {
        let span = tracing::info_span!(
            "refiner.generate_structured",
            refiner = %self.name(),
            agent_name = %self.optimizer.name(),
            request_params = Empty,
            response_model = %T::schema_name(),
            structured_response_json = Empty,
            unstructured_response = Empty,
        );
        record_request_params(&span, params);

        let text = self
            .generate_str(message, params)
            .instrument(span.clone())
            .await?;
        let result: T = self
            .optimizer
            .generate_structured(text.clone().into(), params)
            .instrument(span.clone())
            .await?;

        match TraceRecord::for_value(&result, &text) {
            TraceRecord::Structured(json) => {
                span.record("structured_response_json", json.as_str());
            }
            TraceRecord::Unstructured(raw) => {
                span.record("unstructured_response", raw.as_str());
            }
        }

        Ok(result)
    }
}
