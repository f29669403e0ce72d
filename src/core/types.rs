// src/core/types.rs — Core domain types

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::rating::QualityRating;
use crate::provider::Message;

/// What a generator produces: an ordered list of messages.
pub type Response = Vec<Message>;

/// Input to a generation call: plain text or pre-rendered messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageInput {
    Text(String),
    Messages(Vec<Message>),
}

impl MessageInput {
    /// Flatten to text for embedding into prompts.
    pub fn as_request_text(&self) -> String {
        match self {
            MessageInput::Text(text) => text.clone(),
            MessageInput::Messages(messages) => messages
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Convert into the message list sent to a provider.
    pub fn into_messages(self) -> Vec<Message> {
        match self {
            MessageInput::Text(text) => vec![Message::user(text)],
            MessageInput::Messages(messages) => messages,
        }
    }
}

impl From<&str> for MessageInput {
    fn from(s: &str) -> Self {
        MessageInput::Text(s.to_string())
    }
}

impl From<String> for MessageInput {
    fn from(s: String) -> Self {
        MessageInput::Text(s)
    }
}

impl From<Vec<Message>> for MessageInput {
    fn from(messages: Vec<Message>) -> Self {
        MessageInput::Messages(messages)
    }
}

/// Generation preferences passed through untouched to both participants.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RequestParams {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<String>,
}

/// Structured verdict produced by the evaluator for one candidate.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EvaluationResult {
    /// Quality rating of the response
    pub rating: QualityRating,
    /// Specific feedback and suggestions for improvement
    pub feedback: String,
    /// Whether the output needs further improvement
    pub needs_improvement: bool,
    /// Specific areas to focus on in next iteration
    #[serde(default)]
    pub focus_areas: Vec<String>,
}

/// One evaluated attempt within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementRecord {
    /// 1-based
    pub attempt: u32,
    pub response: Response,
    pub evaluation: EvaluationResult,
    pub created_at: DateTime<Utc>,
}

/// Why a session stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RefinementDecision {
    /// Rating reached the configured minimum.
    Accept,
    /// Evaluator said no further improvement is needed.
    Satisfied,
    /// Refinement budget ran out.
    Exhausted,
}

impl std::fmt::Display for RefinementDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefinementDecision::Accept => write!(f, "accept"),
            RefinementDecision::Satisfied => write!(f, "satisfied"),
            RefinementDecision::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Per-call state. Created when a session starts, dropped (or returned) when it ends.
#[derive(Debug, Clone)]
pub struct RefinementSession {
    pub id: String,
    pub records: Vec<RefinementRecord>,
    best_response: Response,
    best_rating: QualityRating,
}

impl RefinementSession {
    /// Seed with the initial, unevaluated response at the floor rating.
    pub fn new(initial: Response) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            records: Vec::new(),
            best_response: initial,
            best_rating: QualityRating::FLOOR,
        }
    }

    /// Append an evaluated attempt. Returns true if it became the new best.
    /// Ties keep the earlier response.
    pub fn record(
        &mut self,
        attempt: u32,
        response: Response,
        evaluation: EvaluationResult,
    ) -> bool {
        let improved = evaluation.rating > self.best_rating;
        if improved {
            self.best_rating = evaluation.rating;
            self.best_response = response.clone();
        }
        self.records.push(RefinementRecord {
            attempt,
            response,
            evaluation,
            created_at: Utc::now(),
        });
        improved
    }

    pub fn best_rating(&self) -> QualityRating {
        self.best_rating
    }

    pub fn best_response(&self) -> &Response {
        &self.best_response
    }

    pub fn finish(self, decision: RefinementDecision) -> RefinementOutcome {
        RefinementOutcome {
            session_id: self.id,
            response: self.best_response,
            best_rating: self.best_rating,
            decision,
            records: self.records,
        }
    }
}

/// Everything a session produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementOutcome {
    pub session_id: String,
    /// Best response seen, not necessarily the last one generated.
    pub response: Response,
    pub best_rating: QualityRating,
    pub decision: RefinementDecision,
    pub records: Vec<RefinementRecord>,
}

/// Real-time progress events emitted by the refiner.
#[derive(Debug, Clone)]
pub enum RefinementEvent {
    InitialResponse {
        messages: usize,
    },
    Evaluated {
        attempt: u32,
        rating: QualityRating,
        needs_improvement: bool,
        feedback: String,
    },
    NewBest {
        attempt: u32,
        rating: QualityRating,
    },
    AcceptableQuality {
        attempt: u32,
        rating: QualityRating,
        needs_improvement: bool,
        min_rating: QualityRating,
    },
    Refined {
        attempt: u32,
        messages: usize,
    },
    Complete {
        evaluations: usize,
        best_rating: QualityRating,
        decision: RefinementDecision,
    },
}

/// Loop limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefinerConfig {
    pub min_rating: QualityRating,
    pub max_refinements: u32,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            min_rating: QualityRating::Good,
            max_refinements: 3,
        }
    }
}

impl From<&crate::infra::config::RefinementConfig> for RefinerConfig {
    fn from(cfg: &crate::infra::config::RefinementConfig) -> Self {
        Self {
            min_rating: cfg.min_rating,
            max_refinements: cfg.max_refinements,
        }
    }
}
