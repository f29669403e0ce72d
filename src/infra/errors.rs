// src/infra/errors.rs — Error types for koi-refine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RefineError {
    // Construction errors (raised before any session starts)
    #[error("Configuration error: {0}")]
    Config(String),

    // Participant errors (propagated unchanged out of a session)
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("Could not coerce response into '{schema}': {message}")]
    Structured { schema: String, message: String },

    #[error("Resource for '{name}' unavailable: {message}")]
    Resource { name: String, message: String },

    // Infra
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RefineError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            RefineError::Provider {
                retriable: true,
                ..
            }
        )
    }

    pub fn config(message: impl Into<String>) -> Self {
        RefineError::Config(message.into())
    }
}
