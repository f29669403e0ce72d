// src/core/mod.rs — Refinement engine

pub mod participant;
pub mod projection;
pub mod prompts;
pub mod rating;
pub mod refiner;
pub mod types;

pub use participant::{
    AgentSpec, AugmentedLlm, EvaluatorInput, LlmFactory, OptimizerInput, Participant,
    ResourceHandle, ScopedResource,
};
pub use rating::QualityRating;
pub use refiner::{Refiner, RefinerBuilder};
