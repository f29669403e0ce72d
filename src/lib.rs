// src/lib.rs — Library root for koi-refine

pub mod cli;
pub mod core;
pub mod infra;
pub mod provider;
