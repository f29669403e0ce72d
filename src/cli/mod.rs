// src/cli/mod.rs — CLI definition (clap derive)

pub mod progress;
pub mod run;

use clap::Parser;

use crate::core::rating::QualityRating;

#[derive(Parser, Debug)]
#[command(
    name = "koi-refine",
    about = "Generate a response, grade it, refine until it is good enough",
    version
)]
pub struct Cli {
    /// Request to refine
    #[arg(trailing_var_arg = true)]
    pub task: Vec<String>,

    /// Optimizer model (provider/model format)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Evaluator model (defaults to the optimizer model)
    #[arg(long)]
    pub evaluator_model: Option<String>,

    /// Minimum acceptable rating: POOR, FAIR, GOOD or EXCELLENT
    #[arg(short = 'r', long)]
    pub min_rating: Option<QualityRating>,

    /// Max refinement rounds (0 = generate once, no evaluation)
    #[arg(short = 'n', long)]
    pub max_refinements: Option<u32>,

    /// Evaluation criteria for the evaluator
    #[arg(short, long)]
    pub criteria: Option<String>,

    /// System instruction for the optimizer
    #[arg(long)]
    pub instruction: Option<String>,

    /// Print the full outcome (all attempts and ratings) as JSON
    #[arg(long)]
    pub json: bool,

    /// Suppress progress output (only emit final result)
    #[arg(long)]
    pub quiet: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Read the request from stdin
    #[arg(long)]
    pub stdin: bool,

    /// Config file path
    #[arg(long)]
    pub config: Option<String>,
}
