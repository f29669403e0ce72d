// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::rating::QualityRating;
use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub refinement: RefinementConfig,

    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub optimizer: OptimizerConfig,

    #[serde(default)]
    pub evaluator: EvaluatorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementConfig {
    #[serde(default = "default_min_rating")]
    pub min_rating: QualityRating,
    #[serde(default = "default_max_refinements")]
    pub max_refinements: u32,
}

fn default_min_rating() -> QualityRating {
    QualityRating::Good
}

fn default_max_refinements() -> u32 {
    3
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            min_rating: default_min_rating(),
            max_refinements: default_max_refinements(),
        }
    }
}

/// Models in "provider/model" form. The evaluator falls back to the optimizer's model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub optimizer: Option<String>,
    pub evaluator: Option<String>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            optimizer: Some("openai/gpt-4.1-mini".into()),
            evaluator: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Name of the env var holding the API key. Unset key means no auth header.
    pub api_key_env: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key_env: "OPENAI_API_KEY".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub name: String,
    pub instruction: Option<String>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            name: "optimizer".into(),
            instruction: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    pub criteria: String,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            criteria: "Judge whether the response fully and accurately answers the request, \
                       is clearly written, and contains nothing irrelevant."
                .into(),
        }
    }
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        match paths::config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
