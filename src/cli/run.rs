// src/cli/run.rs — Default command: refine a request

use std::sync::Arc;

use anyhow::Context;
use tokio::io::AsyncReadExt;

use super::Cli;
use crate::core::participant::{AgentSpec, AugmentedLlm, EvaluatorInput};
use crate::core::refiner::Refiner;
use crate::core::types::RefinerConfig;
use crate::infra::config::Config;
use crate::provider::llm::{ProviderFactory, ProviderLlm};
use crate::provider::openai_compat::OpenAICompatProvider;
use crate::provider::{ModelProvider, ModelRef};

/// Which models each participant runs on.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelChoice {
    pub optimizer: ModelRef,
    pub evaluator: ModelRef,
}

/// CLI flag > config > default. A bare optimizer model name is assumed to be on
/// "openai"; a bare evaluator model name inherits the optimizer's provider.
///
/// Both participants talk to the single configured endpoint, so naming two
/// different providers is an error.
pub fn choose_models(cli: &Cli, config: &Config) -> anyhow::Result<ModelChoice> {
    let parse = |s: &str, provider: &str| {
        ModelRef::parse(s).unwrap_or_else(|| ModelRef::new(provider, s))
    };

    let optimizer = cli
        .model
        .as_deref()
        .or(config.models.optimizer.as_deref())
        .map(|s| parse(s, "openai"))
        .context("No optimizer model configured. Pass --model provider/model.")?;
    let evaluator = cli
        .evaluator_model
        .as_deref()
        .or(config.models.evaluator.as_deref())
        .map(|s| parse(s, &optimizer.provider))
        .unwrap_or_else(|| optimizer.clone());

    if evaluator.provider != optimizer.provider {
        anyhow::bail!(
            "Evaluator model '{}' is on a different provider than optimizer model '{}'. \
             Both are served from [provider].base_url; use models from the same provider.",
            evaluator,
            optimizer
        );
    }

    Ok(ModelChoice {
        optimizer,
        evaluator,
    })
}

/// Merge CLI overrides into the configured loop limits.
pub fn refiner_config(cli: &Cli, config: &Config) -> RefinerConfig {
    let mut cfg = RefinerConfig::from(&config.refinement);
    if let Some(rating) = cli.min_rating {
        cfg.min_rating = rating;
    }
    if let Some(n) = cli.max_refinements {
        cfg.max_refinements = n;
    }
    cfg
}

/// Build the refiner: optimizer as an agent, evaluator from criteria.
///
/// When the evaluator uses a different model than the optimizer it is bound
/// directly instead of going through the shared factory.
pub fn build_refiner(
    cli: &Cli,
    config: &Config,
    provider: Arc<dyn ModelProvider>,
    models: &ModelChoice,
) -> anyhow::Result<Refiner> {
    let criteria = cli
        .criteria
        .clone()
        .unwrap_or_else(|| config.evaluator.criteria.clone());
    let instruction = cli
        .instruction
        .clone()
        .or_else(|| config.optimizer.instruction.clone());

    let mut optimizer = AgentSpec::new(config.optimizer.name.clone());
    if let Some(instruction) = instruction {
        optimizer = optimizer.with_instruction(instruction);
    }

    let evaluator: EvaluatorInput = if models.evaluator == models.optimizer {
        EvaluatorInput::Criteria(criteria)
    } else {
        let llm: Arc<dyn AugmentedLlm> = Arc::new(
            ProviderLlm::new(provider.clone(), models.evaluator.model.clone(), "Evaluator")
                .with_instruction(Some(criteria)),
        );
        EvaluatorInput::Llm(llm)
    };

    let refiner = Refiner::builder(optimizer, evaluator)
        .config(refiner_config(cli, config))
        .llm_factory(ProviderFactory::new(provider, models.optimizer.model.clone()))
        .build()?;
    Ok(refiner)
}

async fn read_task(cli: &Cli) -> anyhow::Result<String> {
    if cli.stdin {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        return Ok(buf.trim().to_string());
    }
    Ok(cli.task.join(" "))
}

/// Run one refinement session and print the result to stdout.
pub async fn run_refinement(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let task = read_task(cli).await?;
    if task.is_empty() {
        anyhow::bail!("Nothing to refine. Pass a request or use --stdin.");
    }

    let models = choose_models(cli, config)?;
    let api_key = std::env::var(&config.provider.api_key_env).ok();
    if api_key.is_none() {
        tracing::warn!(
            "{} is not set; sending requests without an API key",
            config.provider.api_key_env
        );
    }
    let provider = OpenAICompatProvider::new(
        models.optimizer.provider.clone(),
        api_key,
        config.provider.base_url.clone(),
    );
    tracing::debug!(
        provider = %models.optimizer.provider,
        base_url = %provider.base_url(),
        "Using OpenAI-compatible endpoint",
    );
    let provider: Arc<dyn ModelProvider> = Arc::new(provider);

    let mut refiner = build_refiner(cli, config, provider, &models)?;
    if !cli.quiet {
        refiner = refiner.with_progress(super::progress::terminal_progress());
        eprintln!(
            "[refine] optimizer: {} | evaluator: {} | min: {} | max rounds: {}",
            models.optimizer,
            models.evaluator,
            refiner.config().min_rating,
            refiner.config().max_refinements,
        );
    }

    let outcome = refiner.refine(task, None).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", refiner.render_text(&outcome.response));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::participant::ParticipantOrigin;
    use crate::core::rating::QualityRating;
    use clap::Parser;

    struct NoProvider;

    #[async_trait::async_trait]
    impl ModelProvider for NoProvider {
        fn id(&self) -> &str {
            "none"
        }

        fn name(&self) -> &str {
            "None"
        }

        async fn chat(
            &self,
            _request: crate::provider::ChatRequest,
        ) -> Result<crate::provider::ChatResponse, crate::infra::errors::RefineError> {
            Err(crate::infra::errors::RefineError::Provider {
                provider: "none".into(),
                message: "offline".into(),
                retriable: false,
            })
        }
    }

    #[test]
    fn test_models_default_from_config() {
        let cli = Cli::parse_from(["koi-refine", "x"]);
        let models = choose_models(&cli, &Config::default()).unwrap();
        assert_eq!(models.optimizer, ModelRef::new("openai", "gpt-4.1-mini"));
        assert_eq!(models.evaluator, models.optimizer);
    }

    #[test]
    fn test_models_cli_override() {
        let cli = Cli::parse_from([
            "koi-refine",
            "--model",
            "ollama/llama3.1",
            "--evaluator-model",
            "qwen2.5",
            "x",
        ]);
        let models = choose_models(&cli, &Config::default()).unwrap();
        assert_eq!(models.optimizer, ModelRef::new("ollama", "llama3.1"));
        assert_eq!(models.evaluator, ModelRef::new("ollama", "qwen2.5"));
    }

    #[test]
    fn test_models_mixed_providers_rejected() {
        let cli = Cli::parse_from(["koi-refine", "--evaluator-model", "anthropic/claude", "x"]);
        let err = choose_models(&cli, &Config::default()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("anthropic/claude"));
        assert!(msg.contains("openai/gpt-4.1-mini"));
    }

    #[test]
    fn test_models_mixed_providers_from_config_rejected() {
        let cli = Cli::parse_from(["koi-refine", "x"]);
        let mut config = Config::default();
        config.models.optimizer = Some("ollama/llama3.1".into());
        config.models.evaluator = Some("openai/gpt-4.1".into());
        assert!(choose_models(&cli, &config).is_err());
    }

    #[test]
    fn test_refiner_config_overrides() {
        let cli = Cli::parse_from(["koi-refine", "-r", "fair", "-n", "0", "x"]);
        let cfg = refiner_config(&cli, &Config::default());
        assert_eq!(cfg.min_rating, QualityRating::Fair);
        assert_eq!(cfg.max_refinements, 0);
    }

    #[test]
    fn test_build_refiner_same_model_uses_criteria() {
        let cli = Cli::parse_from(["koi-refine", "--criteria", "be exact", "x"]);
        let config = Config::default();
        let models = choose_models(&cli, &config).unwrap();
        let r = build_refiner(&cli, &config, Arc::new(NoProvider), &models).unwrap();
        assert_eq!(r.name(), "optimizer");
        assert_eq!(r.evaluator().origin(), ParticipantOrigin::Criteria);
        assert_eq!(r.evaluator().instruction(), Some("be exact"));
    }

    #[test]
    fn test_build_refiner_distinct_evaluator_is_bound() {
        let cli = Cli::parse_from(["koi-refine", "--evaluator-model", "openai/gpt-4.1", "x"]);
        let config = Config::default();
        let models = choose_models(&cli, &config).unwrap();
        let r = build_refiner(&cli, &config, Arc::new(NoProvider), &models).unwrap();
        assert_eq!(r.evaluator().origin(), ParticipantOrigin::Bound);
        assert_eq!(r.optimizer().origin(), ParticipantOrigin::Agent);
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let cli = Cli::parse_from(["koi-refine", "x"]);
        let config = Config::default();
        let models = choose_models(&cli, &config).unwrap();
        let r = build_refiner(&cli, &config, Arc::new(NoProvider), &models).unwrap();
        let err = r.generate("x", None).await.unwrap_err();
        assert!(err.to_string().contains("offline"));
    }
}
