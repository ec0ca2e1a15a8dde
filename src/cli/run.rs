// src/cli/run.rs — `run` command: wire config, inputs and the pipeline together

use anyhow::Context;

use super::progress;
use super::RunArgs;
use crate::core::{CheckpointWriter, EliminationPipeline, RunSettings};
use crate::infra::config::Config;
use crate::infra::paths;
use crate::integrations;
use crate::provider::resolver;
use crate::stages::StageSet;
use crate::vocab::Vocabulary;

/// Fold command-line flags into the loaded config. Flags win.
pub fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(provider) = args.provider {
        config.generator.provider = provider;
    }
    if let Some(ref url) = args.base_url {
        config.generator.base_url = Some(url.clone());
    }
    if let Some(timeout) = args.timeout {
        config.generator.timeout_seconds = timeout;
    }
    if let Some(concurrency) = args.concurrency {
        config.pipeline.concurrency = concurrency;
    }
    if args.top_n.is_some() {
        config.pipeline.top_n = args.top_n;
    }
    if let Some(ref dir) = args.checkpoint_dir {
        config.checkpoint.dir = dir.clone();
    }
    if let Some(interval) = args.checkpoint_interval {
        config.checkpoint.interval = interval;
    }
    if let Some(cadence) = args.checkpoint_cadence {
        config.checkpoint.cadence = cadence;
    }
    if args.no_checkpoints {
        config.checkpoint.enabled = false;
    }
    if args.notify {
        config.notify.enabled = true;
    }
}

pub async fn run_pipeline(args: &RunArgs, mut config: Config) -> anyhow::Result<()> {
    apply_overrides(&mut config, args);
    config.resolve_credentials();

    let mut vocab = Vocabulary::load(&args.vocab)?;
    if let Some(n) = config.pipeline.top_n {
        vocab.truncate(n);
    }

    let policy = config.pipeline.missing_predicate;
    let stages = match args.stages {
        Some(ref path) => StageSet::load(path, policy)
            .with_context(|| format!("loading stages from {}", path.display()))?,
        None => StageSet::builtin(policy)?,
    };

    let generator = resolver::build_generator(&config.generator)?;
    let started = chrono::Local::now();
    let output = args
        .output
        .clone()
        .unwrap_or_else(paths::default_output_path);

    let mut pipeline = EliminationPipeline::new(
        generator,
        stages,
        RunSettings::from_config(&config, &args.model),
    )
    .with_checkpoints(CheckpointWriter::from_config(
        &config.checkpoint,
        &args.model,
        started,
    ))
    .with_notifier(integrations::from_config(&config.notify))
    .with_output(&output);

    if !args.quiet {
        pipeline = pipeline.with_progress(progress::terminal_progress());
    }

    if args.skip_probe {
        tracing::info!("Skipping model probe");
    } else {
        pipeline
            .probe()
            .await
            .with_context(|| format!("model '{}' is not usable", args.model))?;
    }

    let report = pipeline.run(vocab).await?;

    for stage in &report.stages {
        println!(
            "stage {}: {} in, {} out",
            stage.index + 1,
            stage.entered,
            stage.survived
        );
    }
    println!(
        "{} glitch token candidate(s) written to {}",
        report.survivors(),
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CheckpointCadence;
    use crate::provider::ProviderKind;
    use std::path::PathBuf;

    #[test]
    fn test_no_flags_keep_config() {
        let mut config = Config::default();
        config.generator.timeout_seconds = 99;
        apply_overrides(&mut config, &RunArgs::default());
        assert_eq!(config.generator.timeout_seconds, 99);
        assert!(config.checkpoint.enabled);
        assert!(!config.notify.enabled);
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::default();
        let args = RunArgs {
            provider: Some(ProviderKind::OpenAI),
            base_url: Some("http://proxy:8080/v1".into()),
            timeout: Some(5),
            concurrency: Some(8),
            top_n: Some(100),
            checkpoint_dir: Some(PathBuf::from("/tmp/ck")),
            checkpoint_interval: Some(10),
            checkpoint_cadence: Some(CheckpointCadence::TokenId),
            no_checkpoints: true,
            notify: true,
            ..Default::default()
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.generator.provider, ProviderKind::OpenAI);
        assert_eq!(config.generator.base_url.as_deref(), Some("http://proxy:8080/v1"));
        assert_eq!(config.generator.timeout_seconds, 5);
        assert_eq!(config.pipeline.concurrency, 8);
        assert_eq!(config.pipeline.top_n, Some(100));
        assert_eq!(config.checkpoint.dir, PathBuf::from("/tmp/ck"));
        assert_eq!(config.checkpoint.interval, 10);
        assert_eq!(config.checkpoint.cadence, CheckpointCadence::TokenId);
        assert!(!config.checkpoint.enabled);
        assert!(config.notify.enabled);
    }
}
