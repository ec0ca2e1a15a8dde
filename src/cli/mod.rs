// src/cli/mod.rs — CLI definition (clap derive)

pub mod inspect;
pub mod progress;
pub mod run;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::core::CheckpointCadence;
use crate::provider::ProviderKind;

#[derive(Parser)]
#[command(
    name = "glitchscan",
    about = "Find glitch tokens in a model's vocabulary by staged elimination",
    version
)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the elimination pipeline over a vocabulary
    Run(RunArgs),
    /// Print the effective stage set
    Stages {
        /// Stage-definition CSV (built-in stages if omitted)
        #[arg(long)]
        stages: Option<PathBuf>,
    },
    /// Load a vocabulary file and summarize it
    Vocab {
        path: PathBuf,
        /// Only keep the first N entries
        #[arg(long)]
        top_n: Option<usize>,
        /// Print the first N entries
        #[arg(long, default_value = "10")]
        show: usize,
    },
    /// Compile a predicate and evaluate it against a token/result pair
    Check {
        predicate: String,
        #[arg(long, default_value = "")]
        token: String,
        #[arg(long, default_value = "")]
        result: String,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Vocabulary file (.csv `token_id;token` or tokenizer .json)
    #[arg(long)]
    pub vocab: PathBuf,

    /// Model identifier as the provider knows it (e.g. llama2:7b)
    #[arg(short, long)]
    pub model: String,

    /// Output CSV for the surviving tokens
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Stage-definition CSV (built-in stages if omitted)
    #[arg(long)]
    pub stages: Option<PathBuf>,

    #[arg(long)]
    pub provider: Option<ProviderKind>,

    #[arg(long)]
    pub base_url: Option<String>,

    /// Per-call timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Generator calls in flight per stage
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Only test the first N vocabulary entries
    #[arg(long)]
    pub top_n: Option<usize>,

    #[arg(long)]
    pub checkpoint_dir: Option<PathBuf>,

    #[arg(long)]
    pub checkpoint_interval: Option<u64>,

    #[arg(long, value_parser = parse_cadence)]
    pub checkpoint_cadence: Option<CheckpointCadence>,

    #[arg(long)]
    pub no_checkpoints: bool,

    /// Send Pushover status notifications
    #[arg(long)]
    pub notify: bool,

    /// Skip the startup model availability check
    #[arg(long)]
    pub skip_probe: bool,

    /// Suppress the progress bar
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_cadence(s: &str) -> Result<CheckpointCadence, String> {
    match s {
        "processed" => Ok(CheckpointCadence::Processed),
        "token-id" | "token_id" => Ok(CheckpointCadence::TokenId),
        other => Err(format!("unknown cadence '{other}'. Options: processed, token-id")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "glitchscan",
            "run",
            "--vocab",
            "tokens.csv",
            "-m",
            "llama2:7b",
            "--provider",
            "deepseek",
            "-j",
            "4",
            "--checkpoint-cadence",
            "token-id",
            "--quiet",
        ]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.vocab, PathBuf::from("tokens.csv"));
                assert_eq!(args.model, "llama2:7b");
                assert_eq!(args.provider, Some(ProviderKind::DeepSeek));
                assert_eq!(args.concurrency, Some(4));
                assert_eq!(args.checkpoint_cadence, Some(CheckpointCadence::TokenId));
                assert!(args.quiet);
                assert!(!args.notify);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_run_requires_vocab_and_model() {
        assert!(Cli::try_parse_from(["glitchscan", "run", "--model", "m"]).is_err());
        assert!(Cli::try_parse_from(["glitchscan", "run", "--vocab", "v.csv"]).is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["glitchscan", "stages", "--config", "/tmp/c.toml"]);
        assert_eq!(cli.config.as_deref(), Some("/tmp/c.toml"));
    }

    #[test]
    fn test_parse_check() {
        let cli = Cli::parse_from([
            "glitchscan",
            "check",
            "token in result",
            "--token",
            "a",
            "--result",
            "abc",
        ]);
        match cli.command {
            Commands::Check {
                predicate,
                token,
                result,
            } => {
                assert_eq!(predicate, "token in result");
                assert_eq!(token, "a");
                assert_eq!(result, "abc");
            }
            _ => panic!("expected check"),
        }
    }
}
