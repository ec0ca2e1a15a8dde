// src/main.rs — glitchscan entry point

use clap::Parser;

use glitchscan::cli::run::run_pipeline;
use glitchscan::cli::{inspect, Cli, Commands};
use glitchscan::infra::config::Config;
use glitchscan::infra::logger;

#[tokio::main]
async fn main() {
    // Initialize logging (respects RUST_LOG / GLITCHSCAN_LOG)
    logger::init_logging("warn");

    if let Err(e) = run().await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config (falls back to defaults if no config.toml)
    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    match cli.command {
        Commands::Run(ref args) => run_pipeline(args, config).await,
        Commands::Stages { ref stages } => inspect::show_stages(stages.as_deref(), &config),
        Commands::Vocab {
            ref path,
            top_n,
            show,
        } => inspect::show_vocab(path, top_n, show),
        Commands::Check {
            ref predicate,
            ref token,
            ref result,
        } => inspect::check_predicate(predicate, token, result).map(|_| ()),
    }
}
