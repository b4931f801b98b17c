// src/main.rs — parlay entry point

use clap::Parser;

use parlay::cli::{Cli, Commands};
use parlay::infra::config::Config;
use parlay::infra::logger;
use parlay::scenario::ScenarioCatalog;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Serving logs at info; interactive commands stay quiet unless PARLAY_LOG / RUST_LOG say otherwise
    let level = match cli.command {
        None | Some(Commands::Serve { .. }) => "info",
        _ => "warn",
    };
    logger::init_logging(level);

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load config (falls back to defaults if no config.toml)
    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    match cli.command {
        None => parlay::cli::serve::run_serve(&config, None, None).await,
        Some(Commands::Serve { host, port }) => {
            parlay::cli::serve::run_serve(&config, host, port).await
        }
        Some(Commands::Scenarios) => {
            let catalog = ScenarioCatalog::load(&config.scenarios)?;
            parlay::cli::scenarios::show_scenarios(&catalog);
            Ok(())
        }
        Some(Commands::Chat { scenario }) => {
            parlay::cli::chat::run_chat(&config, scenario.as_deref()).await
        }
    }
}
