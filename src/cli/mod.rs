// src/cli/mod.rs — CLI definition (clap derive)

pub mod chat;
pub mod scenarios;
pub mod serve;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::infra::config::Config;
use crate::provider::{resolver, Gateway, ModelProvider, SpeechProvider};
use crate::scenario::ScenarioCatalog;

#[derive(Parser)]
#[command(name = "parlay", about = "Role-play conversation practice for language learners", version)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API (default)
    Serve {
        /// Bind address, overrides [server].host
        #[arg(long)]
        host: Option<String>,
        /// Port, overrides [server].port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List available scenarios
    Scenarios,
    /// Practice a scenario in the terminal
    Chat {
        /// Scenario code or alias (defaults to [scenarios].default)
        #[arg(short, long)]
        scenario: Option<String>,
    },
}

/// Catalog, gateway and optional speech backend shared by `serve` and `chat`.
pub struct Services {
    pub catalog: Arc<ScenarioCatalog>,
    pub gateway: Arc<Gateway>,
    pub speech: Option<Arc<dyn SpeechProvider>>,
}

impl Services {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let catalog = Arc::new(ScenarioCatalog::load(&config.scenarios)?);
        let provider = resolver::build_provider(&config.provider, &config.speech)?;
        tracing::info!(
            "Loaded {} scenario(s); model {} via {} at {}",
            catalog.all().len(),
            config.generation.model,
            provider.name(),
            config.provider.base_url
        );

        let speech: Arc<dyn SpeechProvider> = provider.clone();
        let gateway = Gateway::new(provider, config.generation.clone());
        Ok(Self {
            catalog,
            gateway: Arc::new(gateway),
            speech: Some(speech),
        })
    }
}
