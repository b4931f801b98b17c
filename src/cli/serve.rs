// src/cli/serve.rs — `parlay serve`

use crate::api::{self, ApiState};
use crate::infra::config::Config;

use super::Services;

pub async fn run_serve(
    config: &Config,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let services = Services::from_config(config)?;

    let mut server = config.server.clone();
    if let Some(host) = host {
        server.host = host;
    }
    if let Some(port) = port {
        server.port = port;
    }

    let mut state = ApiState::new(
        services.catalog,
        services.gateway,
        config.sessions.clone(),
    );
    if let Some(speech) = services.speech {
        state = state.with_speech(speech, config.speech.clone());
    }

    eprintln!(
        "parlay v{} listening on http://{}:{}",
        env!("CARGO_PKG_VERSION"),
        server.host,
        server.port
    );
    api::start_server(&server, state).await
}
