// src/api/mod.rs — HTTP API for role-play conversations

pub mod handlers;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::conversation::SessionRegistry;
use crate::infra::config::{ServerConfig, SessionsConfig, SpeechConfig};
use crate::provider::{Gateway, SpeechProvider};
use crate::scenario::ScenarioCatalog;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub catalog: Arc<ScenarioCatalog>,
    pub registry: Arc<SessionRegistry>,
    pub gateway: Arc<Gateway>,
    /// None when no speech backend is configured; speech routes answer 503.
    pub speech: Option<Arc<dyn SpeechProvider>>,
    pub sessions_config: SessionsConfig,
    pub speech_config: SpeechConfig,
}

impl ApiState {
    pub fn new(catalog: Arc<ScenarioCatalog>, gateway: Arc<Gateway>, sessions: SessionsConfig) -> Self {
        let registry = SessionRegistry::new(Arc::clone(&catalog))
            .with_history_window(sessions.history_window);
        Self {
            catalog,
            registry: Arc::new(registry),
            gateway,
            speech: None,
            sessions_config: sessions,
            speech_config: SpeechConfig::default(),
        }
    }

    pub fn with_speech(mut self, speech: Arc<dyn SpeechProvider>, config: SpeechConfig) -> Self {
        self.speech = Some(speech);
        self.speech_config = config;
        self
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

/// Build the axum router with all API routes.
pub fn build_router(state: ApiState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/api/v1/conversation", post(handlers::conversation))
        .route("/api/v1/scenarios", get(handlers::list_scenarios))
        .route("/api/v1/sessions/{id}", delete(handlers::delete_session))
        .route("/api/v1/speech/transcribe", post(handlers::transcribe))
        .route("/api/v1/speech/synthesize", post(handlers::synthesize))
        .route("/api/v1/health", get(handlers::health))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Periodically drop idle sessions. Does nothing when the timeout is zero.
pub fn spawn_idle_sweeper(
    registry: Arc<SessionRegistry>,
    config: &SessionsConfig,
) -> Option<tokio::task::JoinHandle<()>> {
    if config.idle_timeout_minutes == 0 {
        return None;
    }
    let max_idle = chrono::Duration::minutes(config.idle_timeout_minutes as i64);
    let period = Duration::from_secs(config.sweep_interval_seconds.max(1));

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // First tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            registry.sweep_idle(max_idle);
        }
    }))
}

/// Start the API server (runs until ctrl-c).
pub async fn start_server(config: &ServerConfig, state: ApiState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let sweeper = spawn_idle_sweeper(Arc::clone(&state.registry), &state.sessions_config);
    let router = build_router(state, &config.cors_origins);

    tracing::info!("API server listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    Ok(())
}
