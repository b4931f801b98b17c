// src/infra/logger.rs — Structured logging with tracing

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global subscriber. `PARLAY_LOG` wins over `RUST_LOG`;
/// `level` applies when neither is set.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env("PARLAY_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
