// src/infra/errors.rs — Error types for Parlay

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParlayError {
    // Catalog errors (recovered locally by falling back to the default scenario)
    #[error("Unknown scenario '{code}'{}", suggestion_suffix(.suggestion))]
    UnknownScenario {
        code: String,
        suggestion: Option<String>,
    },

    #[error("Invalid scenario '{code}': {reason}")]
    InvalidScenario { code: String, reason: String },

    // Sequencer errors
    #[error("Conversation has not been initialized with a scenario")]
    NotInitialized,

    // Gateway errors (never retried)
    #[error("Generation failed via '{provider}': {message}")]
    GenerationFailed {
        provider: String,
        message: String,
        status: Option<u16>,
    },

    #[error("Malformed model response: {reason}")]
    MalformedResponse { reason: String, raw: String },

    #[error("Session '{session_id}' not found")]
    SessionNotFound { session_id: String },

    // User errors
    #[error("No provider configured. Set OPENAI_API_KEY or [provider].api_key_env in config.toml.")]
    NoProvider,

    // Infra
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ParlayError {
    /// HTTP status the API layer reports for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ParlayError::GenerationFailed { .. } | ParlayError::MalformedResponse { .. } => 502,
            ParlayError::SessionNotFound { .. } => 404,
            ParlayError::UnknownScenario { .. } => 404,
            ParlayError::NoProvider => 503,
            _ => 500,
        }
    }

    /// Extra diagnostic payload, if any (the raw model output for malformed replies).
    pub fn detail(&self) -> Option<&str> {
        match self {
            ParlayError::MalformedResponse { raw, .. } => Some(raw),
            _ => None,
        }
    }

    pub(crate) fn generation(provider: &str, message: impl Into<String>) -> Self {
        ParlayError::GenerationFailed {
            provider: provider.to_string(),
            message: message.into(),
            status: None,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>, raw: &str) -> Self {
        ParlayError::MalformedResponse {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean '{s}'?)"))
        .unwrap_or_default()
}

pub type Result<T, E = ParlayError> = std::result::Result<T, E>;
