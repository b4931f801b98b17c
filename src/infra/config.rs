// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub speech: SpeechConfig,

    #[serde(default)]
    pub sessions: SessionsConfig,

    #[serde(default)]
    pub scenarios: ScenariosConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8787,
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".into(),
        "http://localhost:5173".into(),
        "http://127.0.0.1:3000".into(),
        "http://127.0.0.1:5173".into(),
    ]
}

/// Connection settings for the OpenAI-compatible gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            max_tokens: 300,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub transcription_model: String,
    pub tts_model: String,
    pub voice: String,
    /// ISO-639-1 hint passed to transcription when the request has none.
    #[serde(default)]
    pub language: Option<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            transcription_model: "whisper-1".into(),
            tts_model: "tts-1".into(),
            voice: "alloy".into(),
            language: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Session id used when a request doesn't carry one.
    pub default_session_id: String,
    /// Sessions idle longer than this are swept. 0 disables sweeping.
    pub idle_timeout_minutes: u64,
    pub sweep_interval_seconds: u64,
    /// Conversation turns rendered into each prompt.
    pub history_window: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            default_session_id: "default".into(),
            idle_timeout_minutes: 0,
            sweep_interval_seconds: 300,
            history_window: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenariosConfig {
    /// Scenario selected when a request names an unknown one.
    pub default: String,
    /// Extra directory of `*.toml` scenario files (defaults to ~/.parlay/scenarios).
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for ScenariosConfig {
    fn default() -> Self {
        Self {
            default: "local-buddy".into(),
            dir: None,
        }
    }
}

impl ScenariosConfig {
    pub fn scenario_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(paths::scenarios_dir)
    }
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
