// src/provider/resolver.rs — Build the configured provider from config + environment

use std::sync::Arc;
use std::time::Duration;

use super::openai::OpenAIProvider;
use crate::infra::config::{ProviderConfig, SpeechConfig};
use crate::infra::errors::{ParlayError, Result};

/// Read the API key named by `config.api_key_env` and build the provider.
pub fn build_provider(config: &ProviderConfig, speech: &SpeechConfig) -> Result<Arc<OpenAIProvider>> {
    let api_key = std::env::var(&config.api_key_env).unwrap_or_default();
    build_provider_with_key(config, speech, api_key)
}

pub fn build_provider_with_key(
    config: &ProviderConfig,
    speech: &SpeechConfig,
    api_key: String,
) -> Result<Arc<OpenAIProvider>> {
    if api_key.trim().is_empty() {
        return Err(ParlayError::NoProvider);
    }

    tracing::debug!("Using provider at {}", config.base_url);
    let provider = OpenAIProvider::with_base_url(
        api_key,
        config.base_url.clone(),
        Duration::from_secs(config.timeout_seconds),
    )?
    .with_speech_models(&speech.transcription_model, &speech.tts_model);

    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ModelProvider;

    #[test]
    fn test_empty_key_is_no_provider() {
        let result = build_provider_with_key(
            &ProviderConfig::default(),
            &SpeechConfig::default(),
            "   ".into(),
        );
        assert!(matches!(result, Err(ParlayError::NoProvider)));
    }

    #[test]
    fn test_builds_with_key() {
        let provider = build_provider_with_key(
            &ProviderConfig::default(),
            &SpeechConfig::default(),
            "sk-test".into(),
        )
        .unwrap();
        assert_eq!(provider.id(), "openai");
        assert_eq!(provider.name(), "OpenAI");
    }

    #[test]
    fn test_missing_env_var_is_no_provider() {
        let config = ProviderConfig {
            api_key_env: "PARLAY_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..Default::default()
        };
        assert!(matches!(
            build_provider(&config, &SpeechConfig::default()),
            Err(ParlayError::NoProvider)
        ));
    }
}
