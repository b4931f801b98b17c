// src/provider/gateway.rs — Injected LLM gateway used by the conversation sequencer
//
// Fail-fast: a single request per call, errors propagate unchanged.

use std::sync::Arc;

use super::{ChatRequest, Message, ModelProvider, StopReason};
use crate::infra::config::GenerationConfig;
use crate::infra::errors::{ParlayError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub json_mode: bool,
}

pub struct Gateway {
    provider: Arc<dyn ModelProvider>,
    defaults: GenerationConfig,
}

impl Gateway {
    pub fn new(provider: Arc<dyn ModelProvider>, defaults: GenerationConfig) -> Self {
        Self { provider, defaults }
    }

    /// Options derived from the configured generation defaults.
    pub fn options(&self, json_mode: bool) -> CompletionOptions {
        CompletionOptions {
            model: self.defaults.model.clone(),
            max_tokens: self.defaults.max_tokens,
            temperature: self.defaults.temperature,
            json_mode,
        }
    }

    /// Send `system_prompt` plus `user_input` and return the raw reply text.
    /// An empty `user_input` sends the system prompt alone.
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_input: &str,
        options: &CompletionOptions,
    ) -> Result<String> {
        let messages = if user_input.trim().is_empty() {
            Vec::new()
        } else {
            vec![Message::user(user_input)]
        };

        let request = ChatRequest {
            model: options.model.clone(),
            messages,
            max_tokens: Some(options.max_tokens),
            temperature: Some(options.temperature),
            system: Some(system_prompt.to_string()),
            json_mode: options.json_mode,
        };

        tracing::debug!(
            "Gateway request via {} (model={}, json={})",
            self.provider.id(),
            options.model,
            options.json_mode
        );

        let response = self.provider.chat(request).await.map_err(|e| {
            tracing::warn!("Gateway call to {} failed: {}", self.provider.id(), e);
            match e {
                ParlayError::GenerationFailed { .. } => e,
                other => ParlayError::generation(self.provider.id(), other.to_string()),
            }
        })?;

        if response.stop_reason == StopReason::MaxTokens {
            tracing::warn!(
                "Reply from {} was cut off at max_tokens={}",
                self.provider.id(),
                options.max_tokens
            );
        }
        tracing::debug!(
            "Gateway reply: {} chars, {} tokens",
            response.content.len(),
            response.usage.total()
        );
        Ok(response.content)
    }
}
