// src/provider/mod.rs — Model provider layer (LLM gateway + speech)

pub mod gateway;
pub mod openai;
pub mod resolver;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::infra::errors::ParlayError;

pub use gateway::{CompletionOptions, Gateway};

/// Core trait for chat-completion backends.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ParlayError>;
}

/// Speech-to-text and text-to-speech backends.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        filename: &str,
        language: Option<&str>,
    ) -> Result<String, ParlayError>;

    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, ParlayError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub system: Option<String>,
    /// Ask the backend to constrain output to a JSON object.
    pub json_mode: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub stop_reason: StopReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    #[default]
    Unknown,
}
