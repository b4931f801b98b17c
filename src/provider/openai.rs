// src/provider/openai.rs — OpenAI-compatible chat, transcription and speech provider

use std::time::Duration;

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, ModelProvider, SpeechProvider, StopReason, TokenUsage};
use crate::infra::errors::ParlayError;

const PROVIDER_ID: &str = "openai";

pub struct OpenAIProvider {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
    transcription_model: String,
    tts_model: String,
}

impl OpenAIProvider {
    /// Fails only when the HTTP client cannot be built (e.g. no TLS backend).
    pub fn with_base_url(
        api_key: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, ParlayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ParlayError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_key,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            transcription_model: "whisper-1".into(),
            tts_model: "tts-1".into(),
        })
    }

    pub fn with_speech_models(
        mut self,
        transcription_model: impl Into<String>,
        tts_model: impl Into<String>,
    ) -> Self {
        self.transcription_model = transcription_model.into();
        self.tts_model = tts_model.into();
        self
    }

    fn request_error(e: reqwest::Error) -> ParlayError {
        let message = if e.is_timeout() {
            format!("request timed out: {e}")
        } else {
            e.to_string()
        };
        ParlayError::GenerationFailed {
            provider: PROVIDER_ID.into(),
            message,
            status: e.status().map(|s| s.as_u16()),
        }
    }

    /// Turn a non-2xx response into `GenerationFailed`, passing 2xx through.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ParlayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let error_body = response.text().await.unwrap_or_default();
        Err(ParlayError::GenerationFailed {
            provider: PROVIDER_ID.into(),
            message: format!("HTTP {}: {}", status, error_body),
            status: Some(status.as_u16()),
        })
    }
}

/// Build the chat-completions request body.
fn build_chat_body(request: &ChatRequest) -> serde_json::Value {
    let mut msgs = Vec::new();
    if let Some(system) = &request.system {
        msgs.push(serde_json::json!({"role": "system", "content": system}));
    }
    for m in &request.messages {
        msgs.push(serde_json::json!({"role": m.role.as_str(), "content": m.content}));
    }

    let mut body = serde_json::json!({
        "model": request.model,
        "messages": msgs,
    });
    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = serde_json::json!(max_tokens);
    }
    if let Some(temp) = request.temperature {
        body["temperature"] = serde_json::json!(temp);
    }
    if request.json_mode {
        body["response_format"] = serde_json::json!({"type": "json_object"});
    }
    body
}

/// Extract content, usage and stop reason from a chat-completions response.
fn parse_chat_response(resp: &serde_json::Value) -> Result<ChatResponse, ParlayError> {
    let choice = &resp["choices"][0];
    let content = choice["message"]["content"].as_str().ok_or_else(|| {
        ParlayError::generation(PROVIDER_ID, "response has no choices[0].message.content")
    })?;

    let usage = TokenUsage {
        input_tokens: resp["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        output_tokens: resp["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    };

    let stop_reason = match choice["finish_reason"].as_str() {
        Some("stop") => StopReason::EndTurn,
        Some("length") => StopReason::MaxTokens,
        _ => StopReason::Unknown,
    };

    Ok(ChatResponse {
        content: content.to_string(),
        usage,
        stop_reason,
    })
}

#[async_trait]
impl ModelProvider for OpenAIProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn name(&self) -> &str {
        "OpenAI"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ParlayError> {
        let body = build_chat_body(&request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(Self::request_error)?;

        let response = Self::check_status(response).await?;

        let resp: serde_json::Value = response.json().await.map_err(|e| {
            ParlayError::generation(PROVIDER_ID, format!("Failed to parse response: {}", e))
        })?;

        parse_chat_response(&resp)
    }
}

#[async_trait]
impl SpeechProvider for OpenAIProvider {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        filename: &str,
        language: Option<&str>,
    ) -> Result<String, ParlayError> {
        let part = reqwest::multipart::Part::bytes(audio).file_name(filename.to_string());
        let mut form = reqwest::multipart::Form::new()
            .text("model", self.transcription_model.clone())
            .part("file", part);
        if let Some(lang) = language {
            form = form.text("language", lang.to_string());
        }

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(Self::request_error)?;

        let response = Self::check_status(response).await?;

        let resp: serde_json::Value = response.json().await.map_err(|e| {
            ParlayError::generation(PROVIDER_ID, format!("Failed to parse transcription: {}", e))
        })?;

        resp["text"]
            .as_str()
            .map(|t| t.trim().to_string())
            .ok_or_else(|| ParlayError::generation(PROVIDER_ID, "transcription has no text"))
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, ParlayError> {
        let body = serde_json::json!({
            "model": self.tts_model,
            "input": text,
            "voice": voice,
            "response_format": "mp3",
        });

        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(Self::request_error)?;

        let response = Self::check_status(response).await?;

        let bytes = response.bytes().await.map_err(Self::request_error)?;
        Ok(bytes.to_vec())
    }
}
