// tests/common/mod.rs — Shared test doubles

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use parlay::infra::config::GenerationConfig;
use parlay::infra::errors::ParlayError;
use parlay::provider::*;

/// Replays canned replies in order and records every request it receives.
/// Once the script runs out the last reply repeats.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, String>>>,
    last: Mutex<Option<Result<String, String>>>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::from([Err(message.to_string())])),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn id(&self) -> &str {
        "scripted"
    }

    fn name(&self) -> &str {
        "Scripted Provider"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ParlayError> {
        self.requests.lock().unwrap().push(request);

        let next = self.replies.lock().unwrap().pop_front();
        let reply = match next {
            Some(r) => {
                *self.last.lock().unwrap() = Some(r.clone());
                r
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err("script exhausted".into())),
        };

        match reply {
            Ok(content) => Ok(ChatResponse {
                content,
                usage: TokenUsage {
                    input_tokens: 120,
                    output_tokens: 30,
                },
                stop_reason: StopReason::EndTurn,
            }),
            Err(message) => Err(ParlayError::GenerationFailed {
                provider: "scripted".into(),
                message,
                status: Some(500),
            }),
        }
    }
}

pub fn gateway(provider: Arc<ScriptedProvider>) -> Gateway {
    Gateway::new(provider, GenerationConfig::default())
}
