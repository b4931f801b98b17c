// src/api/types.rs

use serde::{Deserialize, Serialize};

use crate::conversation::{ConversationStep, Expression, Progress};

/// Request body for the conversation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub scenario: String,
    #[serde(default)]
    pub action: Option<ConversationAction>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationAction {
    /// Restart the session without calling the model.
    Reset,
    /// Restart the session and have the model produce an opening line.
    Start,
}

/// Client-facing view of a step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepView {
    pub step_id: String,
    pub step_goal: String,
    pub target_vocab: Vec<String>,
    pub hints: Vec<String>,
}

impl From<&ConversationStep> for StepView {
    fn from(step: &ConversationStep) -> Self {
        Self {
            step_id: step.step_id().to_string(),
            step_goal: step.step_goal().to_string(),
            target_vocab: step.target_vocab().to_vec(),
            hints: step.hints().to_vec(),
        }
    }
}

/// Returned for reset, new sessions, empty messages and `start`.
#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub session_id: String,
    pub message: String,
    pub step: StepView,
    pub scenario: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expressions: Vec<Expression>,
}

/// Returned after a learner turn.
#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub session_id: String,
    pub user_message: String,
    pub ai_response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
    pub expressions: Vec<Expression>,
    pub current_step: StepView,
    pub is_complete: bool,
    pub scenario: String,
    pub progress: Progress,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub code: String,
    pub title: String,
    pub aliases: Vec<String>,
    pub language: String,
    pub steps: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScenarioList {
    pub default: String,
    pub scenarios: Vec<ScenarioSummary>,
}

#[derive(Debug, Deserialize)]
pub struct TranscribeQuery {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscribeResponse {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    #[serde(default)]
    pub voice: Option<String>,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
