// src/conversation/sequencer.rs — Step sequencer for one scripted conversation
//
// Linear state machine over `current_step_index` in 0..N. The last step is the
// terminal state: `is_complete()` holds once the index reaches N-1.
//
// Processing a turn and advancing are separate calls so a caller can read the
// completion state together with the reply before the step changes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::prompt::{self, build_initial_prompt, build_prompt};
use super::reply::{parse_reply, AssistantReply};
use crate::infra::errors::{ParlayError, Result};
use crate::provider::Gateway;
use crate::scenario::{ScenarioDefinition, StepTemplate};

pub const DEFAULT_HISTORY_WINDOW: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One entry of the whole-conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }
}

/// Per-conversation copy of a step. Only `recent_dialog` changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationStep {
    template: StepTemplate,
    recent_dialog: String,
}

impl ConversationStep {
    pub fn from_template(template: &StepTemplate) -> Self {
        Self {
            template: template.clone(),
            recent_dialog: String::new(),
        }
    }

    pub fn step_id(&self) -> &str {
        &self.template.step_id
    }

    pub fn step_goal(&self) -> &str {
        &self.template.step_goal
    }

    pub fn target_vocab(&self) -> &[String] {
        &self.template.target_vocab
    }

    pub fn hints(&self) -> &[String] {
        &self.template.hints
    }

    pub fn recent_dialog(&self) -> &str {
        &self.recent_dialog
    }

    pub(super) fn record(&mut self, turn: &Turn) {
        self.recent_dialog.push_str(prompt::speaker_label(turn.speaker));
        self.recent_dialog.push_str(": ");
        self.recent_dialog.push_str(&turn.text);
        self.recent_dialog.push('\n');
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// 1-indexed.
    pub current: usize,
    pub total: usize,
    pub percentage: u32,
}

impl Progress {
    fn new(index: usize, total: usize) -> Self {
        let current = index + 1;
        let percentage = if total == 0 {
            0
        } else {
            (current as f64 * 100.0 / total as f64).round() as u32
        };
        Self {
            current,
            total,
            percentage,
        }
    }
}

/// Result of one learner turn under the process-then-advance protocol.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: AssistantReply,
    /// Whether the turn just processed was on the final step.
    pub is_complete: bool,
    /// Step the learner should work on next.
    pub current_step: ConversationStep,
    pub progress: Progress,
}

#[derive(Debug, Clone)]
pub struct Sequencer {
    scenario: Option<Arc<ScenarioDefinition>>,
    current_step_index: usize,
    steps: Vec<ConversationStep>,
    full_history: Vec<Turn>,
    /// Index into `full_history` where the current step began.
    step_start: usize,
    history_window: usize,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequencer {
    /// An uninitialized sequencer. Call `initialize` before anything else.
    pub fn new() -> Self {
        Self {
            scenario: None,
            current_step_index: 0,
            steps: Vec::new(),
            full_history: Vec::new(),
            step_start: 0,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    /// Number of turns from earlier steps rendered into each prompt.
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// Bind `scenario` and start from its first step with empty histories.
    /// Safe to call again mid-conversation.
    pub fn initialize(&mut self, scenario: Arc<ScenarioDefinition>) {
        self.steps = scenario
            .steps
            .iter()
            .map(ConversationStep::from_template)
            .collect();
        self.current_step_index = 0;
        self.full_history.clear();
        self.step_start = 0;
        self.scenario = Some(scenario);
    }

    pub fn is_initialized(&self) -> bool {
        self.scenario.is_some()
    }

    pub fn scenario(&self) -> Result<&Arc<ScenarioDefinition>> {
        self.scenario.as_ref().ok_or(ParlayError::NotInitialized)
    }

    pub fn current_step(&self) -> Result<&ConversationStep> {
        self.scenario()?;
        self.steps
            .get(self.current_step_index)
            .ok_or(ParlayError::NotInitialized)
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    pub fn steps(&self) -> &[ConversationStep] {
        &self.steps
    }

    pub fn full_history(&self) -> &[Turn] {
        &self.full_history
    }

    /// The last `history_window` turns recorded before the current step began.
    fn earlier_turns(&self) -> &[Turn] {
        let earlier = &self.full_history[..self.step_start];
        let window_start = earlier.len().saturating_sub(self.history_window);
        &earlier[window_start..]
    }

    /// Generate a reply to `text` at the current step. Does not advance.
    ///
    /// History and the step's dialogue are only written once the gateway call
    /// and parse both succeed; on error the sequencer is unchanged.
    pub async fn process_user_input(
        &mut self,
        gateway: &Gateway,
        text: &str,
    ) -> Result<AssistantReply> {
        let scenario = Arc::clone(self.scenario()?);
        let step = self.current_step()?;

        let system_prompt = build_prompt(step, &scenario, self.earlier_turns());

        let options = gateway.options(scenario.is_structured());
        let raw = gateway.complete(&system_prompt, text, &options).await?;

        let reply = parse_reply(&raw, &scenario).inspect_err(|e| {
            tracing::warn!("Discarding reply for '{}': {}", scenario.scenario_code, e);
        })?;

        let user_turn = Turn::user(text);
        let assistant_turn = Turn::assistant(reply.text.clone());
        let idx = self.current_step_index;
        self.steps[idx].record(&user_turn);
        self.steps[idx].record(&assistant_turn);
        self.full_history.push(user_turn);
        self.full_history.push(assistant_turn);

        Ok(reply)
    }

    /// Generate the opening assistant message for a fresh conversation.
    pub async fn open(&mut self, gateway: &Gateway) -> Result<AssistantReply> {
        let scenario = Arc::clone(self.scenario()?);
        let system_prompt = build_initial_prompt(&scenario);

        let options = gateway.options(scenario.is_structured());
        let raw = gateway.complete(&system_prompt, "", &options).await?;
        let reply = parse_reply(&raw, &scenario)?;

        let turn = Turn::assistant(reply.text.clone());
        let idx = self.current_step_index;
        self.steps[idx].record(&turn);
        self.full_history.push(turn);

        Ok(reply)
    }

    /// Move to the next step. Returns false (and changes nothing) on the final step.
    pub fn advance(&mut self) -> bool {
        if self.scenario.is_none() || self.current_step_index + 1 >= self.steps.len() {
            return false;
        }
        self.current_step_index += 1;
        self.step_start = self.full_history.len();
        true
    }

    pub fn is_complete(&self) -> bool {
        self.scenario.is_some() && self.current_step_index + 1 == self.steps.len()
    }

    pub fn progress(&self) -> Result<Progress> {
        self.scenario()?;
        Ok(Progress::new(self.current_step_index, self.steps.len()))
    }

    /// Restart the bound scenario from the first step.
    pub fn reset(&mut self) -> Result<()> {
        let scenario = Arc::clone(self.scenario()?);
        self.initialize(scenario);
        Ok(())
    }

    /// Process `text`, then advance unless the processed step was the last one.
    pub async fn take_turn(&mut self, gateway: &Gateway, text: &str) -> Result<TurnOutcome> {
        let reply = self.process_user_input(gateway, text).await?;
        let is_complete = self.is_complete();
        if !is_complete {
            self.advance();
        }
        Ok(TurnOutcome {
            reply,
            is_complete,
            current_step: self.current_step()?.clone(),
            progress: self.progress()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::config::GenerationConfig;
    use crate::provider::{ChatResponse, MockModelProvider};
    use crate::scenario::ResponseSchema;

    fn scenario(steps: usize, structured: bool) -> Arc<ScenarioDefinition> {
        Arc::new(ScenarioDefinition {
            scenario_code: "local-buddy".into(),
            aliases: vec![],
            title: "Local Buddy".into(),
            language: "Indonesian".into(),
            prompt_style: Default::default(),
            welcome: "Halo!".into(),
            persona: "Sari".into(),
            style_guidelines: vec![],
            technical_requirements: if structured {
                vec!["JSON only".into()]
            } else {
                vec![]
            },
            response_schema: ResponseSchema::default(),
            steps: (0..steps)
                .map(|i| StepTemplate {
                    step_id: format!("step-{i}"),
                    step_goal: format!("goal {i}"),
                    target_vocab: vec!["Halo".into()],
                    hints: vec![],
                })
                .collect(),
        })
    }

    fn gateway_returning(content: &'static str) -> Gateway {
        let mut mock = MockModelProvider::new();
        mock.expect_id().return_const("mock".to_string());
        mock.expect_chat().returning(move |_| {
            Ok(ChatResponse {
                content: content.to_string(),
                ..Default::default()
            })
        });
        Gateway::new(Arc::new(mock), GenerationConfig::default())
    }

    fn gateway_failing() -> Gateway {
        let mut mock = MockModelProvider::new();
        mock.expect_id().return_const("mock".to_string());
        mock.expect_chat()
            .returning(|_| Err(ParlayError::generation("mock", "HTTP 500")));
        Gateway::new(Arc::new(mock), GenerationConfig::default())
    }

    #[test]
    fn test_uninitialized_errors() {
        let seq = Sequencer::new();
        assert!(matches!(seq.current_step(), Err(ParlayError::NotInitialized)));
        assert!(matches!(seq.progress(), Err(ParlayError::NotInitialized)));
        assert!(!seq.is_complete());

        let mut seq = Sequencer::new();
        assert!(!seq.advance());
        assert!(matches!(seq.reset(), Err(ParlayError::NotInitialized)));
    }

    #[tokio::test]
    async fn test_process_requires_initialize() {
        let mut seq = Sequencer::new();
        let gw = gateway_returning("hi");
        let err = seq.process_user_input(&gw, "Halo").await.unwrap_err();
        assert!(matches!(err, ParlayError::NotInitialized));
    }

    #[test]
    fn test_initialize_starts_at_first_step() {
        for n in 1..=5 {
            let mut seq = Sequencer::new();
            seq.initialize(scenario(n, false));
            assert_eq!(seq.current_step().unwrap().step_id(), "step-0");
            let p = seq.progress().unwrap();
            assert_eq!(p.current, 1);
            assert_eq!(p.total, n);
            assert_eq!(p.percentage, (100.0 / n as f64).round() as u32);
        }
    }

    #[test]
    fn test_advance_is_bounded() {
        let mut seq = Sequencer::new();
        seq.initialize(scenario(3, false));
        let mut last = seq.current_step_index();
        for _ in 0..10 {
            seq.advance();
            assert!(seq.current_step_index() >= last);
            assert!(seq.current_step_index() <= 2);
            last = seq.current_step_index();
        }
        assert!(!seq.advance());
        assert_eq!(seq.current_step_index(), 2);
        assert_eq!(seq.progress().unwrap().percentage, 100);
    }

    #[test]
    fn test_two_step_advance() {
        let mut seq = Sequencer::new();
        seq.initialize(scenario(2, false));
        assert!(!seq.is_complete());
        assert!(seq.advance());
        assert_eq!(seq.current_step_index(), 1);
        assert!(!seq.advance());
        assert_eq!(seq.current_step_index(), 1);
        assert!(seq.is_complete());
    }

    #[test]
    fn test_single_step_is_complete_immediately() {
        let mut seq = Sequencer::new();
        seq.initialize(scenario(1, false));
        assert!(seq.is_complete());
        assert!(!seq.advance());
    }

    #[tokio::test]
    async fn test_process_appends_user_then_assistant() {
        let mut seq = Sequencer::new();
        seq.initialize(scenario(3, false));
        let gw = gateway_returning("Halo juga!");

        for round in 0..3 {
            let before = seq.full_history().len();
            seq.process_user_input(&gw, "hi").await.unwrap();
            let history = seq.full_history();
            assert_eq!(history.len(), before + 2, "round {round}");
            assert_eq!(history[before], Turn::user("hi"));
            assert_eq!(history[before + 1], Turn::assistant("Halo juga!"));
        }
        assert_eq!(seq.current_step_index(), 0);
        assert_eq!(
            seq.current_step().unwrap().recent_dialog().matches("You: Halo juga!").count(),
            3
        );
    }

    #[tokio::test]
    async fn test_structured_reply_does_not_advance() {
        let mut seq = Sequencer::new();
        seq.initialize(scenario(3, true));
        let gw = gateway_returning(
            r#"{"ai_response":"Selamat siang!","meta":{"expressions":[{"sentence":1,"label":"smile"}]}}"#,
        );
        let reply = seq.process_user_input(&gw, "Halo").await.unwrap();
        assert_eq!(reply.text, "Selamat siang!");
        assert_eq!(reply.expressions[0].label, "smile");
        assert_eq!(seq.current_step_index(), 0);
    }

    #[tokio::test]
    async fn test_malformed_reply_leaves_state_untouched() {
        let mut seq = Sequencer::new();
        seq.initialize(scenario(2, true));
        let gw = gateway_returning("Selamat siang!");
        let err = seq.process_user_input(&gw, "Halo").await.unwrap_err();
        assert!(matches!(err, ParlayError::MalformedResponse { .. }));
        assert!(seq.full_history().is_empty());
        assert!(seq.current_step().unwrap().recent_dialog().is_empty());
    }

    #[tokio::test]
    async fn test_gateway_failure_leaves_state_untouched() {
        let mut seq = Sequencer::new();
        seq.initialize(scenario(2, false));
        let err = seq
            .process_user_input(&gateway_failing(), "Halo")
            .await
            .unwrap_err();
        assert!(matches!(err, ParlayError::GenerationFailed { .. }));
        assert!(seq.full_history().is_empty());
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let mut seq = Sequencer::new();
        seq.initialize(scenario(3, false));
        let gw = gateway_returning("ok");
        seq.process_user_input(&gw, "hi").await.unwrap();
        seq.advance();

        seq.reset().unwrap();
        let once = (seq.current_step_index(), seq.full_history().to_vec(), seq.steps().to_vec());
        seq.reset().unwrap();
        let twice = (seq.current_step_index(), seq.full_history().to_vec(), seq.steps().to_vec());

        assert_eq!(once, twice);
        assert_eq!(once.0, 0);
        assert!(once.1.is_empty());
        assert!(once.2.iter().all(|s| s.recent_dialog().is_empty()));
    }

    #[tokio::test]
    async fn test_take_turn_advances_until_final_step() {
        let mut seq = Sequencer::new();
        seq.initialize(scenario(2, false));
        let gw = gateway_returning("ok");

        let first = seq.take_turn(&gw, "a").await.unwrap();
        assert!(!first.is_complete);
        assert_eq!(first.current_step.step_id(), "step-1");
        assert_eq!(first.progress.current, 2);

        let second = seq.take_turn(&gw, "b").await.unwrap();
        assert!(second.is_complete);
        assert_eq!(second.current_step.step_id(), "step-1");
        assert_eq!(seq.current_step_index(), 1);
    }

    #[tokio::test]
    async fn test_open_records_greeting() {
        let mut seq = Sequencer::new();
        seq.initialize(scenario(2, false));
        let gw = gateway_returning("Halo! Siapa namamu?");
        let reply = seq.open(&gw).await.unwrap();
        assert_eq!(reply.text, "Halo! Siapa namamu?");
        assert_eq!(seq.full_history(), &[Turn::assistant("Halo! Siapa namamu?")]);
        assert_eq!(seq.current_step_index(), 0);
    }

    #[tokio::test]
    async fn test_prompt_does_not_repeat_turns() {
        let mut seq = Sequencer::new();
        seq.initialize(scenario(3, false));

        let mut mock = MockModelProvider::new();
        mock.expect_id().return_const("mock".to_string());
        let mut calls = 0;
        mock.expect_chat().returning(move |req| {
            calls += 1;
            if calls == 3 {
                let system = req.system.unwrap_or_default();
                assert_eq!(system.matches("Learner: Halo\n").count(), 1);
                assert_eq!(system.matches("You: reply 1\n").count(), 1);
                assert_eq!(system.matches("Learner: Apa kabar?\n").count(), 1);
                assert_eq!(system.matches("You: reply 2\n").count(), 1);
            }
            Ok(ChatResponse {
                content: format!("reply {calls}"),
                ..Default::default()
            })
        });
        let gw = Gateway::new(Arc::new(mock), GenerationConfig::default());

        seq.process_user_input(&gw, "Halo").await.unwrap();
        seq.advance();
        seq.process_user_input(&gw, "Apa kabar?").await.unwrap();
        seq.process_user_input(&gw, "Baik").await.unwrap();
        assert_eq!(seq.full_history().len(), 6);
    }

    #[tokio::test]
    async fn test_history_window_limits_earlier_steps() {
        let mut seq = Sequencer::new().with_history_window(2);
        seq.initialize(scenario(3, false));
        let gw = gateway_returning("ok");
        seq.process_user_input(&gw, "first").await.unwrap();
        seq.process_user_input(&gw, "second").await.unwrap();
        seq.advance();

        assert_eq!(
            seq.earlier_turns(),
            &[Turn::user("second"), Turn::assistant("ok")]
        );
        assert!(seq.current_step().unwrap().recent_dialog().is_empty());
    }

    #[test]
    fn test_progress_rounding() {
        assert_eq!(Progress::new(0, 3).percentage, 33);
        assert_eq!(Progress::new(1, 3).percentage, 67);
        assert_eq!(Progress::new(2, 3).percentage, 100);
        assert_eq!(Progress::new(0, 8).percentage, 13);
    }
}
