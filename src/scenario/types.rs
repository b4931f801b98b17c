// src/scenario/types.rs — Scenario definitions

use serde::{Deserialize, Serialize};

/// A scripted role-play exercise: persona, style rules and an ordered step list.
/// Loaded once at startup and shared immutably between sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    pub scenario_code: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub title: String,
    /// Language the learner is practising.
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub prompt_style: PromptStyle,
    /// Static message returned when a session starts without an LLM call.
    #[serde(default)]
    pub welcome: String,
    pub persona: String,
    #[serde(default)]
    pub style_guidelines: Vec<String>,
    /// Output-format constraints. Non-empty means replies must be structured JSON.
    #[serde(default)]
    pub technical_requirements: Vec<String>,
    #[serde(default)]
    pub response_schema: ResponseSchema,
    pub steps: Vec<StepTemplate>,
}

fn default_language() -> String {
    "Indonesian".into()
}

impl ScenarioDefinition {
    /// Whether the gateway must answer with the JSON shape in `response_schema`.
    pub fn is_structured(&self) -> bool {
        !self.technical_requirements.is_empty()
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

/// Prompt framing selected by scenario metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    /// Stay in character as the persona.
    #[default]
    Roleplay,
    /// Act as a tutor giving feedback between turns.
    Coach,
}

/// One stage of the script. Never mutated after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTemplate {
    pub step_id: String,
    pub step_goal: String,
    #[serde(default)]
    pub target_vocab: Vec<String>,
    #[serde(default)]
    pub hints: Vec<String>,
}

/// Shape of a structured reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSchema {
    #[serde(default = "default_reply_field")]
    pub reply_field: String,
    #[serde(default = "default_metadata_field")]
    pub metadata_field: String,
    #[serde(default = "default_max_sentences")]
    pub max_sentences: u8,
    #[serde(default = "default_expression_labels")]
    pub expression_labels: Vec<String>,
}

impl Default for ResponseSchema {
    fn default() -> Self {
        Self {
            reply_field: default_reply_field(),
            metadata_field: default_metadata_field(),
            max_sentences: default_max_sentences(),
            expression_labels: default_expression_labels(),
        }
    }
}

impl ResponseSchema {
    pub fn allows_label(&self, label: &str) -> bool {
        self.expression_labels.iter().any(|l| l == label)
    }

    /// Label substituted for one outside the closed set.
    pub fn fallback_label(&self) -> &str {
        if self.allows_label("neutral") {
            "neutral"
        } else {
            self.expression_labels
                .first()
                .map(String::as_str)
                .unwrap_or("neutral")
        }
    }
}

fn default_reply_field() -> String {
    "ai_response".into()
}

fn default_metadata_field() -> String {
    "meta".into()
}

fn default_max_sentences() -> u8 {
    2
}

fn default_expression_labels() -> Vec<String> {
    [
        "smile",
        "warm",
        "neutral",
        "thinking",
        "confused",
        "surprised",
        "encouraging",
        "apologetic",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_scenario() {
        let toml_str = r#"
scenario_code = "mini"
title = "Mini"
persona = "A friendly neighbour."

[[steps]]
step_id = "hello"
step_goal = "Say hello"
"#;
        let def: ScenarioDefinition = toml::from_str(toml_str).unwrap();
        assert_eq!(def.scenario_code, "mini");
        assert_eq!(def.language, "Indonesian");
        assert_eq!(def.prompt_style, PromptStyle::Roleplay);
        assert!(!def.is_structured());
        assert_eq!(def.step_count(), 1);
        assert!(def.steps[0].target_vocab.is_empty());
        assert_eq!(def.response_schema, ResponseSchema::default());
    }

    #[test]
    fn test_prompt_style_parses_lowercase() {
        let toml_str = r#"
scenario_code = "c"
title = "C"
persona = "Tutor"
prompt_style = "coach"
technical_requirements = ["Respond as JSON"]

[[steps]]
step_id = "a"
step_goal = "b"
"#;
        let def: ScenarioDefinition = toml::from_str(toml_str).unwrap();
        assert_eq!(def.prompt_style, PromptStyle::Coach);
        assert!(def.is_structured());
    }

    #[test]
    fn test_schema_fallback_label() {
        let schema = ResponseSchema::default();
        assert!(schema.allows_label("smile"));
        assert!(!schema.allows_label("angry"));
        assert_eq!(schema.fallback_label(), "neutral");

        let custom = ResponseSchema {
            expression_labels: vec!["happy".into(), "sad".into()],
            ..Default::default()
        };
        assert_eq!(custom.fallback_label(), "happy");
    }
}
