// src/conversation/prompt.rs — Assembles the system prompt for each gateway call
//
// Pure functions: same inputs, same output, no I/O.
//
// Sections (in order):
//   1. Framing (picked by the scenario's prompt style)
//   2. Persona
//   3. Style guidelines
//   4. Output format (structured scenarios only)
//   5. Scenario
//   6. Current step
//   7. Recent dialogue
//   8. Learner input

use std::fmt::Write;

use super::sequencer::{ConversationStep, Speaker, Turn};
use crate::scenario::{PromptStyle, ResponseSchema, ScenarioDefinition};

/// Stands in for the learner's message, which travels as the user turn.
pub const USER_INPUT_PLACEHOLDER: &str = "{user_input}";

/// Build the prompt for one learner turn at `step`.
///
/// `earlier` holds turns from before the current step; the step's own exchanges
/// come from its `recent_dialog`, so no turn is rendered twice.
pub fn build_prompt(step: &ConversationStep, scenario: &ScenarioDefinition, earlier: &[Turn]) -> String {
    let mut prompt = String::with_capacity(2048);

    append_framing(&mut prompt, scenario);
    append_persona(&mut prompt, scenario);
    append_guidelines(&mut prompt, scenario);
    if scenario.is_structured() {
        append_output_format(&mut prompt, scenario);
    }
    append_scenario(&mut prompt, scenario);
    append_step(&mut prompt, step);
    append_dialogue(&mut prompt, earlier, step.recent_dialog());

    prompt.push_str("# Learner input\n\n");
    prompt.push_str(USER_INPUT_PLACEHOLDER);
    prompt.push_str("\n\n");
    prompt.push_str(closing_instruction(scenario.prompt_style));
    prompt.push('\n');

    prompt
}

/// Build the prompt that produces the opening message of a session.
/// No history and no learner input.
pub fn build_initial_prompt(scenario: &ScenarioDefinition) -> String {
    let mut prompt = String::with_capacity(1536);

    append_framing(&mut prompt, scenario);
    append_persona(&mut prompt, scenario);
    append_guidelines(&mut prompt, scenario);
    if scenario.is_structured() {
        append_output_format(&mut prompt, scenario);
    }
    append_scenario(&mut prompt, scenario);

    if let Some(first) = scenario.steps.first() {
        prompt.push_str("# First step\n\n");
        let _ = writeln!(prompt, "Step: {}", first.step_id);
        let _ = writeln!(prompt, "Goal: {}", first.step_goal);
        if !first.target_vocab.is_empty() {
            let _ = writeln!(prompt, "Target vocabulary: {}", first.target_vocab.join(", "));
        }
        prompt.push('\n');
    }

    prompt.push_str("# Opening\n\n");
    let _ = writeln!(
        prompt,
        "Open the conversation with a short greeting in {} that invites the learner \
         to work towards the first step's goal. The learner has not said anything yet.",
        scenario.language
    );

    prompt
}

// ─── Section builders ───────────────────────────────────────────────────────

fn append_framing(prompt: &mut String, scenario: &ScenarioDefinition) {
    match scenario.prompt_style {
        PromptStyle::Roleplay => {
            let _ = writeln!(
                prompt,
                "You are role-playing with someone learning {}. Stay in character for the \
                 whole conversation and never mention that this is an exercise.\n",
                scenario.language
            );
        }
        PromptStyle::Coach => {
            let _ = writeln!(
                prompt,
                "You are a tutor guiding someone learning {} through a short practice session. Give brief, \
                 specific feedback and keep the learner practising.\n",
                scenario.language
            );
        }
    }
}

fn append_persona(prompt: &mut String, scenario: &ScenarioDefinition) {
    prompt.push_str("# Persona\n\n");
    prompt.push_str(scenario.persona.trim());
    prompt.push_str("\n\n");
}

fn append_guidelines(prompt: &mut String, scenario: &ScenarioDefinition) {
    if scenario.style_guidelines.is_empty() {
        return;
    }
    prompt.push_str("# Style guidelines\n\n");
    for rule in &scenario.style_guidelines {
        let _ = writeln!(prompt, "- {rule}");
    }
    prompt.push('\n');
}

fn append_output_format(prompt: &mut String, scenario: &ScenarioDefinition) {
    prompt.push_str("# Output format\n\n");
    for req in &scenario.technical_requirements {
        let _ = writeln!(prompt, "- {req}");
    }
    prompt.push('\n');
    prompt.push_str(&describe_schema(&scenario.response_schema));
    prompt.push('\n');
}

/// Human-readable description of the structured reply shape.
pub fn describe_schema(schema: &ResponseSchema) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Return exactly this JSON shape:");
    let _ = writeln!(
        out,
        "{{\"{reply}\": \"<your reply, at most {max} sentences>\", \"{meta}\": {{\"expressions\": [{{\"sentence\": 1, \"label\": \"<label>\"}}]}}}}",
        reply = schema.reply_field,
        meta = schema.metadata_field,
        max = schema.max_sentences,
    );
    let _ = writeln!(
        out,
        "\"expressions\" must have exactly one entry per sentence in \"{}\" (at most {}), numbered from 1.",
        schema.reply_field, schema.max_sentences
    );
    let _ = writeln!(
        out,
        "Each \"label\" must be one of: {}.",
        schema.expression_labels.join(", ")
    );
    out
}

fn append_scenario(prompt: &mut String, scenario: &ScenarioDefinition) {
    prompt.push_str("# Scenario\n\n");
    let _ = writeln!(prompt, "Code: {}", scenario.scenario_code);
    let _ = writeln!(prompt, "Title: {}", scenario.title);
    let _ = writeln!(prompt, "Language: {}", scenario.language);
    prompt.push('\n');
}

fn append_step(prompt: &mut String, step: &ConversationStep) {
    prompt.push_str("# Current step\n\n");
    let _ = writeln!(prompt, "Step: {}", step.step_id());
    let _ = writeln!(prompt, "Goal: {}", step.step_goal());
    if !step.target_vocab().is_empty() {
        let _ = writeln!(prompt, "Target vocabulary: {}", step.target_vocab().join(", "));
    }
    if !step.hints().is_empty() {
        prompt.push_str("Hints:\n");
        for hint in step.hints() {
            let _ = writeln!(prompt, "- {hint}");
        }
    }
    prompt.push('\n');
}

/// Earlier turns first, then the current step's exchanges, oldest to newest.
fn append_dialogue(prompt: &mut String, earlier: &[Turn], step_dialog: &str) {
    prompt.push_str("# Recent dialogue\n\n");
    if earlier.is_empty() && step_dialog.is_empty() {
        prompt.push_str("(none yet)\n");
    } else {
        for turn in earlier {
            let _ = writeln!(prompt, "{}: {}", speaker_label(turn.speaker), turn.text);
        }
        prompt.push_str(step_dialog);
    }
    prompt.push('\n');
}

pub(crate) fn speaker_label(speaker: Speaker) -> &'static str {
    match speaker {
        Speaker::User => "Learner",
        Speaker::Assistant => "You",
    }
}

fn closing_instruction(style: PromptStyle) -> &'static str {
    match style {
        PromptStyle::Roleplay => "Reply in character to the learner's message, steering towards the current step's goal.",
        PromptStyle::Coach => "Respond to the learner's attempt with feedback and one next thing to try.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::StepTemplate;
    use pretty_assertions::assert_eq;

    fn scenario(structured: bool) -> ScenarioDefinition {
        ScenarioDefinition {
            scenario_code: "local-buddy".into(),
            aliases: vec![],
            title: "Local Buddy".into(),
            language: "Indonesian".into(),
            prompt_style: PromptStyle::Roleplay,
            welcome: "Halo!".into(),
            persona: "You are Sari.".into(),
            style_guidelines: vec!["Be brief.".into(), "Ask questions.".into()],
            technical_requirements: if structured {
                vec!["Respond with JSON only.".into()]
            } else {
                vec![]
            },
            response_schema: ResponseSchema::default(),
            steps: vec![StepTemplate {
                step_id: "greeting".into(),
                step_goal: "Exchange names".into(),
                target_vocab: vec!["Halo".into(), "Nama saya".into()],
                hints: vec!["Halo, nama saya ...".into()],
            }],
        }
    }

    fn step(s: &ScenarioDefinition) -> ConversationStep {
        ConversationStep::from_template(&s.steps[0])
    }

    #[test]
    fn test_sections_in_fixed_order() {
        let s = scenario(true);
        let prompt = build_prompt(&step(&s), &s, &[]);
        let order = [
            "You are role-playing",
            "# Persona",
            "# Style guidelines",
            "# Output format",
            "# Scenario",
            "# Current step",
            "# Recent dialogue",
            "# Learner input",
        ];
        let positions: Vec<usize> = order
            .iter()
            .map(|h| prompt.find(h).unwrap_or_else(|| panic!("missing {h}")))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
        assert!(prompt.contains(USER_INPUT_PLACEHOLDER));
    }

    #[test]
    fn test_schema_only_when_structured() {
        let plain = scenario(false);
        let prompt = build_prompt(&step(&plain), &plain, &[]);
        assert!(!prompt.contains("# Output format"));
        assert!(!prompt.contains("JSON"));

        let structured = scenario(true);
        let prompt = build_prompt(&step(&structured), &structured, &[]);
        assert!(prompt.contains("- Respond with JSON only."));
        assert!(prompt.contains("\"ai_response\""));
        assert!(prompt.contains("Each \"label\" must be one of: smile, warm, neutral"));
    }

    #[test]
    fn test_guidelines_bulleted_and_step_rendered() {
        let s = scenario(false);
        let prompt = build_prompt(&step(&s), &s, &[]);
        assert!(prompt.contains("# Style guidelines\n\n- Be brief.\n- Ask questions.\n"));
        assert!(prompt.contains(
            "# Current step\n\nStep: greeting\nGoal: Exchange names\nTarget vocabulary: Halo, Nama saya\nHints:\n- Halo, nama saya ...\n"
        ));
        assert!(prompt.contains("# Recent dialogue\n\n(none yet)\n"));
    }

    #[test]
    fn test_history_rendered_with_speaker_labels() {
        let s = scenario(false);
        let history = vec![Turn::user("Halo"), Turn::assistant("Halo juga!")];
        let prompt = build_prompt(&step(&s), &s, &history);
        assert!(prompt.contains("# Recent dialogue\n\nLearner: Halo\nYou: Halo juga!\n"));
    }

    #[test]
    fn test_each_turn_rendered_once() {
        let s = scenario(false);
        let mut current = step(&s);
        current.record(&Turn::user("Nama saya Budi"));
        current.record(&Turn::assistant("Senang bertemu, Budi!"));
        let earlier = vec![Turn::user("Halo"), Turn::assistant("Halo juga!")];

        let prompt = build_prompt(&current, &s, &earlier);
        for line in [
            "Learner: Halo\n",
            "You: Halo juga!\n",
            "Learner: Nama saya Budi\n",
            "You: Senang bertemu, Budi!\n",
        ] {
            assert_eq!(prompt.matches(line).count(), 1, "{line:?}");
        }
        assert!(prompt.contains(
            "# Recent dialogue\n\nLearner: Halo\nYou: Halo juga!\nLearner: Nama saya Budi\nYou: Senang bertemu, Budi!\n"
        ));
    }

    #[test]
    fn test_deterministic() {
        let s = scenario(true);
        let history = vec![Turn::user("Halo")];
        assert_eq!(
            build_prompt(&step(&s), &s, &history),
            build_prompt(&step(&s), &s, &history)
        );
    }

    #[test]
    fn test_coach_framing() {
        let mut s = scenario(false);
        s.prompt_style = PromptStyle::Coach;
        let prompt = build_prompt(&step(&s), &s, &[]);
        assert!(prompt.starts_with("You are a tutor guiding someone learning Indonesian"));
        assert!(prompt.contains("feedback and one next thing to try"));
    }

    #[test]
    fn test_initial_prompt_has_no_input_or_history() {
        let s = scenario(true);
        let prompt = build_initial_prompt(&s);
        assert!(prompt.contains("# Persona\n\nYou are Sari."));
        assert!(prompt.contains("# Output format"));
        assert!(prompt.contains("# First step\n\nStep: greeting\nGoal: Exchange names\n"));
        assert!(prompt.contains("# Opening"));
        assert!(!prompt.contains("# Recent dialogue"));
        assert!(!prompt.contains(USER_INPUT_PLACEHOLDER));
    }

    #[test]
    fn test_describe_schema_custom_fields() {
        let schema = ResponseSchema {
            reply_field: "reply".into(),
            metadata_field: "extra".into(),
            max_sentences: 3,
            expression_labels: vec!["happy".into()],
        };
        let text = describe_schema(&schema);
        assert_eq!(
            text,
            "Return exactly this JSON shape:\n\
             {\"reply\": \"<your reply, at most 3 sentences>\", \"extra\": {\"expressions\": [{\"sentence\": 1, \"label\": \"<label>\"}]}}\n\
             \"expressions\" must have exactly one entry per sentence in \"reply\" (at most 3), numbered from 1.\n\
             Each \"label\" must be one of: happy.\n"
        );
    }
}
