// src/conversation/reply.rs — Parse raw gateway text into an assistant reply

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::infra::errors::{ParlayError, Result};
use crate::scenario::{ResponseSchema, ScenarioDefinition};

/// Reply text plus whatever metadata the scenario's schema carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistantReply {
    pub text: String,
    pub expressions: Vec<Expression>,
    /// The metadata object as returned by the model, when present.
    pub meta: Option<Value>,
}

impl AssistantReply {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            expressions: Vec::new(),
            meta: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub sentence: u32,
    pub label: String,
}

/// Parse `raw` according to the scenario's output requirements.
pub fn parse_reply(raw: &str, scenario: &ScenarioDefinition) -> Result<AssistantReply> {
    if !scenario.is_structured() {
        let text = raw.trim();
        if text.is_empty() {
            return Err(ParlayError::malformed("empty reply", raw));
        }
        return Ok(AssistantReply::plain(text));
    }
    parse_structured(raw, &scenario.response_schema)
}

fn parse_structured(raw: &str, schema: &ResponseSchema) -> Result<AssistantReply> {
    let json = extract_json_object(raw)
        .ok_or_else(|| ParlayError::malformed("no JSON object in reply", raw))?;

    let value: Value = serde_json::from_str(json)
        .map_err(|e| ParlayError::malformed(format!("invalid JSON: {e}"), raw))?;
    let obj = value
        .as_object()
        .ok_or_else(|| ParlayError::malformed("reply is not a JSON object", raw))?;

    let text = obj
        .get(&schema.reply_field)
        .and_then(coerce_text)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            ParlayError::malformed(
                format!("missing or empty '{}' field", schema.reply_field),
                raw,
            )
        })?;

    let meta = obj
        .get(&schema.metadata_field)
        .filter(|m| m.is_object())
        .cloned();
    let expressions = meta
        .as_ref()
        .map(|m| parse_expressions(m, schema))
        .unwrap_or_default();

    Ok(AssistantReply {
        text,
        expressions,
        meta,
    })
}

/// Strip an optional Markdown fence and take the outermost `{...}` span.
fn extract_json_object(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```"))
        .unwrap_or(trimmed);

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    (end > start).then(|| &unfenced[start..=end])
}

/// Coerce a reply field into one trimmed string. Accepts a string, an array of
/// string or `{text}` fragments, or a `{text}` object.
fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Array(parts) => {
            let fragments: Vec<String> = parts
                .iter()
                .filter_map(|p| match p {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Object(o) => o.get("text").and_then(Value::as_str).map(|s| s.trim().to_string()),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
                .collect();
            if fragments.is_empty() {
                None
            } else {
                Some(fragments.join(" "))
            }
        }
        Value::Object(o) => o
            .get("text")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string()),
        _ => None,
    }
}

fn parse_expressions(meta: &Value, schema: &ResponseSchema) -> Vec<Expression> {
    let Some(entries) = meta.get("expressions").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut expressions: Vec<Expression> = entries
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| {
            let label = entry.get("label").and_then(Value::as_str)?;
            let position = u32::try_from(i + 1).unwrap_or(u32::MAX);
            let sentence = entry
                .get("sentence")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(position);
            let label = if schema.allows_label(label) {
                label.to_string()
            } else {
                tracing::warn!(
                    "Expression label '{}' not allowed; using '{}'",
                    label,
                    schema.fallback_label()
                );
                schema.fallback_label().to_string()
            };
            Some(Expression { sentence, label })
        })
        .collect();

    let max = usize::from(schema.max_sentences);
    if expressions.len() > max {
        tracing::warn!(
            "Reply carried {} expressions; keeping the first {}",
            expressions.len(),
            max
        );
        expressions.truncate(max);
    }
    expressions
}
