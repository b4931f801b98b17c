// src/scenario/loader.rs — Scenario loading from bundled and user sources

use std::path::Path;

use super::types::ScenarioDefinition;
use crate::infra::errors::{ParlayError, Result};

/// Bundled scenarios (embedded in binary via include_str!).
const BUNDLED_SCENARIOS: &[(&str, &str)] = &[
    ("local-buddy", include_str!("../../scenarios/local-buddy.toml")),
    ("warung-order", include_str!("../../scenarios/warung-order.toml")),
    (
        "pronunciation-coach",
        include_str!("../../scenarios/pronunciation-coach.toml"),
    ),
];

/// Load bundled scenarios from embedded strings.
pub fn load_bundled() -> Vec<ScenarioDefinition> {
    let mut scenarios = Vec::new();

    for (name, content) in BUNDLED_SCENARIOS {
        match parse_scenario(content) {
            Ok(def) => scenarios.push(def),
            Err(e) => tracing::warn!("Failed to parse bundled scenario '{}': {}", name, e),
        }
    }

    scenarios
}

/// Load every `*.toml` file in `dir`. Files that fail to parse or validate are skipped.
pub fn load_from_directory(dir: &Path) -> Result<Vec<ScenarioDefinition>> {
    let mut scenarios = Vec::new();

    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();

    for path in paths {
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Failed to read scenario {}: {}", path.display(), e);
                continue;
            }
        };
        match parse_scenario(&content) {
            Ok(def) => {
                tracing::debug!("Loaded scenario '{}' from {}", def.scenario_code, path.display());
                scenarios.push(def);
            }
            Err(e) => tracing::warn!("Skipping scenario {}: {}", path.display(), e),
        }
    }

    Ok(scenarios)
}

/// Parse and validate one TOML scenario definition.
pub fn parse_scenario(content: &str) -> Result<ScenarioDefinition> {
    let def: ScenarioDefinition =
        toml::from_str(content).map_err(|e| ParlayError::InvalidScenario {
            code: "<unparsed>".into(),
            reason: e.to_string(),
        })?;
    validate(&def)?;
    Ok(def)
}

pub fn validate(def: &ScenarioDefinition) -> Result<()> {
    let invalid = |reason: &str| ParlayError::InvalidScenario {
        code: def.scenario_code.clone(),
        reason: reason.to_string(),
    };

    if def.scenario_code.trim().is_empty() {
        return Err(invalid("scenario_code is empty"));
    }
    if def.steps.is_empty() {
        return Err(invalid("scenario has no steps"));
    }
    for (i, step) in def.steps.iter().enumerate() {
        if def.steps[..i].iter().any(|s| s.step_id == step.step_id) {
            return Err(invalid(&format!("duplicate step_id '{}'", step.step_id)));
        }
    }
    if def.is_structured() {
        if def.response_schema.reply_field.trim().is_empty() {
            return Err(invalid("response_schema.reply_field is empty"));
        }
        if def.response_schema.expression_labels.is_empty() {
            return Err(invalid("response_schema.expression_labels is empty"));
        }
    }
    Ok(())
}
