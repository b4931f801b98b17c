// src/scenario/catalog.rs — Read-only lookup from scenario code/alias to definition
//
// Lookup is lenient: codes are trimmed, lowercased, and `_`/spaces are treated as `-`.
// Callers that face end users go through `resolve_or_default`, which falls back to the
// default scenario instead of surfacing `UnknownScenario`.

use std::collections::HashMap;
use std::sync::Arc;

use super::loader;
use super::types::ScenarioDefinition;
use crate::infra::config::ScenariosConfig;
use crate::infra::errors::{ParlayError, Result};

/// Minimum Jaro-Winkler similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

pub struct ScenarioCatalog {
    scenarios: Vec<Arc<ScenarioDefinition>>,
    /// Normalized code or alias -> index into `scenarios`.
    index: HashMap<String, usize>,
    default_idx: usize,
}

impl ScenarioCatalog {
    /// Build a catalog. Later definitions with the same code replace earlier ones.
    pub fn new(defs: Vec<ScenarioDefinition>, default_code: &str) -> Result<Self> {
        let mut scenarios: Vec<Arc<ScenarioDefinition>> = Vec::new();

        for def in defs {
            loader::validate(&def)?;
            let key = normalize(&def.scenario_code);
            match scenarios
                .iter()
                .position(|s| normalize(&s.scenario_code) == key)
            {
                Some(pos) => {
                    tracing::debug!("Scenario '{}' overridden", def.scenario_code);
                    scenarios[pos] = Arc::new(def);
                }
                None => scenarios.push(Arc::new(def)),
            }
        }

        let mut index = HashMap::new();
        // Aliases first so a primary code always wins over another scenario's alias.
        for (i, def) in scenarios.iter().enumerate() {
            for alias in &def.aliases {
                index.entry(normalize(alias)).or_insert(i);
            }
        }
        for (i, def) in scenarios.iter().enumerate() {
            index.insert(normalize(&def.scenario_code), i);
        }

        let default_idx = *index.get(&normalize(default_code)).ok_or_else(|| {
            ParlayError::Config(format!("default scenario '{default_code}' is not defined"))
        })?;

        Ok(Self {
            scenarios,
            index,
            default_idx,
        })
    }

    /// Catalog of the scenarios embedded in the binary, defaulting to `local-buddy`.
    pub fn bundled() -> Result<Self> {
        Self::new(loader::load_bundled(), &ScenariosConfig::default().default)
    }

    /// Bundled scenarios plus any found in the configured directory.
    pub fn load(config: &ScenariosConfig) -> Result<Self> {
        let mut defs = loader::load_bundled();

        let dir = config.scenario_dir();
        if dir.exists() {
            match loader::load_from_directory(&dir) {
                Ok(extra) => {
                    tracing::info!("Loaded {} scenario(s) from {}", extra.len(), dir.display());
                    defs.extend(extra);
                }
                Err(e) => tracing::warn!("Failed to read scenario dir {}: {}", dir.display(), e),
            }
        }

        Self::new(defs, &config.default)
    }

    /// Exact (normalized) lookup by code or alias.
    pub fn get(&self, code: &str) -> Result<Arc<ScenarioDefinition>> {
        match self.index.get(&normalize(code)) {
            Some(&i) => Ok(Arc::clone(&self.scenarios[i])),
            None => Err(ParlayError::UnknownScenario {
                code: code.to_string(),
                suggestion: self.suggest(code),
            }),
        }
    }

    /// Lookup that never fails: unknown codes select the default scenario.
    pub fn resolve_or_default(&self, code: &str) -> Arc<ScenarioDefinition> {
        match self.get(code) {
            Ok(def) => def,
            Err(e) => {
                let fallback = self.default_scenario();
                tracing::warn!("{e}; falling back to '{}'", fallback.scenario_code);
                fallback
            }
        }
    }

    pub fn default_scenario(&self) -> Arc<ScenarioDefinition> {
        Arc::clone(&self.scenarios[self.default_idx])
    }

    /// Primary codes in load order.
    pub fn codes(&self) -> Vec<&str> {
        self.scenarios
            .iter()
            .map(|s| s.scenario_code.as_str())
            .collect()
    }

    pub fn all(&self) -> &[Arc<ScenarioDefinition>] {
        &self.scenarios
    }

    fn suggest(&self, code: &str) -> Option<String> {
        let needle = normalize(code);
        let mut best: Option<(&str, f64)> = None;
        for (key, &i) in &self.index {
            let score = strsim::jaro_winkler(key, &needle);
            if score > SUGGESTION_THRESHOLD && best.map_or(true, |(_, b)| score > b) {
                best = Some((self.scenarios[i].scenario_code.as_str(), score));
            }
        }
        best.map(|(code, _)| code.to_string())
    }
}

fn normalize(code: &str) -> String {
    code.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '_' || c.is_whitespace() { '-' } else { c })
        .collect()
}
