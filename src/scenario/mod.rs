// src/scenario/mod.rs — Scenario catalog: scripted role-play exercises

pub mod catalog;
pub mod loader;
pub mod types;

pub use catalog::ScenarioCatalog;
pub use types::{PromptStyle, ResponseSchema, ScenarioDefinition, StepTemplate};
