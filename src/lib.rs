// src/lib.rs — Library root for parlay

pub mod api;
pub mod cli;
pub mod conversation;
pub mod infra;
pub mod provider;
pub mod scenario;
