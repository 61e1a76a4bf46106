// src/engine/mod.rs
pub mod orchestrator;
pub mod types;

pub use orchestrator::Orchestrator;
pub use types::*;
