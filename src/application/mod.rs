//! Application Layer
//!
//! The engine owns the pipeline state; the runner wires it to a quote feed.

pub mod engine;
pub mod runner;

pub use engine::{ArbitrageEngine, EngineError, SessionStats};
pub use runner::{EngineRunner, RunSummary};
