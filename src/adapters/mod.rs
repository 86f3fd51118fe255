//! Adapters Layer - External System Implementations
//!
//! - Replay: JSON-lines quote files
//! - Synthetic: seeded mean-reverting quote generator for dry runs
//! - CLI: command-line interface handlers

pub mod cli;
pub mod replay;
pub mod synthetic;

pub use cli::CliApp;
pub use replay::ReplayFeed;
pub use synthetic::{QuoteGenerator, SyntheticConfig, SyntheticFeed};
