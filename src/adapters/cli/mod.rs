//! CLI Adapter
//!
//! Command-line interface for the spread engine.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{execute, CheckCmd, CliApp, Command, ProfilesCmd, RunCmd};

/// Initialize the CLI application
pub fn init() -> CliApp {
    use clap::Parser;
    CliApp::parse()
}
