//! Configuration Module
//!
//! Loads and validates configuration from TOML files, and resolves the
//! named profiles into the active parameter set.

pub mod loader;
pub mod profiles;

pub use loader::{
    load_config, parse_config, Config, ConfigError, EngineSection, EngineSettings, LoggingSection, PROFILE_ENV,
};
pub use profiles::ProfileStore;
