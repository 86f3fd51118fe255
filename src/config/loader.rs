//! Configuration Loader
//!
//! Loads and validates the engine configuration from a TOML file
//! (see `config/arbitrage.toml`). Every section has defaults, so a minimal
//! file only needs what differs from them.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::profiles::ProfileStore;
use crate::domain::{BehaviorConfig, CostModel, DataQualityConfig, InstrumentPair, InstrumentSpec};
use crate::strategy::{LeadershipConfig, ParamError, Profile, RegimeConfig, RegimeConfigError, ValidationConfig};

/// Environment variable that overrides `engine.active_profile`
pub const PROFILE_ENV: &str = "ARBITRAGE_PROFILE";

/// Main configuration structure matching arbitrage.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default = "default_instruments")]
    pub instruments: InstrumentPair,
    #[serde(default)]
    pub costs: CostModel,
    #[serde(default)]
    pub data_quality: DataQualityConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub behavior: BehaviorConfig,
    #[serde(default)]
    pub dynamic: RegimeConfig,
    #[serde(default)]
    pub leadership: LeadershipConfig,
    /// Named profiles; the built-in presets are used when empty
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Engine section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub active_profile: String,
    /// Reports are tagged so downstream consumers never route orders
    pub alert_only: bool,
    pub opportunity_history_size: usize,
    /// Period of the regime adjustment timer in the runner
    pub adjustment_tick_sec: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            active_profile: "default".to_string(),
            alert_only: true,
            opportunity_history_size: crate::domain::opportunity::DEFAULT_OPPORTUNITY_HISTORY,
            adjustment_tick_sec: 5,
        }
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// WDO (mini) against DOL (full), B3 contract specs
fn default_instruments() -> InstrumentPair {
    InstrumentPair {
        leg_a: InstrumentSpec::new("WDOFUT", dec!(0.5), dec!(5), dec!(10)),
        leg_b: InstrumentSpec::new("DOLFUT", dec!(0.5), dec!(25), dec!(50)),
        price_ratio: 1.0,
        contract_ratio: 5,
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Unknown profile '{name}' (available: {available})")]
    UnknownProfile { name: String, available: String },
    #[error("Invalid parameters: {0}")]
    Param(#[from] ParamError),
    #[error("Invalid dynamic adjustment settings: {0}")]
    Regime(#[from] RegimeConfigError),
}

/// Typed runtime settings resolved from a validated [`Config`]
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub pair: InstrumentPair,
    pub costs: CostModel,
    pub data_quality: DataQualityConfig,
    pub validation: ValidationConfig,
    pub behavior: BehaviorConfig,
    pub regime: RegimeConfig,
    pub leadership: LeadershipConfig,
    pub profiles: ProfileStore,
    pub alert_only: bool,
    pub opportunity_history_size: usize,
    pub adjustment_tick: Duration,
}

/// Load configuration from a TOML file, applying the profile env override
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    config.apply_profile_override(std::env::var(PROFILE_ENV).ok());
    config.validate()?;
    Ok(config)
}

/// Parse without validation or environment overrides
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineSection::default(),
            instruments: default_instruments(),
            costs: CostModel::default(),
            data_quality: DataQualityConfig::default(),
            validation: ValidationConfig::default(),
            behavior: BehaviorConfig::default(),
            dynamic: RegimeConfig::default(),
            leadership: LeadershipConfig::default(),
            profiles: BTreeMap::new(),
            logging: LoggingSection::default(),
        }
    }
}

impl Config {
    /// Replace the active profile when an override is present and non-empty
    pub fn apply_profile_override(&mut self, name: Option<String>) {
        if let Some(name) = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
            tracing::info!("Active profile overridden by {}: {}", PROFILE_ENV, name);
            self.engine.active_profile = name;
        }
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Instruments
        for leg in [&self.instruments.leg_a, &self.instruments.leg_b] {
            if leg.symbol.is_empty() {
                return Err(ConfigError::ValidationError("instrument symbol cannot be empty".to_string()));
            }
            if !leg.is_consistent() {
                return Err(ConfigError::ValidationError(format!(
                    "{}: point_value {} != tick_value {} / tick_size {}",
                    leg.symbol, leg.point_value, leg.tick_value, leg.tick_size
                )));
            }
        }
        if self.instruments.leg_a.symbol == self.instruments.leg_b.symbol {
            return Err(ConfigError::ValidationError(format!(
                "legs must differ, both are {}",
                self.instruments.leg_a.symbol
            )));
        }
        if !self.instruments.price_ratio.is_finite() || self.instruments.price_ratio <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "price_ratio must be > 0, got {}",
                self.instruments.price_ratio
            )));
        }
        if self.instruments.contract_ratio == 0 {
            return Err(ConfigError::ValidationError("contract_ratio must be >= 1".to_string()));
        }

        // Costs
        if self.costs.exchange_fee_per_contract < Decimal::ZERO || self.costs.brokerage_per_contract < Decimal::ZERO {
            return Err(ConfigError::ValidationError(format!("costs cannot be negative: {:?}", self.costs)));
        }

        // Data quality
        let dq = &self.data_quality;
        if !(dq.max_book_spread_a > 0.0) || !(dq.max_book_spread_b > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "max_book_spread must be > 0, got {} / {}",
                dq.max_book_spread_a, dq.max_book_spread_b
            )));
        }

        // Behavior
        let b = &self.behavior;
        if !(b.max_confidence > 0.0 && b.max_confidence <= 100.0) {
            return Err(ConfigError::ValidationError(format!(
                "max_confidence must be 0-100, got {}",
                b.max_confidence
            )));
        }
        if !(b.confidence_bonus_per_confirmation >= 0.0) || b.weights.values().any(|w| !(*w >= 0.0)) {
            return Err(ConfigError::ValidationError(
                "confirmation bonus and weights must be >= 0".to_string(),
            ));
        }

        // Engine
        if self.engine.opportunity_history_size == 0 {
            return Err(ConfigError::ValidationError("opportunity_history_size must be > 0".to_string()));
        }
        if self.engine.adjustment_tick_sec == 0 {
            return Err(ConfigError::ValidationError("adjustment_tick_sec must be > 0".to_string()));
        }

        if self.leadership.lookback < 2 || !(self.leadership.imbalance_ratio >= 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "leadership lookback must be >= 2 and imbalance_ratio >= 1, got {:?}",
                self.leadership
            )));
        }

        self.validation.validate()?;
        self.dynamic.validate()?;

        // Profiles (also checks the active profile exists)
        let store = ProfileStore::from_config(self)?;
        if let Some(history) = store.iter().map(|p| p.history_size).min() {
            if self.engine.opportunity_history_size >= history {
                return Err(ConfigError::ValidationError(format!(
                    "opportunity_history_size {} must be smaller than the smallest profile history_size {}",
                    self.engine.opportunity_history_size, history
                )));
            }
        }

        Ok(())
    }

    /// Resolve typed runtime settings
    pub fn resolve(&self) -> Result<EngineSettings, ConfigError> {
        self.validate()?;
        Ok(EngineSettings {
            pair: self.instruments.clone(),
            costs: self.costs,
            data_quality: self.data_quality.clone(),
            validation: self.validation.clone(),
            behavior: self.behavior.clone(),
            regime: self.dynamic.clone(),
            leadership: self.leadership,
            profiles: ProfileStore::from_config(self)?,
            alert_only: self.engine.alert_only,
            opportunity_history_size: self.engine.opportunity_history_size,
            adjustment_tick: Duration::from_secs(self.engine.adjustment_tick_sec),
        })
    }
}

impl EngineSettings {
    pub fn active_profile(&self) -> &Profile {
        self.profiles.active()
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            pair: default_instruments(),
            costs: CostModel::default(),
            data_quality: DataQualityConfig::default(),
            validation: ValidationConfig::default(),
            behavior: BehaviorConfig::default(),
            regime: RegimeConfig::default(),
            leadership: LeadershipConfig::default(),
            profiles: ProfileStore::presets(),
            alert_only: true,
            opportunity_history_size: crate::domain::opportunity::DEFAULT_OPPORTUNITY_HISTORY,
            adjustment_tick: Duration::from_secs(5),
        }
    }
}
