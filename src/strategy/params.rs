//! Strategy Parameters
//!
//! Strongly typed threshold objects validated once at load time:
//! profiles (base values), the validation ladder, regime/time multipliers,
//! and the effective [`ThresholdSet`] that results from combining them.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::{ConfidenceTier, Regime, TimeWindow};

/// Descending z-score ladder for tier selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierLadder {
    #[serde(rename = "threshold_low")]
    pub low: f64,
    #[serde(rename = "threshold_medium")]
    pub medium: f64,
    #[serde(rename = "threshold_high")]
    pub high: f64,
    #[serde(rename = "threshold_extreme")]
    pub extreme: f64,
}

impl Default for TierLadder {
    fn default() -> Self {
        Self {
            low: 1.2,
            medium: 1.5,
            high: 2.0,
            extreme: 2.5,
        }
    }
}

impl TierLadder {
    pub fn validate(&self) -> Result<(), ParamError> {
        let rungs = [self.low, self.medium, self.high, self.extreme];
        if rungs.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            return Err(ParamError::NonPositiveThreshold(format!("{:?}", self)));
        }
        if !(self.low <= self.medium && self.medium <= self.high && self.high <= self.extreme) {
            return Err(ParamError::LadderNotMonotonic {
                low: self.low,
                medium: self.medium,
                high: self.high,
                extreme: self.extreme,
            });
        }
        Ok(())
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            low: self.low * factor,
            medium: self.medium * factor,
            high: self.high * factor,
            extreme: self.extreme * factor,
        }
    }

    /// Highest rung reached by `z_abs`, evaluated from the top with `>=`
    pub fn tier_for(&self, z_abs: f64) -> Option<ConfidenceTier> {
        if z_abs >= self.extreme {
            Some(ConfidenceTier::Extreme)
        } else if z_abs >= self.high {
            Some(ConfidenceTier::High)
        } else if z_abs >= self.medium {
            Some(ConfidenceTier::Medium)
        } else if z_abs >= self.low {
            Some(ConfidenceTier::Low)
        } else {
            None
        }
    }
}

/// Recommended leg B contracts per tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractsByTier {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
    pub extreme: u32,
}

impl Default for ContractsByTier {
    fn default() -> Self {
        Self {
            low: 1,
            medium: 2,
            high: 3,
            extreme: 5,
        }
    }
}

impl ContractsByTier {
    pub fn get(&self, tier: ConfidenceTier) -> u32 {
        match tier {
            ConfidenceTier::Low => self.low,
            ConfidenceTier::Medium => self.medium,
            ConfidenceTier::High => self.high,
            ConfidenceTier::Extreme => self.extreme,
        }
    }

    pub fn as_array(&self) -> [u32; 4] {
        [self.low, self.medium, self.high, self.extreme]
    }

    /// Scale every tier, flooring and keeping at least one contract
    pub fn scaled(&self, factor: f64) -> Self {
        let scale = |c: u32| ((c as f64 * factor).floor() as u32).max(1);
        Self {
            low: scale(self.low),
            medium: scale(self.medium),
            high: scale(self.high),
            extreme: scale(self.extreme),
        }
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        if self.as_array().iter().any(|c| *c == 0) {
            return Err(ParamError::ZeroContracts);
        }
        Ok(())
    }
}

/// Multipliers applied to a profile's base values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdMultipliers {
    pub std_threshold: f64,
    pub min_profit: f64,
    pub slippage: f64,
    pub contracts: f64,
}

impl Default for ThresholdMultipliers {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ThresholdMultipliers {
    pub const IDENTITY: Self = Self {
        std_threshold: 1.0,
        min_profit: 1.0,
        slippage: 1.0,
        contracts: 1.0,
    };

    pub fn new(std_threshold: f64, min_profit: f64, slippage: f64, contracts: f64) -> Self {
        Self {
            std_threshold,
            min_profit,
            slippage,
            contracts,
        }
    }

    /// Field-wise product
    pub fn combine(&self, other: &Self) -> Self {
        Self {
            std_threshold: self.std_threshold * other.std_threshold,
            min_profit: self.min_profit * other.min_profit,
            slippage: self.slippage * other.slippage,
            contracts: self.contracts * other.contracts,
        }
    }

    /// Linear interpolation toward `target` with weight `w` in (0, 1]
    pub fn blend_toward(&self, target: &Self, w: f64) -> Self {
        let lerp = |cur: f64, tgt: f64| cur * (1.0 - w) + tgt * w;
        Self {
            std_threshold: lerp(self.std_threshold, target.std_threshold),
            min_profit: lerp(self.min_profit, target.min_profit),
            slippage: lerp(self.slippage, target.slippage),
            contracts: lerp(self.contracts, target.contracts),
        }
    }

    /// Largest absolute field difference
    pub fn distance(&self, other: &Self) -> f64 {
        [
            (self.std_threshold - other.std_threshold).abs(),
            (self.min_profit - other.min_profit).abs(),
            (self.slippage - other.slippage).abs(),
            (self.contracts - other.contracts).abs(),
        ]
        .into_iter()
        .fold(0.0, f64::max)
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        for (name, value) in [
            ("std_threshold", self.std_threshold),
            ("min_profit", self.min_profit),
            ("slippage", self.slippage),
            ("contracts", self.contracts),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ParamError::InvalidMultiplier { field: name, value });
            }
        }
        Ok(())
    }
}

/// Named bundle of base parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    /// Admission z-score (basic alert threshold)
    pub spread_std_devs: f64,
    pub min_samples_for_signal: usize,
    /// Spread ring buffer capacity
    pub history_size: usize,
    /// Minimum net profit per signal, in account currency
    pub min_profit: Decimal,
    /// Expected slippage per contract per round trip, in leg B points
    pub slippage_points: Decimal,
    #[serde(default)]
    pub contracts: ContractsByTier,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            spread_std_devs: 1.5,
            min_samples_for_signal: 20,
            history_size: 100,
            min_profit: dec!(20),
            slippage_points: dec!(0.5),
            contracts: ContractsByTier::default(),
        }
    }
}

impl Profile {
    pub fn conservative() -> Self {
        Self {
            name: "conservative".to_string(),
            spread_std_devs: 2.0,
            min_samples_for_signal: 30,
            history_size: 150,
            min_profit: dec!(30),
            slippage_points: dec!(0.5),
            contracts: ContractsByTier { low: 1, medium: 1, high: 2, extreme: 3 },
        }
    }

    pub fn aggressive() -> Self {
        Self {
            name: "aggressive".to_string(),
            spread_std_devs: 1.0,
            min_samples_for_signal: 15,
            history_size: 50,
            min_profit: dec!(10),
            slippage_points: dec!(0.5),
            contracts: ContractsByTier::default(),
        }
    }

    pub fn small_spreads() -> Self {
        Self {
            name: "small_spreads".to_string(),
            spread_std_devs: 1.0,
            min_samples_for_signal: 10,
            history_size: 50,
            min_profit: dec!(5),
            slippage_points: dec!(0),
            contracts: ContractsByTier { low: 1, medium: 1, high: 2, extreme: 2 },
        }
    }

    /// Built-in presets, used when the configuration defines none
    pub fn presets() -> Vec<Profile> {
        vec![
            Profile::default(),
            Profile::conservative(),
            Profile::aggressive(),
            Profile::small_spreads(),
        ]
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        if !self.spread_std_devs.is_finite() || self.spread_std_devs <= 0.0 {
            return Err(ParamError::NonPositiveThreshold(format!(
                "profile '{}' spread_std_devs = {}",
                self.name, self.spread_std_devs
            )));
        }
        if self.min_samples_for_signal < 2 {
            return Err(ParamError::InvalidMinSamples(self.min_samples_for_signal));
        }
        if self.history_size < self.min_samples_for_signal {
            return Err(ParamError::HistoryTooSmall {
                history_size: self.history_size,
                min_samples: self.min_samples_for_signal,
            });
        }
        if self.min_profit < Decimal::ZERO {
            return Err(ParamError::NegativeAmount("min_profit", self.min_profit));
        }
        if self.slippage_points < Decimal::ZERO {
            return Err(ParamError::NegativeAmount("slippage_points", self.slippage_points));
        }
        self.contracts.validate()
    }
}

/// Which configured value gates admission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdPrecedence {
    /// The active profile's `spread_std_devs` replaces the ladder's low rung
    #[default]
    Profile,
    /// The validation ladder's `low` rung gates admission; `spread_std_devs` is ignored
    Validation,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentumConfig {
    pub enabled: bool,
    /// Weight of the z-score change added to |z|
    pub weight: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            weight: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuaranteeConfig {
    pub enabled: bool,
    /// |z| at or above which the profit floor applies
    pub z_threshold: f64,
    /// Minimum expected move per contract, in leg B points
    pub min_points: f64,
}

impl Default for GuaranteeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            z_threshold: 3.0,
            min_points: 1.0,
        }
    }
}

/// Static validator configuration (advanced validation table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(flatten)]
    pub ladder: TierLadder,
    #[serde(default)]
    pub threshold_precedence: ThresholdPrecedence,
    /// Standard deviation floor below which statistics are degenerate
    pub min_std_dev: f64,
    /// Absolute spread above which data is considered corrupt
    pub max_spread_abs: f64,
    /// Stop distance in standard deviations
    #[serde(default = "default_stop_std_multiple")]
    pub stop_std_multiple: f64,
    #[serde(default)]
    pub momentum: MomentumConfig,
    #[serde(default)]
    pub guarantee: GuaranteeConfig,
}

fn default_stop_std_multiple() -> f64 {
    2.0
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            ladder: TierLadder::default(),
            threshold_precedence: ThresholdPrecedence::default(),
            min_std_dev: 0.05,
            max_spread_abs: 5.0,
            stop_std_multiple: default_stop_std_multiple(),
            momentum: MomentumConfig::default(),
            guarantee: GuaranteeConfig::default(),
        }
    }
}

impl ValidationConfig {
    pub fn validate(&self) -> Result<(), ParamError> {
        self.ladder.validate()?;
        if !self.min_std_dev.is_finite() || self.min_std_dev < 0.0 {
            return Err(ParamError::NonPositiveThreshold(format!("min_std_dev = {}", self.min_std_dev)));
        }
        if !self.max_spread_abs.is_finite() || self.max_spread_abs <= 0.0 {
            return Err(ParamError::NonPositiveThreshold(format!("max_spread_abs = {}", self.max_spread_abs)));
        }
        if !self.stop_std_multiple.is_finite() || self.stop_std_multiple <= 0.0 {
            return Err(ParamError::NonPositiveThreshold(format!(
                "stop_std_multiple = {}",
                self.stop_std_multiple
            )));
        }
        if !self.momentum.weight.is_finite() || self.momentum.weight < 0.0 {
            return Err(ParamError::NonPositiveThreshold(format!("momentum.weight = {}", self.momentum.weight)));
        }
        if self.guarantee.enabled
            && (self.guarantee.z_threshold <= 0.0 || !(self.guarantee.min_points >= 0.0))
        {
            return Err(ParamError::NonPositiveThreshold(format!("guarantee = {:?}", self.guarantee)));
        }
        Ok(())
    }

    /// Unscaled admission threshold under the configured precedence
    pub fn admission_threshold(&self, profile: &Profile) -> f64 {
        match self.threshold_precedence {
            ThresholdPrecedence::Profile => profile.spread_std_devs,
            ThresholdPrecedence::Validation => self.ladder.low,
        }
    }
}

/// Effective thresholds after regime and time-of-day scaling.
///
/// Built wholesale and published behind an `Arc`; never mutated after
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdSet {
    pub version: u64,
    pub profile: String,
    /// Admission z-score
    pub std_threshold: f64,
    pub ladder: TierLadder,
    pub min_profit: Decimal,
    pub slippage_points: Decimal,
    pub contracts: ContractsByTier,
    pub min_samples_for_signal: usize,
    pub regime: Regime,
    pub time_window: TimeWindow,
    pub multipliers: ThresholdMultipliers,
}

impl ThresholdSet {
    pub fn build(
        profile: &Profile,
        validation: &ValidationConfig,
        multipliers: ThresholdMultipliers,
        regime: Regime,
        time_window: TimeWindow,
        version: u64,
    ) -> Self {
        Self {
            version,
            profile: profile.name.clone(),
            std_threshold: validation.admission_threshold(profile) * multipliers.std_threshold,
            ladder: validation.ladder.scaled(multipliers.std_threshold),
            min_profit: scale_decimal(profile.min_profit, multipliers.min_profit),
            slippage_points: scale_decimal(profile.slippage_points, multipliers.slippage),
            contracts: profile.contracts.scaled(multipliers.contracts),
            min_samples_for_signal: profile.min_samples_for_signal,
            regime,
            time_window,
            multipliers,
        }
    }

    /// Unscaled set for a profile
    pub fn base(profile: &Profile, validation: &ValidationConfig) -> Self {
        Self::build(
            profile,
            validation,
            ThresholdMultipliers::IDENTITY,
            Regime::Normal,
            TimeWindow::Normal,
            0,
        )
    }

    /// Tier for an absolute z-score, `None` below admission.
    ///
    /// Anything admitted but below the ladder's low rung is graded Low.
    pub fn tier_for(&self, z_abs: f64) -> Option<ConfidenceTier> {
        if !(z_abs >= self.std_threshold) {
            return None;
        }
        Some(self.ladder.tier_for(z_abs).unwrap_or(ConfidenceTier::Low))
    }
}

/// Scale a decimal amount by a float multiplier, rounded to cents
fn scale_decimal(amount: Decimal, factor: f64) -> Decimal {
    match Decimal::from_f64(factor) {
        Some(f) => (amount * f).round_dp(2),
        None => amount,
    }
}

/// Parameter validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    #[error("Threshold must be positive and finite: {0}")]
    NonPositiveThreshold(String),
    #[error("Tier ladder must be non-decreasing: low {low} <= medium {medium} <= high {high} <= extreme {extreme}")]
    LadderNotMonotonic { low: f64, medium: f64, high: f64, extreme: f64 },
    #[error("Contracts per tier must be at least 1")]
    ZeroContracts,
    #[error("Invalid multiplier {field} = {value} (must be > 0)")]
    InvalidMultiplier { field: &'static str, value: f64 },
    #[error("Invalid min_samples_for_signal: {0} (minimum 2)")]
    InvalidMinSamples(usize),
    #[error("history_size {history_size} smaller than min_samples_for_signal {min_samples}")]
    HistoryTooSmall { history_size: usize, min_samples: usize },
    #[error("{0} cannot be negative: {1}")]
    NegativeAmount(&'static str, Decimal),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ladder_valid() {
        assert!(TierLadder::default().validate().is_ok());
        assert!(ValidationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_ladder_rejects_inverted_rungs() {
        let ladder = TierLadder { low: 1.6, medium: 1.5, high: 2.0, extreme: 2.5 };
        assert!(matches!(ladder.validate(), Err(ParamError::LadderNotMonotonic { .. })));

        let negative = TierLadder { low: -1.0, ..TierLadder::default() };
        assert!(matches!(negative.validate(), Err(ParamError::NonPositiveThreshold(_))));
    }

    #[test]
    fn test_ladder_boundaries_inclusive() {
        let ladder = TierLadder::default();
        assert_eq!(ladder.tier_for(1.5), Some(ConfidenceTier::Medium));
        assert_eq!(ladder.tier_for(1.4999), Some(ConfidenceTier::Low));
        assert_eq!(ladder.tier_for(2.0), Some(ConfidenceTier::High));
        assert_eq!(ladder.tier_for(2.5), Some(ConfidenceTier::Extreme));
        assert_eq!(ladder.tier_for(1.1), None);
    }

    #[test]
    fn test_ladder_monotonic_in_z() {
        let set = ThresholdSet::base(&Profile::aggressive(), &ValidationConfig::default());
        let mut previous = None;
        for step in 0..400 {
            let z = step as f64 * 0.01;
            let tier = set.tier_for(z);
            assert!(tier >= previous, "tier decreased at z = {}", z);
            previous = tier;
        }
    }

    #[test]
    fn test_contracts_scaling_floors_at_one() {
        let contracts = ContractsByTier::default();
        assert_eq!(contracts.scaled(0.5).as_array(), [1, 1, 1, 2]);
        assert_eq!(contracts.scaled(2.0).as_array(), [2, 4, 6, 10]);
        assert_eq!(contracts.get(ConfidenceTier::High), 3);
    }

    #[test]
    fn test_multipliers_combine_and_blend() {
        let regime = ThresholdMultipliers::new(1.3, 1.5, 1.2, 0.5);
        let window = ThresholdMultipliers::new(1.2, 1.0, 1.0, 1.0);
        let combined = regime.combine(&window);
        assert!((combined.std_threshold - 1.56).abs() < 1e-12);
        assert_eq!(combined.contracts, 0.5);

        let blended = ThresholdMultipliers::IDENTITY.blend_toward(&combined, 0.5);
        assert!((blended.std_threshold - 1.28).abs() < 1e-12);
        assert!((blended.distance(&combined) - 0.28).abs() < 1e-12);
    }

    #[test]
    fn test_multiplier_validation() {
        assert!(ThresholdMultipliers::IDENTITY.validate().is_ok());
        let bad = ThresholdMultipliers { slippage: 0.0, ..ThresholdMultipliers::IDENTITY };
        assert!(matches!(bad.validate(), Err(ParamError::InvalidMultiplier { field: "slippage", .. })));
    }

    #[test]
    fn test_profile_presets_valid() {
        for profile in Profile::presets() {
            assert!(profile.validate().is_ok(), "preset {} invalid", profile.name);
        }
    }

    #[test]
    fn test_profile_history_smaller_than_min_samples() {
        let profile = Profile { history_size: 10, min_samples_for_signal: 20, ..Profile::default() };
        assert!(matches!(profile.validate(), Err(ParamError::HistoryTooSmall { .. })));
    }

    #[test]
    fn test_threshold_set_applies_multipliers() {
        let profile = Profile::default();
        let validation = ValidationConfig::default();
        let multipliers = ThresholdMultipliers::new(1.3, 1.5, 2.0, 0.5);
        let set = ThresholdSet::build(&profile, &validation, multipliers, Regime::HighVolatility, TimeWindow::Normal, 7);

        assert_eq!(set.version, 7);
        assert!((set.std_threshold - 1.95).abs() < 1e-12);
        assert!((set.ladder.medium - 1.95).abs() < 1e-12);
        assert_eq!(set.min_profit, dec!(30));
        assert_eq!(set.slippage_points, dec!(1));
        assert_eq!(set.contracts.as_array(), [1, 1, 1, 2]);
        assert_eq!(set.regime, Regime::HighVolatility);
    }

    #[test]
    fn test_precedence_selects_admission_threshold() {
        let profile = Profile::aggressive();
        let mut validation = ValidationConfig::default();

        let set = ThresholdSet::base(&profile, &validation);
        assert_eq!(set.std_threshold, 1.0);
        // Admitted below the ladder's low rung: graded Low
        assert_eq!(set.tier_for(1.05), Some(ConfidenceTier::Low));

        validation.threshold_precedence = ThresholdPrecedence::Validation;
        let set = ThresholdSet::base(&profile, &validation);
        assert_eq!(set.std_threshold, 1.2);
        assert_eq!(set.tier_for(1.05), None);
    }
}
