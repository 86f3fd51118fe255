//! Strategy Layer - Spread Statistics, Regime Adaptation and Signal Validation
//!
//! Implements the statistical core of the pair-spread engine:
//! - Rolling mean / population std / z-score over a bounded spread window
//! - Regime and session-window classification with gradual multiplier blending
//! - Tiered validation with cost-aware minimum-profit gating
//! - Leg leadership over a short lookback
//!
//! Z-Score Formula: z = (rolling_mean - current_spread) / rolling_std
//!
//! Thresholds flow one way: `Profile` + `ValidationConfig` + multipliers
//! -> `ThresholdSet` (immutable, versioned) -> `SignalValidator::evaluate`.

pub mod params;
pub mod spread_stats;
pub mod regime;
pub mod validator;
pub mod leadership;

pub use params::{
    ContractsByTier, GuaranteeConfig, MomentumConfig, ParamError, Profile, ThresholdMultipliers, ThresholdPrecedence,
    ThresholdSet, TierLadder, ValidationConfig,
};
pub use spread_stats::{SpreadSample, SpreadStatistics, SpreadStatsTracker, ZScore};
pub use regime::{
    Classification, RegimeConfig, RegimeConfigError, RegimeController, RegimeInputs, RegimeStatus, ThresholdPublisher,
    TimeWindowRule,
};
pub use validator::SignalValidator;
pub use leadership::{LeadershipConfig, LeadershipTracker};
