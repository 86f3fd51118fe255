//! Signal Types
//!
//! The graded outcome of a validation pass and the report handed to
//! downstream consumers (position monitor, logger, display).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::behavior::BehaviorConfirmation;
use super::regime::{Regime, TimeWindow};

/// Confidence tier, ordered from weakest to strongest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
    Extreme,
}

impl ConfidenceTier {
    /// Ascending order
    pub const ALL: [ConfidenceTier; 4] = [
        ConfidenceTier::Low,
        ConfidenceTier::Medium,
        ConfidenceTier::High,
        ConfidenceTier::Extreme,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Base confidence percentage before behavior bonuses
    pub fn base_confidence(&self) -> f64 {
        match self {
            ConfidenceTier::Low => 65.0,
            ConfidenceTier::Medium => 75.0,
            ConfidenceTier::High => 85.0,
            ConfidenceTier::Extreme => 95.0,
        }
    }

    /// Highest tier whose base confidence is reached by `confidence`
    pub fn from_confidence(confidence: f64) -> Option<Self> {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|tier| confidence >= tier.base_confidence())
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceTier::Low => "LOW",
            ConfidenceTier::Medium => "MEDIUM",
            ConfidenceTier::High => "HIGH",
            ConfidenceTier::Extreme => "EXTREME",
        }
    }

    pub fn is_premium(&self) -> bool {
        matches!(self, ConfidenceTier::Extreme)
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which way to put the spread on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadDirection {
    /// Spread below its mean: buy leg A, sell leg B
    LongSpread,
    /// Spread above its mean: sell leg A, buy leg B
    ShortSpread,
}

impl SpreadDirection {
    /// Direction implied by a z-score of the form `(mean - spread) / std`
    pub fn from_z(z_score: f64) -> Self {
        if z_score > 0.0 {
            SpreadDirection::LongSpread
        } else {
            SpreadDirection::ShortSpread
        }
    }
}

/// A validated opportunity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub direction: SpreadDirection,
    pub tier: ConfidenceTier,
    /// Leg B contracts
    pub recommended_contracts: u32,
    /// Leg A contracts that hedge the position
    pub hedge_contracts: u32,
    pub net_profit_estimate: Decimal,
    pub gross_profit: Decimal,
    pub total_costs: Decimal,
    /// One-standard-deviation adverse move, in currency
    pub risk: Decimal,
    /// Confidence percentage after behavior bonuses
    pub confidence_pct: f64,
    pub premium: bool,
    /// Profit floor from the guarantee clause was applied
    pub guaranteed: bool,
    /// Raw z-score from the tracker
    pub z_score: f64,
    /// Absolute z after the momentum nudge
    pub effective_z: f64,
    pub entry_spread: f64,
    pub target_spread: f64,
    pub stop_spread: f64,
    /// Confirmations that contributed a bonus
    pub confirmations: Vec<BehaviorConfirmation>,
}

impl TradeSignal {
    pub fn label(&self) -> &'static str {
        self.tier.label()
    }
}

/// Why an evaluation produced no signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum NoSignalReason {
    InsufficientHistory { count: usize, required: usize },
    DegenerateVolatility { std_dev: f64 },
    SpreadOutOfRange { spread: f64, ceiling: f64 },
    BelowThreshold { z_score: f64, threshold: f64 },
    BelowMinimumProfit { net: Decimal, minimum: Decimal },
}

impl NoSignalReason {
    pub fn key(&self) -> &'static str {
        match self {
            NoSignalReason::InsufficientHistory { .. } => "insufficient_history",
            NoSignalReason::DegenerateVolatility { .. } => "degenerate_volatility",
            NoSignalReason::SpreadOutOfRange { .. } => "spread_out_of_range",
            NoSignalReason::BelowThreshold { .. } => "below_threshold",
            NoSignalReason::BelowMinimumProfit { .. } => "below_minimum_profit",
        }
    }
}

impl fmt::Display for NoSignalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoSignalReason::InsufficientHistory { count, required } => {
                write!(f, "Waiting for samples: {}/{}", count, required)
            }
            NoSignalReason::DegenerateVolatility { std_dev } => {
                write!(f, "Spread volatility collapsed: std {:.4}", std_dev)
            }
            NoSignalReason::SpreadOutOfRange { spread, ceiling } => {
                write!(f, "Spread {:.2} beyond sanity ceiling {:.2}", spread, ceiling)
            }
            NoSignalReason::BelowThreshold { z_score, threshold } => {
                write!(f, "Z-score {:.2} below threshold {:.2}", z_score, threshold)
            }
            NoSignalReason::BelowMinimumProfit { net, minimum } => {
                write!(f, "Net profit {} below minimum {}", net, minimum)
            }
        }
    }
}

/// Result of one validation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    NoSignal(NoSignalReason),
    Signal(TradeSignal),
}

impl Outcome {
    pub fn is_signal(&self) -> bool {
        matches!(self, Outcome::Signal(_))
    }

    pub fn signal(&self) -> Option<&TradeSignal> {
        match self {
            Outcome::Signal(s) => Some(s),
            Outcome::NoSignal(_) => None,
        }
    }

    pub fn tier(&self) -> Option<ConfidenceTier> {
        self.signal().map(|s| s.tier)
    }
}

/// Leg that moved first over the leadership lookback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Leader {
    LegA,
    LegB,
    #[default]
    Neutral,
}

/// Everything the engine exposes for one evaluated snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub timestamp: DateTime<Utc>,
    pub spread: f64,
    pub outcome: Outcome,
    pub regime: Regime,
    pub time_window: TimeWindow,
    pub thresholds_version: u64,
    pub leader: Leader,
    /// Downstream consumers must not route orders when set
    pub alert_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(ConfidenceTier::Low < ConfidenceTier::Medium);
        assert!(ConfidenceTier::Medium < ConfidenceTier::High);
        assert!(ConfidenceTier::High < ConfidenceTier::Extreme);
        assert_eq!(ConfidenceTier::Extreme.index(), 3);
    }

    #[test]
    fn test_tier_from_confidence() {
        assert_eq!(ConfidenceTier::from_confidence(60.0), None);
        assert_eq!(ConfidenceTier::from_confidence(65.0), Some(ConfidenceTier::Low));
        assert_eq!(ConfidenceTier::from_confidence(80.0), Some(ConfidenceTier::Medium));
        assert_eq!(ConfidenceTier::from_confidence(95.0), Some(ConfidenceTier::Extreme));
    }

    #[test]
    fn test_only_extreme_is_premium() {
        let premium: Vec<_> = ConfidenceTier::ALL.iter().filter(|t| t.is_premium()).collect();
        assert_eq!(premium, vec![&ConfidenceTier::Extreme]);
    }

    #[test]
    fn test_direction_from_z() {
        assert_eq!(SpreadDirection::from_z(1.5), SpreadDirection::LongSpread);
        assert_eq!(SpreadDirection::from_z(-1.5), SpreadDirection::ShortSpread);
    }

    #[test]
    fn test_outcome_serializes_tagged() {
        let outcome = Outcome::NoSignal(NoSignalReason::InsufficientHistory { count: 3, required: 20 });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["kind"], "no_signal");
        assert_eq!(json["reason"], "insufficient_history");
        assert_eq!(json["count"], 3);
        assert!(outcome.tier().is_none());
    }
}
