//! Signal Validator
//!
//! Turns spread statistics plus the currently published thresholds into a
//! graded [`Outcome`]. Pure: holds only static configuration, never mutates.
//!
//! Gate order:
//! 1. Z-score state (insufficient history, degenerate volatility)
//! 2. Spread sanity ceiling
//! 3. Admission threshold on the (optionally momentum-adjusted) |z|
//! 4. Minimum net profit after costs and slippage
//!
//! Tier ladder, evaluated from the top with `>=`:
//! - |z| >= extreme -> EXTREME (premium)
//! - |z| >= high    -> HIGH
//! - |z| >= medium  -> MEDIUM
//! - otherwise      -> LOW (anything admitted)

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use super::params::{ThresholdSet, ValidationConfig};
use super::spread_stats::{SpreadStatistics, ZScore};
use crate::domain::{
    BehaviorConfig, BehaviorConfirmation, ConfidenceTier, CostModel, InstrumentPair, NoSignalReason, Outcome,
    SpreadDirection, TradeSignal,
};

#[derive(Debug, Clone)]
pub struct SignalValidator {
    validation: ValidationConfig,
    behavior: BehaviorConfig,
    pair: InstrumentPair,
}

impl SignalValidator {
    pub fn new(validation: ValidationConfig, behavior: BehaviorConfig, pair: InstrumentPair) -> Self {
        Self {
            validation,
            behavior,
            pair,
        }
    }

    pub fn validation(&self) -> &ValidationConfig {
        &self.validation
    }

    pub fn pair(&self) -> &InstrumentPair {
        &self.pair
    }

    /// Absolute z after the momentum nudge, clamped at zero
    pub fn effective_z(&self, z: f64, momentum: Option<f64>) -> f64 {
        let base = z.abs();
        match momentum {
            Some(m) if self.validation.momentum.enabled && m.is_finite() => {
                (base + self.validation.momentum.weight * m * z.signum()).max(0.0)
            }
            _ => base,
        }
    }

    pub fn evaluate(
        &self,
        stats: &SpreadStatistics,
        thresholds: &ThresholdSet,
        costs: &CostModel,
        confirmations: &[BehaviorConfirmation],
    ) -> Outcome {
        let z = match stats.z_score {
            ZScore::InsufficientData { count, required } => {
                return Outcome::NoSignal(NoSignalReason::InsufficientHistory { count, required });
            }
            ZScore::Degenerate { std_dev } => {
                return Outcome::NoSignal(NoSignalReason::DegenerateVolatility { std_dev });
            }
            ZScore::Ready { value } => value,
        };

        if !(stats.std_dev > self.validation.min_std_dev) || !z.is_finite() {
            return Outcome::NoSignal(NoSignalReason::DegenerateVolatility { std_dev: stats.std_dev });
        }

        if stats.current_spread.abs() > self.validation.max_spread_abs {
            return Outcome::NoSignal(NoSignalReason::SpreadOutOfRange {
                spread: stats.current_spread,
                ceiling: self.validation.max_spread_abs,
            });
        }

        let effective_z = self.effective_z(z, stats.momentum);
        let z_tier = match thresholds.tier_for(effective_z) {
            Some(tier) => tier,
            None => {
                return Outcome::NoSignal(NoSignalReason::BelowThreshold {
                    z_score: effective_z,
                    threshold: thresholds.std_threshold,
                });
            }
        };

        // Behavior confirmations raise confidence and may upgrade the tier
        let counted: Vec<BehaviorConfirmation> = self.behavior.counted(confirmations).cloned().collect();
        let confidence_pct =
            (z_tier.base_confidence() + self.behavior.bonus(confirmations)).min(self.behavior.max_confidence);
        let tier = match ConfidenceTier::from_confidence(confidence_pct) {
            Some(boosted) if boosted > z_tier => boosted,
            _ => z_tier,
        };

        let contracts = thresholds.contracts.get(tier);
        let std_dev = stats.std_dev;
        let mut expected_move = (stats.mean - stats.current_spread).abs();

        let guaranteed = self.validation.guarantee.enabled && z.abs() >= self.validation.guarantee.z_threshold;
        if guaranteed {
            expected_move = expected_move.max(self.validation.guarantee.min_points);
        }

        let leg_b = &self.pair.leg_b;
        let gross_profit = leg_b.value_of_move(expected_move, contracts).unwrap_or(Decimal::ZERO);
        let slippage_cost = leg_b.value_of_points(thresholds.slippage_points, contracts);
        let total_costs = costs.round_trip(contracts) + slippage_cost;
        let net_profit_estimate = gross_profit - total_costs;

        if net_profit_estimate < thresholds.min_profit {
            debug!(
                "Tier {} rejected: net {} < minimum {} ({} contracts, move {:.2} pts)",
                tier, net_profit_estimate, thresholds.min_profit, contracts, expected_move
            );
            return Outcome::NoSignal(NoSignalReason::BelowMinimumProfit {
                net: net_profit_estimate,
                minimum: thresholds.min_profit,
            });
        }

        let risk = Decimal::from_f64(std_dev)
            .map(|points| leg_b.value_of_points(points, contracts).round_dp(2))
            .unwrap_or(Decimal::ZERO);

        let direction = SpreadDirection::from_z(z);
        let stop_distance = self.validation.stop_std_multiple * std_dev;
        let stop_spread = match direction {
            SpreadDirection::LongSpread => stats.current_spread - stop_distance,
            SpreadDirection::ShortSpread => stats.current_spread + stop_distance,
        };

        Outcome::Signal(TradeSignal {
            direction,
            tier,
            recommended_contracts: contracts,
            hedge_contracts: self.pair.hedge_contracts(contracts),
            net_profit_estimate,
            gross_profit,
            total_costs,
            risk,
            confidence_pct,
            premium: tier.is_premium(),
            guaranteed,
            z_score: z,
            effective_z,
            entry_spread: stats.current_spread,
            target_spread: stats.mean,
            stop_spread,
            confirmations: counted,
        })
    }
}
