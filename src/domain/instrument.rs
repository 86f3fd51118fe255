//! Instrument Specifications
//!
//! Contract metadata for the two legs of the pair and the exact-decimal
//! money conversions that drive the minimum-profit gate.
//!
//! Prices and spreads are quoted in points. A point is worth `point_value`
//! of account currency per contract and moves in increments of `tick_size`,
//! each tick worth `tick_value`. All currency math goes through
//! [`rust_decimal::Decimal`] so the profit gate never sees float noise.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Static contract specification for one futures instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    /// Exchange symbol (e.g. "WDOFUT")
    pub symbol: String,
    /// Minimum price increment in points
    pub tick_size: Decimal,
    /// Currency value of one tick per contract
    pub tick_value: Decimal,
    /// Currency value of one full point per contract
    pub point_value: Decimal,
}

impl InstrumentSpec {
    pub fn new(symbol: impl Into<String>, tick_size: Decimal, tick_value: Decimal, point_value: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            tick_size,
            tick_value,
            point_value,
        }
    }

    /// Check that tick and point values describe the same contract
    pub fn is_consistent(&self) -> bool {
        self.tick_size > Decimal::ZERO
            && self.tick_value > Decimal::ZERO
            && self.point_value > Decimal::ZERO
            && self.tick_value / self.tick_size == self.point_value
    }

    /// Convert a float point move into whole ticks, truncating toward zero.
    ///
    /// Partial ticks are not tradeable, so they never count toward profit.
    /// Returns `None` for non-finite input.
    pub fn whole_ticks(&self, points: f64) -> Option<Decimal> {
        let points = Decimal::from_f64(points)?;
        Some((points / self.tick_size).round_dp_with_strategy(0, RoundingStrategy::ToZero))
    }

    /// Currency value of a point move for `contracts` contracts, tick-truncated
    pub fn value_of_move(&self, points: f64, contracts: u32) -> Option<Decimal> {
        let ticks = self.whole_ticks(points)?;
        Some(ticks * self.tick_value * Decimal::from(contracts))
    }

    /// Currency value of an exact decimal point amount (no tick truncation)
    pub fn value_of_points(&self, points: Decimal, contracts: u32) -> Decimal {
        points * self.point_value * Decimal::from(contracts)
    }
}

/// Per-contract transaction costs, charged on each side of a round trip
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Exchange fees per contract per side
    pub exchange_fee_per_contract: Decimal,
    /// Brokerage per contract per side
    pub brokerage_per_contract: Decimal,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            exchange_fee_per_contract: Decimal::new(27, 2),
            brokerage_per_contract: Decimal::new(50, 2),
        }
    }
}

impl CostModel {
    /// Total cost of entering and exiting `contracts` contracts
    pub fn round_trip(&self, contracts: u32) -> Decimal {
        (self.exchange_fee_per_contract + self.brokerage_per_contract) * Decimal::from(contracts) * Decimal::TWO
    }
}

/// The two legs of the arbitrage and their price equivalence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentPair {
    /// Mini contract (e.g. WDO)
    pub leg_a: InstrumentSpec,
    /// Full-size contract (e.g. DOL); spreads and profits are priced in its points
    pub leg_b: InstrumentSpec,
    /// Multiplier applied to leg A's price before subtracting leg B's
    pub price_ratio: f64,
    /// Number of leg A contracts equivalent to one leg B contract
    pub contract_ratio: u32,
}

impl InstrumentPair {
    /// Spread in leg B points: `price_a * price_ratio - price_b`
    pub fn spread(&self, price_a: f64, price_b: f64) -> f64 {
        price_a * self.price_ratio - price_b
    }

    /// Leg A contracts needed to hedge `contracts` leg B contracts
    pub fn hedge_contracts(&self, contracts: u32) -> u32 {
        contracts.saturating_mul(self.contract_ratio)
    }

    /// Which leg a symbol belongs to, if any
    pub fn leg_of(&self, symbol: &str) -> Option<Leg> {
        if symbol == self.leg_a.symbol {
            Some(Leg::A)
        } else if symbol == self.leg_b.symbol {
            Some(Leg::B)
        } else {
            None
        }
    }
}

/// Leg selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Leg {
    A,
    B,
}
