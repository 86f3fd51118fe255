//! Opportunity History
//!
//! Append-only, bounded record of validated signals for post-hoc analysis.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::regime::{Regime, TimeWindow};
use super::signal::{ConfidenceTier, SpreadDirection, TradeSignal};

/// Default number of opportunities kept
pub const DEFAULT_OPPORTUNITY_HISTORY: usize = 30;

/// Snapshot of a validated signal at creation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityRecord {
    pub timestamp: DateTime<Utc>,
    pub z_score_at_signal: f64,
    pub confidence_tier: ConfidenceTier,
    pub confidence_pct: f64,
    pub direction: SpreadDirection,
    pub recommended_contracts: u32,
    pub net_profit_estimate: Decimal,
    pub regime_at_signal: Regime,
    pub time_window_at_signal: TimeWindow,
}

impl OpportunityRecord {
    pub fn from_signal(
        signal: &TradeSignal,
        timestamp: DateTime<Utc>,
        regime: Regime,
        time_window: TimeWindow,
    ) -> Self {
        Self {
            timestamp,
            z_score_at_signal: signal.z_score,
            confidence_tier: signal.tier,
            confidence_pct: signal.confidence_pct,
            direction: signal.direction,
            recommended_contracts: signal.recommended_contracts,
            net_profit_estimate: signal.net_profit_estimate,
            regime_at_signal: regime,
            time_window_at_signal: time_window,
        }
    }
}

/// Bounded FIFO of opportunity records (oldest evicted first)
#[derive(Debug, Clone)]
pub struct OpportunityLog {
    records: VecDeque<OpportunityRecord>,
    capacity: usize,
}

impl Default for OpportunityLog {
    fn default() -> Self {
        Self::new(DEFAULT_OPPORTUNITY_HISTORY)
    }
}

impl OpportunityLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, record: OpportunityRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&OpportunityRecord> {
        self.records.back()
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &OpportunityRecord> {
        self.records.iter()
    }

    /// Count of records per tier, ascending tier order
    pub fn tier_counts(&self) -> [usize; 4] {
        let mut counts = [0usize; 4];
        for record in &self.records {
            counts[record.confidence_tier.index()] += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(z: f64, tier: ConfidenceTier) -> OpportunityRecord {
        OpportunityRecord {
            timestamp: Utc::now(),
            z_score_at_signal: z,
            confidence_tier: tier,
            confidence_pct: tier.base_confidence(),
            direction: SpreadDirection::from_z(z),
            recommended_contracts: 1,
            net_profit_estimate: dec!(25),
            regime_at_signal: Regime::Normal,
            time_window_at_signal: TimeWindow::Normal,
        }
    }

    #[test]
    fn test_log_is_bounded() {
        let mut log = OpportunityLog::new(3);
        for i in 0..5 {
            log.push(record(i as f64, ConfidenceTier::Low));
        }
        assert_eq!(log.len(), 3);
        let zs: Vec<f64> = log.iter().map(|r| r.z_score_at_signal).collect();
        assert_eq!(zs, vec![2.0, 3.0, 4.0]);
        assert_eq!(log.latest().unwrap().z_score_at_signal, 4.0);
    }

    #[test]
    fn test_tier_counts() {
        let mut log = OpportunityLog::default();
        log.push(record(1.2, ConfidenceTier::Low));
        log.push(record(2.1, ConfidenceTier::High));
        log.push(record(-2.2, ConfidenceTier::High));
        assert_eq!(log.tier_counts(), [1, 0, 2, 0]);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut log = OpportunityLog::new(0);
        log.push(record(1.0, ConfidenceTier::Low));
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.len(), 1);
    }
}
