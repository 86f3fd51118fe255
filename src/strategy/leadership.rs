//! Leg Leadership
//!
//! Reports which leg is driving the spread: over the last `lookback`
//! mids, a leg leads when its move exceeds the other's by `imbalance_ratio`.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::domain::Leader;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadershipConfig {
    pub history_size: usize,
    pub lookback: usize,
    pub imbalance_ratio: f64,
}

impl Default for LeadershipConfig {
    fn default() -> Self {
        Self {
            history_size: 50,
            lookback: 5,
            imbalance_ratio: 1.2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LeadershipTracker {
    config: LeadershipConfig,
    mids_a: VecDeque<f64>,
    mids_b: VecDeque<f64>,
}

impl LeadershipTracker {
    pub fn new(config: LeadershipConfig) -> Self {
        let config = LeadershipConfig {
            history_size: config.history_size.max(config.lookback).max(2),
            lookback: config.lookback.max(2),
            ..config
        };
        Self {
            mids_a: VecDeque::with_capacity(config.history_size),
            mids_b: VecDeque::with_capacity(config.history_size),
            config,
        }
    }

    pub fn record(&mut self, mid_a: f64, mid_b: f64) {
        if self.mids_a.len() == self.config.history_size {
            self.mids_a.pop_front();
            self.mids_b.pop_front();
        }
        self.mids_a.push_back(mid_a);
        self.mids_b.push_back(mid_b);
    }

    fn lookback_move(&self, mids: &VecDeque<f64>) -> Option<f64> {
        let n = mids.len();
        if n < self.config.lookback {
            return None;
        }
        Some(mids[n - 1] - mids[n - self.config.lookback])
    }

    pub fn leader(&self) -> Leader {
        let (Some(move_a), Some(move_b)) = (self.lookback_move(&self.mids_a), self.lookback_move(&self.mids_b))
        else {
            return Leader::Neutral;
        };
        let ratio = self.config.imbalance_ratio;
        if move_a.abs() > move_b.abs() * ratio {
            Leader::LegA
        } else if move_b.abs() > move_a.abs() * ratio {
            Leader::LegB
        } else {
            Leader::Neutral
        }
    }

    pub fn len(&self) -> usize {
        self.mids_a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mids_a.is_empty()
    }

    pub fn reset(&mut self) {
        self.mids_a.clear();
        self.mids_b.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(tracker: &mut LeadershipTracker, a: &[f64], b: &[f64]) {
        for (x, y) in a.iter().zip(b) {
            tracker.record(*x, *y);
        }
    }

    #[test]
    fn test_neutral_until_lookback_filled() {
        let mut tracker = LeadershipTracker::new(LeadershipConfig::default());
        feed(&mut tracker, &[5000.0, 5010.0, 5020.0, 5030.0], &[5000.0; 4]);
        assert_eq!(tracker.leader(), Leader::Neutral);
    }

    #[test]
    fn test_leg_a_leads() {
        let mut tracker = LeadershipTracker::new(LeadershipConfig::default());
        feed(
            &mut tracker,
            &[5000.0, 5001.0, 5002.0, 5003.0, 5004.0],
            &[5000.0, 5000.5, 5001.0, 5001.0, 5001.0],
        );
        assert_eq!(tracker.leader(), Leader::LegA);
    }

    #[test]
    fn test_leg_b_leads_and_balanced_is_neutral() {
        let mut tracker = LeadershipTracker::new(LeadershipConfig::default());
        feed(&mut tracker, &[5000.0; 5], &[5000.0, 4999.0, 4998.0, 4997.0, 4996.0]);
        assert_eq!(tracker.leader(), Leader::LegB);

        tracker.reset();
        feed(
            &mut tracker,
            &[5000.0, 5001.0, 5002.0, 5003.0, 5004.0],
            &[5000.0, 5001.0, 5002.0, 5003.0, 5004.5],
        );
        // 4.5 vs 4.0 is within the 1.2 imbalance ratio
        assert_eq!(tracker.leader(), Leader::Neutral);
    }

    #[test]
    fn test_history_bounded() {
        let mut tracker = LeadershipTracker::new(LeadershipConfig {
            history_size: 10,
            ..LeadershipConfig::default()
        });
        for i in 0..25 {
            tracker.record(i as f64, i as f64);
        }
        assert_eq!(tracker.len(), 10);
    }
}
