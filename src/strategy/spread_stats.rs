//! Spread Statistics Tracker
//!
//! Rolling mean, population standard deviation and z-score over a bounded
//! window of spread samples.
//!
//! Z-Score Formula: z = (rolling_mean - current_spread) / rolling_std
//!
//! A positive z means the spread sits below its mean (expected to rise).
//!
//! Mean and variance are maintained with a windowed Welford update (an add
//! step for the new sample and a remove step for the evicted one), so each
//! update is O(1). The window is re-summed exactly every `capacity` updates
//! to keep accumulated rounding error bounded on long sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default standard deviation floor
pub const DEFAULT_MIN_STD_DEV: f64 = 0.05;

/// One recorded spread observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadSample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Z-score state; never a numeric stand-in for "no data"
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ZScore {
    /// Fewer samples than required for a signal
    InsufficientData { count: usize, required: usize },
    /// Enough samples but the standard deviation is at or below the floor
    Degenerate { std_dev: f64 },
    Ready { value: f64 },
}

impl ZScore {
    pub fn value(&self) -> Option<f64> {
        match self {
            ZScore::Ready { value } => Some(*value),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ZScore::Ready { .. })
    }
}

/// Statistics derived from the current window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadStatistics {
    pub count: usize,
    pub capacity: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub current_spread: f64,
    pub z_score: ZScore,
    /// Change in z since the previous ready update
    pub momentum: Option<f64>,
    pub last_updated: DateTime<Utc>,
}

/// Fixed-capacity spread window with O(1) incremental statistics
#[derive(Debug, Clone)]
pub struct SpreadStatsTracker {
    window: VecDeque<SpreadSample>,
    capacity: usize,
    min_samples: usize,
    min_std_dev: f64,

    // Welford accumulators over the window
    mean: f64,
    m2: f64,
    updates_since_resync: usize,

    // z of the latest ready update and of the one before it; cleared
    // whenever an update is not ready
    last_z: Option<f64>,
    prev_z: Option<f64>,
}

impl SpreadStatsTracker {
    pub fn new(capacity: usize, min_samples: usize, min_std_dev: f64) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            min_samples,
            min_std_dev,
            mean: 0.0,
            m2: 0.0,
            updates_since_resync: 0,
            last_z: None,
            prev_z: None,
        }
    }

    /// Record a sample and return the refreshed statistics
    pub fn update(&mut self, value: f64, now: DateTime<Utc>) -> SpreadStatistics {
        if self.window.len() == self.capacity {
            if let Some(evicted) = self.window.pop_front() {
                self.remove_from_moments(evicted.value);
            }
        }
        self.window.push_back(SpreadSample { timestamp: now, value });
        self.add_to_moments(value);

        self.updates_since_resync += 1;
        if self.updates_since_resync >= self.capacity {
            self.resync();
        }

        let stats = self.snapshot(value, now, self.last_z);
        match stats.z_score {
            ZScore::Ready { value: z } => {
                self.prev_z = self.last_z;
                self.last_z = Some(z);
            }
            _ => self.clear_z_history(),
        }
        stats
    }

    /// Statistics for the newest sample without recording anything
    pub fn statistics(&self) -> Option<SpreadStatistics> {
        self.window
            .back()
            .map(|last| self.snapshot(last.value, last.timestamp, self.prev_z))
    }

    fn clear_z_history(&mut self) {
        self.last_z = None;
        self.prev_z = None;
    }

    fn snapshot(&self, current: f64, now: DateTime<Utc>, previous_z: Option<f64>) -> SpreadStatistics {
        let count = self.window.len();
        let std_dev = self.std_dev();

        let z_score = if count < self.min_samples {
            ZScore::InsufficientData {
                count,
                required: self.min_samples,
            }
        } else if !(std_dev > self.min_std_dev) {
            ZScore::Degenerate { std_dev }
        } else {
            ZScore::Ready {
                value: (self.mean - current) / std_dev,
            }
        };

        let momentum = match (z_score.value(), previous_z) {
            (Some(z), Some(prev)) => Some(z - prev),
            _ => None,
        };

        SpreadStatistics {
            count,
            capacity: self.capacity,
            mean: self.mean,
            std_dev,
            current_spread: current,
            z_score,
            momentum,
            last_updated: now,
        }
    }

    fn add_to_moments(&mut self, x: f64) {
        let n = self.window.len() as f64;
        let delta = x - self.mean;
        self.mean += delta / n;
        self.m2 += delta * (x - self.mean);
    }

    fn remove_from_moments(&mut self, x: f64) {
        // Called after the sample left the window
        let n_after = self.window.len();
        if n_after == 0 {
            self.mean = 0.0;
            self.m2 = 0.0;
            return;
        }
        let n_before = (n_after + 1) as f64;
        let mean_after = (n_before * self.mean - x) / n_after as f64;
        self.m2 -= (x - self.mean) * (x - mean_after);
        self.m2 = self.m2.max(0.0);
        self.mean = mean_after;
    }

    /// Recompute moments exactly from the window (two-pass)
    fn resync(&mut self) {
        self.updates_since_resync = 0;
        let n = self.window.len();
        if n == 0 {
            self.mean = 0.0;
            self.m2 = 0.0;
            return;
        }
        let mean = self.window.iter().map(|s| s.value).sum::<f64>() / n as f64;
        let m2 = self
            .window
            .iter()
            .map(|s| {
                let d = s.value - mean;
                d * d
            })
            .sum::<f64>();
        self.mean = mean;
        self.m2 = m2;
    }

    /// Population standard deviation of the window
    pub fn std_dev(&self) -> f64 {
        let n = self.window.len();
        if n < 2 {
            return 0.0;
        }
        (self.m2 / n as f64).max(0.0).sqrt()
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Change capacity; shrinking keeps the newest samples
    pub fn resize(&mut self, capacity: usize) {
        let capacity = capacity.max(1);
        while self.window.len() > capacity {
            self.window.pop_front();
        }
        self.capacity = capacity;
        if self.window.capacity() < capacity {
            self.window.reserve(capacity - self.window.len());
        }
        self.resync();
        self.clear_z_history();
    }

    pub fn set_min_samples(&mut self, min_samples: usize) {
        self.min_samples = min_samples;
    }

    pub fn set_min_std_dev(&mut self, min_std_dev: f64) {
        self.min_std_dev = min_std_dev;
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.mean = 0.0;
        self.m2 = 0.0;
        self.updates_since_resync = 0;
        self.clear_z_history();
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    pub fn is_ready(&self) -> bool {
        self.window.len() >= self.min_samples
    }

    /// Window contents, oldest first
    pub fn samples(&self) -> impl Iterator<Item = &SpreadSample> {
        self.window.iter()
    }

    /// Smallest and largest spread in the window
    pub fn min_max(&self) -> Option<(f64, f64)> {
        let mut values = self.window.iter().map(|s| s.value);
        let first = values.next()?;
        Some(values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn t(i: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap() + Duration::seconds(i)
    }

    fn naive_stats(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        (mean, var.sqrt())
    }

    #[test]
    fn test_window_never_exceeds_capacity() {
        let mut tracker = SpreadStatsTracker::new(10, 3, DEFAULT_MIN_STD_DEV);
        for i in 0..35 {
            let stats = tracker.update((i % 7) as f64, t(i));
            assert!(stats.count <= 10);
            assert!(tracker.len() <= tracker.capacity());
        }
        assert_eq!(tracker.len(), 10);
    }

    #[test]
    fn test_oldest_sample_evicted_after_capacity_plus_one() {
        let mut tracker = SpreadStatsTracker::new(5, 2, DEFAULT_MIN_STD_DEV);
        for i in 1..=6 {
            tracker.update(i as f64 * 10.0, t(i));
        }
        // Window holds 20..=60; 10 is gone
        let (mean, std) = naive_stats(&[20.0, 30.0, 40.0, 50.0, 60.0]);
        assert_relative_eq!(tracker.mean(), mean, epsilon = 1e-9);
        assert_relative_eq!(tracker.std_dev(), std, epsilon = 1e-9);
        assert_eq!(tracker.min_max(), Some((20.0, 60.0)));
        assert!(tracker.samples().all(|s| s.value != 10.0));
    }

    #[test]
    fn test_insufficient_data_until_min_samples() {
        let mut tracker = SpreadStatsTracker::new(50, 20, DEFAULT_MIN_STD_DEV);
        for i in 0..19 {
            let stats = tracker.update(if i % 2 == 0 { 1.0 } else { -1.0 }, t(i));
            assert_eq!(
                stats.z_score,
                ZScore::InsufficientData { count: i as usize + 1, required: 20 }
            );
            assert!(stats.z_score.value().is_none());
        }
        let stats = tracker.update(0.5, t(19));
        let z = stats.z_score.value().expect("ready after min samples");
        assert!(z.is_finite());
    }

    #[test]
    fn test_constant_feed_is_degenerate_not_zero() {
        let mut tracker = SpreadStatsTracker::new(30, 10, DEFAULT_MIN_STD_DEV);
        let mut last = None;
        for i in 0..15 {
            last = Some(tracker.update(0.5, t(i)));
        }
        let stats = last.unwrap();
        assert!(matches!(stats.z_score, ZScore::Degenerate { .. }));
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn test_z_score_sign_and_value() {
        let mut tracker = SpreadStatsTracker::new(10, 5, DEFAULT_MIN_STD_DEV);
        let values = [1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0];
        for (i, v) in values.iter().enumerate() {
            tracker.update(*v, t(i as i64));
        }
        let stats = tracker.update(-2.0, t(10));

        let mut window = values.to_vec();
        window.push(-2.0);
        let (mean, std) = naive_stats(&window);
        let z = stats.z_score.value().unwrap();
        assert_relative_eq!(z, (mean - (-2.0)) / std, epsilon = 1e-9);
        // Spread below mean gives positive z
        assert!(z > 0.0);
    }

    #[test]
    fn test_incremental_matches_two_pass_with_large_offset() {
        let mut tracker = SpreadStatsTracker::new(37, 5, DEFAULT_MIN_STD_DEV);
        let offset = 1.0e7;
        let mut all = Vec::new();
        for i in 0..500 {
            let v = offset + ((i * 7919) % 101) as f64 * 0.01;
            all.push(v);
            tracker.update(v, t(i));
        }
        let window = &all[all.len() - 37..];
        let (mean, std) = naive_stats(window);
        assert_relative_eq!(tracker.mean(), mean, epsilon = 1e-6);
        assert_relative_eq!(tracker.std_dev(), std, epsilon = 1e-6);
    }

    #[test]
    fn test_resize_keeps_newest() {
        let mut tracker = SpreadStatsTracker::new(10, 3, DEFAULT_MIN_STD_DEV);
        for i in 0..10 {
            tracker.update(i as f64, t(i));
        }
        tracker.resize(4);
        assert_eq!(tracker.capacity(), 4);
        let kept: Vec<f64> = tracker.samples().map(|s| s.value).collect();
        assert_eq!(kept, vec![6.0, 7.0, 8.0, 9.0]);
        assert_relative_eq!(tracker.mean(), 7.5, epsilon = 1e-12);

        tracker.resize(8);
        tracker.update(10.0, t(10));
        assert_eq!(tracker.len(), 5);
    }

    #[test]
    fn test_momentum_tracks_z_change() {
        let mut tracker = SpreadStatsTracker::new(20, 4, DEFAULT_MIN_STD_DEV);
        for (i, v) in [1.0, -1.0, 1.0, -1.0].iter().enumerate() {
            tracker.update(*v, t(i as i64));
        }
        // First ready update has no predecessor
        let warm = tracker.statistics().unwrap();
        assert!(warm.z_score.is_ready());
        let first = tracker.update(0.0, t(4));
        assert!(first.momentum.is_some());

        let a = tracker.update(-0.5, t(5));
        let b = tracker.update(-1.5, t(6));
        let expected = b.z_score.value().unwrap() - a.z_score.value().unwrap();
        assert_relative_eq!(b.momentum.unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_statistics_repeats_last_update() {
        let mut tracker = SpreadStatsTracker::new(20, 4, DEFAULT_MIN_STD_DEV);
        let mut last = None;
        for (i, v) in [1.0, -1.0, 1.0, -1.0, 0.5, -1.5].iter().enumerate() {
            last = Some(tracker.update(*v, t(i as i64)));
        }
        let last = last.unwrap();
        let again = tracker.statistics().unwrap();

        assert_eq!(again.z_score.value(), last.z_score.value());
        assert_relative_eq!(again.momentum.unwrap(), last.momentum.unwrap(), epsilon = 1e-12);
        assert!(again.momentum.unwrap().abs() > 0.1);
    }

    #[test]
    fn test_momentum_restarts_after_degenerate_gap() {
        let mut tracker = SpreadStatsTracker::new(3, 2, 0.05);
        tracker.update(1.0, t(0));
        assert!(tracker.update(-1.0, t(1)).z_score.is_ready());
        for i in 2..5 {
            tracker.update(0.0, t(i));
        }
        // Window [0, 0, 0]
        assert!(matches!(tracker.statistics().unwrap().z_score, ZScore::Degenerate { .. }));

        let resumed = tracker.update(1.0, t(5));
        assert!(resumed.z_score.is_ready());
        assert!(resumed.momentum.is_none());

        let next = tracker.update(-1.0, t(6));
        assert!(next.momentum.is_some());
    }

    #[test]
    fn test_reset_clears_state() {
        let mut tracker = SpreadStatsTracker::new(10, 3, DEFAULT_MIN_STD_DEV);
        for i in 0..5 {
            tracker.update(i as f64, t(i));
        }
        tracker.reset();
        assert!(tracker.is_empty());
        assert_eq!(tracker.std_dev(), 0.0);
        assert!(tracker.statistics().is_none());
    }
}
