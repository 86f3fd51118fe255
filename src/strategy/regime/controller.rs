//! Regime Controller
//!
//! Owns the rolling spread / volume / signal-outcome windows, decides the
//! current regime and session window, and moves the effective multipliers
//! gradually toward their target:
//!
//! `current = current * (1 - w) + target * w`
//!
//! The target is the combined regime x time-window multiplier, so a
//! stationary input converges on it without ever crossing it.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use super::{Classification, RegimeConfig, RegimeInputs, ThresholdPublisher};
use crate::domain::{Regime, TimeWindow};
use crate::strategy::params::{Profile, ThresholdMultipliers, ThresholdSet, ValidationConfig};

/// Snapshot of the controller's state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegimeStatus {
    pub enabled: bool,
    pub regime: Regime,
    pub time_window: TimeWindow,
    pub multipliers: ThresholdMultipliers,
    pub target: ThresholdMultipliers,
    pub thresholds_version: u64,
    pub profile: String,
    pub spread_samples: usize,
    pub volume_samples: usize,
    pub signal_results: usize,
    pub inputs: Option<RegimeInputs>,
    pub last_adjustment: Option<DateTime<Utc>>,
}

pub struct RegimeController {
    config: RegimeConfig,
    validation: ValidationConfig,
    profile: Profile,

    spreads: VecDeque<f64>,
    volumes: VecDeque<f64>,
    results: VecDeque<bool>,

    regime: Regime,
    time_window: TimeWindow,
    current: ThresholdMultipliers,
    target: ThresholdMultipliers,
    last_adjustment: Option<DateTime<Utc>>,

    publisher: ThresholdPublisher,
}

impl RegimeController {
    /// Starts from the profile's unscaled thresholds (version 0)
    pub fn new(config: RegimeConfig, validation: ValidationConfig, profile: Profile) -> Self {
        let publisher = ThresholdPublisher::new(ThresholdSet::base(&profile, &validation));
        Self {
            spreads: VecDeque::with_capacity(config.volatility_window),
            volumes: VecDeque::with_capacity(config.volume_window),
            results: VecDeque::with_capacity(config.success_window),
            config,
            validation,
            profile,
            regime: Regime::Normal,
            time_window: TimeWindow::Normal,
            current: ThresholdMultipliers::IDENTITY,
            target: ThresholdMultipliers::IDENTITY,
            last_adjustment: None,
            publisher,
        }
    }

    pub fn config(&self) -> &RegimeConfig {
        &self.config
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ThresholdSet>> {
        self.publisher.subscribe()
    }

    pub fn thresholds(&self) -> Arc<ThresholdSet> {
        self.publisher.current()
    }

    pub fn regime(&self) -> Regime {
        self.regime
    }

    pub fn time_window(&self) -> TimeWindow {
        self.time_window
    }

    pub fn multipliers(&self) -> ThresholdMultipliers {
        self.current
    }

    /// Pure classification using this controller's configuration
    pub fn classify(&self, inputs: &RegimeInputs, now: chrono::NaiveTime) -> Classification {
        self.config.classify(inputs, now)
    }

    pub fn record_market_data(&mut self, spread: f64, volume: f64) {
        if !spread.is_finite() {
            return;
        }
        push_bounded(&mut self.spreads, spread, self.config.volatility_window);
        if volume > 0.0 && volume.is_finite() {
            push_bounded(&mut self.volumes, volume, self.config.volume_window);
        }
    }

    pub fn register_signal_result(&mut self, success: bool) {
        push_bounded(&mut self.results, success, self.config.success_window);
    }

    /// Current classification inputs, `None` with fewer than two spreads
    pub fn inputs(&self) -> Option<RegimeInputs> {
        if self.spreads.len() < 2 {
            return None;
        }

        let long_std = self.spreads.iter().std_dev();
        let recent_len = self.config.recent_window.min(self.spreads.len());
        let recent_std = self
            .spreads
            .iter()
            .skip(self.spreads.len() - recent_len)
            .std_dev();
        let volatility_ratio = if long_std.is_finite() && long_std > 0.0 && recent_std.is_finite() {
            recent_std / long_std
        } else {
            1.0
        };

        let avg_volume = if self.volumes.is_empty() {
            0.0
        } else {
            self.volumes.iter().mean()
        };

        let success_rate = if self.results.is_empty() {
            0.0
        } else {
            self.results.iter().filter(|s| **s).count() as f64 / self.results.len() as f64
        };

        Some(RegimeInputs {
            volatility_ratio,
            avg_volume,
            success_rate,
        })
    }

    fn due(&self, now: DateTime<Utc>) -> bool {
        if !self.config.enabled || self.spreads.len() < self.config.min_samples_for_adjustment {
            return false;
        }
        let interval = Duration::seconds(self.config.adjustment_interval_sec as i64);
        match self.last_adjustment {
            Some(last) => now - last >= interval,
            None => true,
        }
    }

    /// Run one adjustment step if enabled, warmed up and the interval has
    /// elapsed. Returns the newly published set.
    pub fn maybe_adjust(&mut self, now: DateTime<Utc>) -> Option<Arc<ThresholdSet>> {
        if !self.due(now) {
            return None;
        }

        let regime = match self.inputs() {
            Some(inputs) if self.spreads.len() >= self.config.min_samples_for_regime => {
                let regime = self.config.regime_for(&inputs);
                debug!(
                    "Regime inputs: vol_ratio={:.3} avg_volume={:.1} success={:.2} -> {}",
                    inputs.volatility_ratio, inputs.avg_volume, inputs.success_rate, regime
                );
                regime
            }
            _ => self.regime,
        };

        let classification = self.config.classify_with(regime, self.config.local_time(now));
        if classification.regime != self.regime {
            info!("Regime change: {} -> {}", self.regime, classification.regime);
        }
        if classification.time_window != self.time_window {
            info!("Session window: {} -> {}", self.time_window, classification.time_window);
        }

        self.regime = classification.regime;
        self.time_window = classification.time_window;
        self.target = classification.multipliers;
        self.current = self
            .current
            .blend_toward(&self.target, self.config.gradual_adjustment_weight);
        self.last_adjustment = Some(now);

        let published = self.republish();
        info!(
            "Thresholds v{} adjusted: regime={} window={} std_threshold={:.3} min_profit={}",
            published.version,
            published.regime,
            published.time_window,
            published.std_threshold,
            published.min_profit
        );
        Some(published)
    }

    /// Swap base values to a new profile and republish with the current multipliers
    pub fn rebase(&mut self, profile: Profile) -> Arc<ThresholdSet> {
        info!("Thresholds rebased on profile '{}'", profile.name);
        self.profile = profile;
        self.republish()
    }

    fn republish(&mut self) -> Arc<ThresholdSet> {
        let version = self.publisher.version() + 1;
        let set = ThresholdSet::build(
            &self.profile,
            &self.validation,
            self.current,
            self.regime,
            self.time_window,
            version,
        );
        self.publisher.publish(set)
    }

    pub fn status(&self) -> RegimeStatus {
        RegimeStatus {
            enabled: self.config.enabled,
            regime: self.regime,
            time_window: self.time_window,
            multipliers: self.current,
            target: self.target,
            thresholds_version: self.publisher.version(),
            profile: self.profile.name.clone(),
            spread_samples: self.spreads.len(),
            volume_samples: self.volumes.len(),
            signal_results: self.results.len(),
            inputs: self.inputs(),
            last_adjustment: self.last_adjustment,
        }
    }
}

fn push_bounded<T>(window: &mut VecDeque<T>, value: T, capacity: usize) {
    if window.len() >= capacity {
        window.pop_front();
    }
    window.push_back(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    /// 13:00 UTC is 10:00 session time, between Opening and Lunch
    fn outside_windows(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 13, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn controller(config: RegimeConfig) -> RegimeController {
        RegimeController::new(config, ValidationConfig::default(), Profile::default())
    }

    /// Alternating spread with a calm history and a wild tail
    fn feed_high_volatility(ctl: &mut RegimeController) {
        for i in 0..170 {
            let s = if i % 2 == 0 { 0.1 } else { -0.1 };
            ctl.record_market_data(s, 10.0);
        }
        for i in 0..30 {
            let s = if i % 2 == 0 { 1.0 } else { -1.0 };
            ctl.record_market_data(s, 10.0);
        }
    }

    #[test]
    fn test_no_adjust_before_warmup() {
        let mut ctl = controller(RegimeConfig::default());
        for i in 0..49 {
            ctl.record_market_data(i as f64 * 0.01, 10.0);
        }
        assert!(ctl.maybe_adjust(outside_windows(0)).is_none());
        ctl.record_market_data(0.5, 10.0);
        assert!(ctl.maybe_adjust(outside_windows(0)).is_some());
    }

    #[test]
    fn test_disabled_never_adjusts() {
        let mut ctl = controller(RegimeConfig::disabled());
        feed_high_volatility(&mut ctl);
        assert!(ctl.maybe_adjust(outside_windows(0)).is_none());
        assert_eq!(ctl.thresholds().version, 0);
    }

    #[test]
    fn test_adjustment_interval_respected() {
        let mut ctl = controller(RegimeConfig::default());
        feed_high_volatility(&mut ctl);
        assert!(ctl.maybe_adjust(outside_windows(0)).is_some());
        assert!(ctl.maybe_adjust(outside_windows(4)).is_none());
        assert!(ctl.maybe_adjust(outside_windows(5)).is_some());
        assert_eq!(ctl.thresholds().version, 2);
    }

    #[test]
    fn test_regime_kept_below_regime_minimum() {
        let mut ctl = controller(RegimeConfig::default());
        // 60 samples: enough to adjust, not enough to classify
        for i in 0..30 {
            ctl.record_market_data(if i % 2 == 0 { 0.1 } else { -0.1 }, 10.0);
        }
        for i in 0..30 {
            ctl.record_market_data(if i % 2 == 0 { 2.0 } else { -2.0 }, 10.0);
        }
        let set = ctl.maybe_adjust(outside_windows(0)).unwrap();
        assert_eq!(set.regime, Regime::Normal);
    }

    #[test]
    fn test_high_volatility_detected() {
        let mut ctl = controller(RegimeConfig::default());
        feed_high_volatility(&mut ctl);
        let inputs = ctl.inputs().unwrap();
        assert!(inputs.volatility_ratio > 1.5);

        let set = ctl.maybe_adjust(outside_windows(0)).unwrap();
        assert_eq!(set.regime, Regime::HighVolatility);
        assert_eq!(set.time_window, TimeWindow::Normal);
        // One step of w = 0.3 toward 1.3
        assert_relative_eq!(set.multipliers.std_threshold, 1.09, epsilon = 1e-12);
        assert_relative_eq!(set.std_threshold, 1.5 * 1.09, epsilon = 1e-12);
    }

    #[test]
    fn test_gradual_adjustment_converges_without_crossing() {
        let mut ctl = controller(RegimeConfig {
            time_windows: Vec::new(),
            ..RegimeConfig::default()
        });
        feed_high_volatility(&mut ctl);

        let target = 1.3;
        let mut previous = 1.0;
        for step in 0..40 {
            let set = ctl.maybe_adjust(outside_windows(step * 5)).unwrap();
            let current = set.multipliers.std_threshold;
            assert!(current > previous, "not increasing at step {}", step);
            assert!(current <= target + 1e-12, "crossed target at step {}", step);
            previous = current;
        }
        assert_relative_eq!(previous, target, epsilon = 1e-5);
        // Contracts move down toward 0.5 and stay above it
        assert!(ctl.multipliers().contracts >= 0.5);
        assert_relative_eq!(ctl.multipliers().contracts, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_time_window_not_compounded() {
        let mut ctl = controller(RegimeConfig {
            adjustment_interval_sec: 10,
            ..RegimeConfig::default()
        });
        // Calm, constant-variance spread: Normal regime
        for i in 0..200 {
            ctl.record_market_data(if i % 2 == 0 { 0.5 } else { -0.5 }, 10.0);
        }
        // 20:45 UTC = 17:45 local, inside Closing (std x1.3)
        let closing = Utc.with_ymd_and_hms(2024, 3, 4, 20, 45, 0).unwrap();
        for step in 0..60 {
            ctl.maybe_adjust(closing + Duration::seconds(step * 10));
        }
        let status = ctl.status();
        assert_eq!(status.regime, Regime::Normal);
        assert_eq!(status.time_window, TimeWindow::Closing);
        assert_relative_eq!(status.multipliers.std_threshold, 1.3, epsilon = 1e-6);
    }

    #[test]
    fn test_rebase_republishes_with_new_profile() {
        let mut ctl = controller(RegimeConfig::default());
        let rx = ctl.subscribe();
        let set = ctl.rebase(Profile::aggressive());
        assert_eq!(set.version, 1);
        assert_eq!(set.profile, "aggressive");
        assert_eq!(set.std_threshold, 1.0);
        assert_eq!(rx.borrow().version, 1);
    }

    #[test]
    fn test_success_window_bounded() {
        let mut ctl = controller(RegimeConfig::default());
        for _ in 0..60 {
            ctl.register_signal_result(true);
        }
        for _ in 0..10 {
            ctl.register_signal_result(false);
        }
        ctl.record_market_data(0.1, 10.0);
        ctl.record_market_data(0.2, 10.0);
        let status = ctl.status();
        assert_eq!(status.signal_results, 50);
        assert_relative_eq!(status.inputs.unwrap().success_rate, 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_volume_ignored() {
        let mut ctl = controller(RegimeConfig::default());
        ctl.record_market_data(0.1, 0.0);
        ctl.record_market_data(0.2, 20.0);
        ctl.record_market_data(0.3, 40.0);
        let inputs = ctl.inputs().unwrap();
        assert_relative_eq!(inputs.avg_volume, 30.0, epsilon = 1e-12);
    }
}
