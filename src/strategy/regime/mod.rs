//! Market Regime & Session Window Classification
//!
//! Classifies the spread's behaviour into a [`Regime`] and the wall-clock
//! time into a session [`TimeWindow`], each carrying its own
//! [`ThresholdMultipliers`]. The two are combined field by field.
//!
//! - **Classification**: pure, from [`RegimeInputs`] and a local time
//! - **Controller**: owns the rolling input windows and blends multipliers
//! - **Publisher**: hands out immutable `Arc<ThresholdSet>` snapshots
//!
//! Regime precedence (first match wins):
//! - volatility ratio > `high_vol_ratio` -> HighVolatility
//! - volatility ratio < `low_vol_ratio` -> LowVolatility
//! - avg volume and success rate above their floors -> Trending
//! - otherwise Normal

mod controller;
mod publisher;

pub use controller::{RegimeController, RegimeStatus};
pub use publisher::ThresholdPublisher;

use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::params::{ParamError, ThresholdMultipliers};
use crate::domain::{Regime, TimeWindow};

/// Brasília session offset (UTC-3)
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = -3;

/// Inputs to a regime decision
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegimeInputs {
    /// Recent spread std / long-window spread std
    pub volatility_ratio: f64,
    pub avg_volume: f64,
    /// Fraction of registered signals that succeeded, 0.0 when none
    pub success_rate: f64,
}

/// Result of [`RegimeConfig::classify`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub regime: Regime,
    pub time_window: TimeWindow,
    /// Regime multipliers combined with the time-window multipliers
    pub multipliers: ThresholdMultipliers,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeThresholds {
    pub high_vol_ratio: f64,
    pub low_vol_ratio: f64,
    pub trending_min_avg_volume: f64,
    pub trending_min_success_rate: f64,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            high_vol_ratio: 1.5,
            low_vol_ratio: 0.7,
            trending_min_avg_volume: 100.0,
            trending_min_success_rate: 0.6,
        }
    }
}

/// Multipliers per regime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeAdjustments {
    pub normal: ThresholdMultipliers,
    pub high_volatility: ThresholdMultipliers,
    pub low_volatility: ThresholdMultipliers,
    pub trending: ThresholdMultipliers,
}

impl Default for RegimeAdjustments {
    fn default() -> Self {
        Self {
            normal: ThresholdMultipliers::IDENTITY,
            high_volatility: ThresholdMultipliers::new(1.3, 1.5, 1.5, 0.5),
            low_volatility: ThresholdMultipliers::new(0.8, 0.8, 1.0, 1.0),
            trending: ThresholdMultipliers::new(1.2, 1.2, 1.0, 1.0),
        }
    }
}

impl RegimeAdjustments {
    pub fn get(&self, regime: Regime) -> ThresholdMultipliers {
        match regime {
            Regime::Normal => self.normal,
            Regime::HighVolatility => self.high_volatility,
            Regime::LowVolatility => self.low_volatility,
            Regime::Trending => self.trending,
        }
    }
}

/// One session window, matched inclusively on both ends
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindowRule {
    pub window: TimeWindow,
    #[serde(with = "clock_time")]
    pub start: NaiveTime,
    #[serde(with = "clock_time")]
    pub end: NaiveTime,
    #[serde(default)]
    pub multipliers: ThresholdMultipliers,
}

impl TimeWindowRule {
    pub fn new(window: TimeWindow, start: NaiveTime, end: NaiveTime, multipliers: ThresholdMultipliers) -> Self {
        Self { window, start, end, multipliers }
    }

    pub fn contains(&self, t: NaiveTime) -> bool {
        self.start <= t && t <= self.end
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

fn default_time_windows() -> Vec<TimeWindowRule> {
    vec![
        TimeWindowRule::new(
            TimeWindow::Opening,
            hm(9, 0),
            hm(9, 30),
            ThresholdMultipliers::new(1.2, 1.2, 1.5, 1.0),
        ),
        TimeWindowRule::new(
            TimeWindow::Lunch,
            hm(12, 0),
            hm(13, 30),
            ThresholdMultipliers::new(1.1, 1.0, 1.0, 1.0),
        ),
        TimeWindowRule::new(
            TimeWindow::Closing,
            hm(17, 30),
            hm(18, 0),
            ThresholdMultipliers::new(1.3, 1.2, 1.5, 0.5),
        ),
    ]
}

/// Dynamic adjustment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    pub enabled: bool,
    pub adjustment_interval_sec: u64,
    /// Blend weight toward the target multipliers, in (0, 1]
    pub gradual_adjustment_weight: f64,
    pub min_samples_for_adjustment: usize,
    pub min_samples_for_regime: usize,
    /// Samples used for the "recent" side of the volatility ratio
    pub recent_window: usize,
    pub volatility_window: usize,
    pub volume_window: usize,
    pub success_window: usize,
    pub utc_offset_hours: i32,
    pub thresholds: RegimeThresholds,
    pub adjustments: RegimeAdjustments,
    /// Multipliers outside every configured window
    pub normal_window: ThresholdMultipliers,
    /// Ordered, first match wins
    pub time_windows: Vec<TimeWindowRule>,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            adjustment_interval_sec: 300,
            gradual_adjustment_weight: 0.3,
            min_samples_for_adjustment: 50,
            min_samples_for_regime: 100,
            recent_window: 30,
            volatility_window: 200,
            volume_window: 100,
            success_window: 50,
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            thresholds: RegimeThresholds::default(),
            adjustments: RegimeAdjustments::default(),
            normal_window: ThresholdMultipliers::IDENTITY,
            time_windows: default_time_windows(),
        }
    }
}

impl RegimeConfig {
    /// Static thresholds: never adjusts
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), RegimeConfigError> {
        let w = self.gradual_adjustment_weight;
        if !(w > 0.0 && w <= 1.0) {
            return Err(RegimeConfigError::WeightOutOfRange(w));
        }
        let t = &self.thresholds;
        if !(t.low_vol_ratio > 0.0 && t.low_vol_ratio < t.high_vol_ratio) {
            return Err(RegimeConfigError::VolatilityBands {
                low: t.low_vol_ratio,
                high: t.high_vol_ratio,
            });
        }
        for (name, value) in [
            ("recent_window", self.recent_window),
            ("volatility_window", self.volatility_window),
            ("volume_window", self.volume_window),
            ("success_window", self.success_window),
        ] {
            if value < 2 {
                return Err(RegimeConfigError::WindowTooSmall { name, value });
            }
        }
        if self.recent_window > self.volatility_window {
            return Err(RegimeConfigError::WindowTooSmall {
                name: "volatility_window",
                value: self.volatility_window,
            });
        }
        if self.min_samples_for_regime > self.volatility_window {
            return Err(RegimeConfigError::WindowTooSmall {
                name: "volatility_window",
                value: self.volatility_window,
            });
        }
        if self.session_offset().is_none() {
            return Err(RegimeConfigError::InvalidOffset(self.utc_offset_hours));
        }

        for regime in Regime::ALL {
            self.adjustments.get(regime).validate()?;
        }
        self.normal_window.validate()?;
        for rule in &self.time_windows {
            if rule.start > rule.end {
                return Err(RegimeConfigError::TimeWindowInverted {
                    window: rule.window,
                    start: rule.start,
                    end: rule.end,
                });
            }
            rule.multipliers.validate()?;
        }
        Ok(())
    }

    pub fn session_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours.checked_mul(3600)?)
    }

    /// Session-local wall-clock time for a UTC instant
    pub fn local_time(&self, now: DateTime<Utc>) -> NaiveTime {
        match self.session_offset() {
            Some(offset) => now.with_timezone(&offset).time(),
            None => now.time(),
        }
    }

    /// Regime implied by the inputs (volatility bands win over trending)
    pub fn regime_for(&self, inputs: &RegimeInputs) -> Regime {
        let t = &self.thresholds;
        if inputs.volatility_ratio > t.high_vol_ratio {
            Regime::HighVolatility
        } else if inputs.volatility_ratio < t.low_vol_ratio {
            Regime::LowVolatility
        } else if inputs.avg_volume > t.trending_min_avg_volume
            && inputs.success_rate > t.trending_min_success_rate
        {
            Regime::Trending
        } else {
            Regime::Normal
        }
    }

    /// First window containing `t`, or Normal with the default multipliers
    pub fn time_window_at(&self, t: NaiveTime) -> (TimeWindow, ThresholdMultipliers) {
        self.time_windows
            .iter()
            .find(|rule| rule.contains(t))
            .map(|rule| (rule.window, rule.multipliers))
            .unwrap_or((TimeWindow::Normal, self.normal_window))
    }

    pub fn classify(&self, inputs: &RegimeInputs, now: NaiveTime) -> Classification {
        let regime = self.regime_for(inputs);
        self.classify_with(regime, now)
    }

    /// Combine an already-decided regime with the window at `now`
    pub fn classify_with(&self, regime: Regime, now: NaiveTime) -> Classification {
        let (time_window, window_multipliers) = self.time_window_at(now);
        Classification {
            regime,
            time_window,
            multipliers: self.adjustments.get(regime).combine(&window_multipliers),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegimeConfigError {
    #[error("gradual_adjustment_weight must be in (0, 1], got {0}")]
    WeightOutOfRange(f64),
    #[error("low_vol_ratio ({low}) must be positive and below high_vol_ratio ({high})")]
    VolatilityBands { low: f64, high: f64 },
    #[error("{name} too small: {value}")]
    WindowTooSmall { name: &'static str, value: usize },
    #[error("Time window {window} starts after it ends ({start} > {end})")]
    TimeWindowInverted { window: TimeWindow, start: NaiveTime, end: NaiveTime },
    #[error("Invalid UTC offset: {0}h")]
    InvalidOffset(i32),
    #[error(transparent)]
    Multiplier(#[from] ParamError),
}

/// `HH:MM` (or `HH:MM:SS`) serde for session boundaries
mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format("%H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M"))
            .map_err(|e| serde::de::Error::custom(format!("invalid time '{}': {}", raw, e)))
    }
}
