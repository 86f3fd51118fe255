//! Behavior Confirmations
//!
//! Order-flow detectors run outside this crate. They hand the validator a
//! list of [`BehaviorConfirmation`]s; each one strong enough adds a weighted
//! confidence bonus to an already admitted signal.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Detector families that can confirm a spread signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    Iceberg,
    StopHunting,
    Absorption,
    MomentumIgnition,
    Sweep,
    PriceDefense,
    Exhaustion,
    Institutional,
}

/// A single detector report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorConfirmation {
    pub kind: BehaviorKind,
    /// Detector strength on a 0-100 scale
    pub strength: f64,
    /// Free-form description shown alongside the signal
    #[serde(default)]
    pub description: String,
}

impl BehaviorConfirmation {
    pub fn new(kind: BehaviorKind, strength: f64) -> Self {
        Self {
            kind,
            strength,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Confirmation scoring parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Strength a confirmation must exceed to count
    pub min_strength_for_confirmation: f64,
    /// Confidence points added per counted confirmation (before weighting)
    pub confidence_bonus_per_confirmation: f64,
    /// Confidence ceiling after bonuses
    pub max_confidence: f64,
    /// Per-detector weight; missing kinds weigh 1.0
    #[serde(default)]
    pub weights: BTreeMap<BehaviorKind, f64>,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            min_strength_for_confirmation: 50.0,
            confidence_bonus_per_confirmation: 5.0,
            max_confidence: 95.0,
            weights: BTreeMap::new(),
        }
    }
}

impl BehaviorConfig {
    pub fn weight(&self, kind: BehaviorKind) -> f64 {
        self.weights.get(&kind).copied().unwrap_or(1.0)
    }

    /// Confirmations that pass the strength filter
    pub fn counted<'a>(
        &'a self,
        confirmations: &'a [BehaviorConfirmation],
    ) -> impl Iterator<Item = &'a BehaviorConfirmation> + 'a {
        confirmations
            .iter()
            .filter(move |c| c.strength.is_finite() && c.strength > self.min_strength_for_confirmation)
    }

    /// Total weighted bonus contributed by `confirmations`
    pub fn bonus(&self, confirmations: &[BehaviorConfirmation]) -> f64 {
        self.counted(confirmations)
            .map(|c| self.confidence_bonus_per_confirmation * self.weight(c.kind))
            .sum()
    }
}
