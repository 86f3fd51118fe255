//! Arbitrage Engine
//!
//! Single owner of every mutable piece of the pipeline:
//!
//! quote -> pair assembly -> data-quality gate -> spread -> tracker
//!       -> validator (against the published thresholds) -> report
//!
//! The regime controller lives here too; the runner only decides when
//! `maybe_adjust` is called.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, EngineSettings, ProfileStore};
use crate::domain::{
    BehaviorConfirmation, ConfidenceTier, CostModel, DataQualityError, DataQualityGate, EvaluationReport,
    InstrumentPair, OpportunityLog, OpportunityRecord, Outcome, PairAssembler, PairSnapshot, QuoteEvent,
};
use crate::ports::FeedError;
use crate::strategy::{
    LeadershipTracker, Profile, RegimeController, RegimeStatus, SignalValidator, SpreadStatistics,
    SpreadStatsTracker, ThresholdSet,
};

/// Consecutive rejections that trigger a warning
const REJECTION_BURST: u64 = 10;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
}

/// Counters for the current session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    pub quotes_received: u64,
    pub unknown_symbols: u64,
    pub snapshots: u64,
    pub rejected_samples: u64,
    pub evaluations: u64,
    /// Ascending tier order: low, medium, high, extreme
    pub signals_by_tier: [u64; 4],
    pub no_signal_reasons: BTreeMap<String, u64>,
    pub profile_switches: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub last_update: Option<DateTime<Utc>>,
}

impl SessionStats {
    pub fn total_signals(&self) -> u64 {
        self.signals_by_tier.iter().sum()
    }

    pub fn signals_for(&self, tier: ConfidenceTier) -> u64 {
        self.signals_by_tier[tier.index()]
    }
}

pub struct ArbitrageEngine {
    pair: InstrumentPair,
    costs: CostModel,
    gate: DataQualityGate,
    assembler: PairAssembler,
    tracker: SpreadStatsTracker,
    validator: SignalValidator,
    controller: RegimeController,
    thresholds: watch::Receiver<Arc<ThresholdSet>>,
    opportunities: OpportunityLog,
    leadership: LeadershipTracker,
    profiles: ProfileStore,
    alert_only: bool,
    stats: SessionStats,
    consecutive_rejections: u64,
}

impl ArbitrageEngine {
    pub fn new(settings: EngineSettings) -> Self {
        let profile = settings.active_profile().clone();
        let tracker = SpreadStatsTracker::new(
            profile.history_size,
            profile.min_samples_for_signal,
            settings.validation.min_std_dev,
        );
        let controller = RegimeController::new(settings.regime, settings.validation.clone(), profile.clone());
        let thresholds = controller.subscribe();

        info!(
            "Engine ready: {} / {} | profile '{}' (z >= {}, {} samples, history {}) | alert_only={}",
            settings.pair.leg_a.symbol,
            settings.pair.leg_b.symbol,
            profile.name,
            profile.spread_std_devs,
            profile.min_samples_for_signal,
            profile.history_size,
            settings.alert_only
        );

        Self {
            validator: SignalValidator::new(settings.validation, settings.behavior, settings.pair.clone()),
            pair: settings.pair,
            costs: settings.costs,
            gate: DataQualityGate::new(settings.data_quality),
            assembler: PairAssembler::new(),
            tracker,
            controller,
            thresholds,
            opportunities: OpportunityLog::new(settings.opportunity_history_size),
            leadership: LeadershipTracker::new(settings.leadership),
            profiles: settings.profiles,
            alert_only: settings.alert_only,
            stats: SessionStats::default(),
            consecutive_rejections: 0,
        }
    }

    pub fn pair(&self) -> &InstrumentPair {
        &self.pair
    }

    /// Feed one quote. Returns a report when a snapshot was evaluated;
    /// unknown symbols and rejected samples are logged and skipped.
    pub fn on_quote(&mut self, quote: QuoteEvent, confirmations: &[BehaviorConfirmation]) -> Option<EvaluationReport> {
        self.stats.quotes_received += 1;
        let Some(leg) = self.pair.leg_of(&quote.symbol) else {
            self.stats.unknown_symbols += 1;
            debug!("{}", DataQualityError::UnknownSymbol(quote.symbol));
            return None;
        };

        let snapshot = self.assembler.apply(leg, quote)?;
        match self.process_snapshot(&snapshot, confirmations) {
            Ok(report) => Some(report),
            Err(e) => {
                debug!("Sample rejected: {}", e);
                None
            }
        }
    }

    /// Evaluate the instant still held by the pair assembler, if any.
    /// Called once the feed has closed.
    pub fn flush_pending(&mut self) -> Option<EvaluationReport> {
        let snapshot = self.assembler.flush()?;
        match self.process_snapshot(&snapshot, &[]) {
            Ok(report) => Some(report),
            Err(e) => {
                debug!("Sample rejected: {}", e);
                None
            }
        }
    }

    /// Gate, record and evaluate one pair snapshot
    pub fn process_snapshot(
        &mut self,
        snapshot: &PairSnapshot,
        confirmations: &[BehaviorConfirmation],
    ) -> Result<EvaluationReport, DataQualityError> {
        self.stats.snapshots += 1;
        let timestamp = snapshot.timestamp();
        self.stats.started_at.get_or_insert(timestamp);
        self.stats.last_update = Some(timestamp);

        if let Err(e) = self.gate.check(snapshot) {
            self.stats.rejected_samples += 1;
            self.consecutive_rejections += 1;
            if self.consecutive_rejections == REJECTION_BURST {
                warn!("{} consecutive samples rejected, latest: {}", self.consecutive_rejections, e);
            }
            return Err(e);
        }
        self.consecutive_rejections = 0;

        let spread = snapshot.spread(&self.pair);
        let stats = self.tracker.update(spread, timestamp);
        self.controller.record_market_data(spread, snapshot.volume() as f64);
        self.leadership.record(snapshot.leg_a.mid(), snapshot.leg_b.mid());

        let thresholds = Arc::clone(&self.thresholds.borrow());
        let outcome = self.validator.evaluate(&stats, &thresholds, &self.costs, confirmations);
        self.stats.evaluations += 1;
        self.record_outcome(&outcome, &stats, &thresholds, timestamp);

        Ok(EvaluationReport {
            timestamp,
            spread,
            outcome,
            regime: thresholds.regime,
            time_window: thresholds.time_window,
            thresholds_version: thresholds.version,
            leader: self.leadership.leader(),
            alert_only: self.alert_only,
        })
    }

    fn record_outcome(
        &mut self,
        outcome: &Outcome,
        stats: &SpreadStatistics,
        thresholds: &ThresholdSet,
        timestamp: DateTime<Utc>,
    ) {
        match outcome {
            Outcome::Signal(signal) => {
                self.stats.signals_by_tier[signal.tier.index()] += 1;
                self.opportunities.push(OpportunityRecord::from_signal(
                    signal,
                    timestamp,
                    thresholds.regime,
                    thresholds.time_window,
                ));
                if signal.premium {
                    warn!(
                        "PREMIUM {:?} | z={:.2} | {} contracts | net R$ {} | spread {:.2} -> {:.2}",
                        signal.direction,
                        signal.z_score,
                        signal.recommended_contracts,
                        signal.net_profit_estimate,
                        signal.entry_spread,
                        signal.target_spread
                    );
                } else {
                    info!(
                        "Signal {} {:?} | z={:.2} | {} contracts | net R$ {} | confidence {:.0}%",
                        signal.label(),
                        signal.direction,
                        signal.z_score,
                        signal.recommended_contracts,
                        signal.net_profit_estimate,
                        signal.confidence_pct
                    );
                }
            }
            Outcome::NoSignal(reason) => {
                *self.stats.no_signal_reasons.entry(reason.key().to_string()).or_insert(0) += 1;
                debug!("No signal ({}/{}): {}", stats.count, stats.capacity, reason);
            }
        }
    }

    /// Run a regime adjustment step if one is due
    pub fn maybe_adjust(&mut self, now: DateTime<Utc>) -> Option<Arc<ThresholdSet>> {
        self.controller.maybe_adjust(now)
    }

    /// Switch the active profile: re-seeds tracker capacity (keeping the
    /// newest samples), the sample minimum and the thresholds.
    pub fn apply_profile(&mut self, name: &str) -> Result<Arc<ThresholdSet>, EngineError> {
        let profile = self.profiles.activate(name)?.clone();
        self.tracker.resize(profile.history_size);
        self.tracker.set_min_samples(profile.min_samples_for_signal);
        self.stats.profile_switches += 1;
        info!(
            "Profile '{}' active: z >= {}, {} samples, history {} ({} kept)",
            profile.name,
            profile.spread_std_devs,
            profile.min_samples_for_signal,
            profile.history_size,
            self.tracker.len()
        );
        Ok(self.controller.rebase(profile))
    }

    /// Feed back whether a previously emitted signal worked out
    pub fn register_signal_result(&mut self, success: bool) {
        self.controller.register_signal_result(success);
    }

    pub fn subscribe_thresholds(&self) -> watch::Receiver<Arc<ThresholdSet>> {
        self.controller.subscribe()
    }

    pub fn thresholds(&self) -> Arc<ThresholdSet> {
        Arc::clone(&self.thresholds.borrow())
    }

    pub fn statistics(&self) -> Option<SpreadStatistics> {
        self.tracker.statistics()
    }

    pub fn tracker(&self) -> &SpreadStatsTracker {
        &self.tracker
    }

    pub fn opportunities(&self) -> &OpportunityLog {
        &self.opportunities
    }

    pub fn session_stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn regime_status(&self) -> RegimeStatus {
        self.controller.status()
    }

    pub fn active_profile(&self) -> &Profile {
        self.profiles.active()
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn is_alert_only(&self) -> bool {
        self.alert_only
    }
}
