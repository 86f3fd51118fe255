//! Engine Runner
//!
//! Drives an [`ArbitrageEngine`] from a [`QuoteFeed`] with a single
//! `tokio::select!` loop: quotes are processed in arrival order and the
//! regime controller is asked after every quote whether an adjustment is
//! due. An interval timer repeats that check while a live feed is idle.
//!
//! The adjustment clock is event time (the newest quote timestamp), so a
//! replay adapts exactly as the live session did, however fast it runs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::engine::{ArbitrageEngine, EngineError, SessionStats};
use crate::domain::EvaluationReport;
use crate::ports::QuoteFeed;

/// What a finished run looked like
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub feed: &'static str,
    pub reports: u64,
    pub adjustments: u64,
    pub final_thresholds_version: u64,
    pub session: SessionStats,
}

pub struct EngineRunner {
    engine: ArbitrageEngine,
    adjustment_tick: Duration,
}

impl EngineRunner {
    pub fn new(engine: ArbitrageEngine, adjustment_tick: Duration) -> Self {
        Self {
            engine,
            adjustment_tick: adjustment_tick.max(Duration::from_millis(1)),
        }
    }

    pub fn engine(&self) -> &ArbitrageEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ArbitrageEngine {
        &mut self.engine
    }

    pub fn into_engine(self) -> ArbitrageEngine {
        self.engine
    }

    /// Consume `feed` until it closes, handing every report to `on_report`
    pub async fn run<F>(&mut self, feed: &dyn QuoteFeed, mut on_report: F) -> Result<RunSummary, EngineError>
    where
        F: FnMut(&EvaluationReport),
    {
        let mut quotes = feed.subscribe(self.engine.pair()).await?;
        let mut ticker = tokio::time::interval(self.adjustment_tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut event_time: Option<DateTime<Utc>> = None;
        let mut reports = 0u64;
        let mut adjustments = 0u64;
        info!("Runner started on {} feed (adjustment tick {:?})", feed.name(), self.adjustment_tick);

        loop {
            tokio::select! {
                maybe_quote = quotes.recv() => {
                    let Some(quote) = maybe_quote else {
                        debug!("Feed closed");
                        if let Some(report) = self.engine.flush_pending() {
                            reports += 1;
                            on_report(&report);
                        }
                        break;
                    };
                    let now = event_time.map_or(quote.timestamp, |t| t.max(quote.timestamp));
                    event_time = Some(now);
                    if let Some(report) = self.engine.on_quote(quote, &[]) {
                        reports += 1;
                        on_report(&report);
                    }
                    if self.engine.maybe_adjust(now).is_some() {
                        adjustments += 1;
                    }
                }
                _ = ticker.tick() => {
                    if let Some(now) = event_time {
                        if self.engine.maybe_adjust(now).is_some() {
                            adjustments += 1;
                        }
                    }
                }
            }
        }

        let summary = RunSummary {
            feed: feed.name(),
            reports,
            adjustments,
            final_thresholds_version: self.engine.thresholds().version,
            session: self.engine.session_stats().clone(),
        };
        info!(
            "Runner finished: {} reports, {} signals, {} rejected, {} adjustments",
            summary.reports,
            summary.session.total_signals(),
            summary.session.rejected_samples,
            summary.adjustments
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::replay::ReplayFeed;
    use crate::adapters::synthetic::{SyntheticConfig, SyntheticFeed};
    use crate::config::EngineSettings;
    use crate::domain::QuoteEvent;
    use crate::strategy::RegimeConfig;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_runner_consumes_synthetic_feed() {
        let settings = EngineSettings {
            regime: RegimeConfig::disabled(),
            ..EngineSettings::default()
        };
        let mut runner = EngineRunner::new(ArbitrageEngine::new(settings), Duration::from_millis(5));
        let feed = SyntheticFeed::new(SyntheticConfig {
            steps: 100,
            ..SyntheticConfig::default()
        });

        let mut seen = Vec::new();
        let summary = runner.run(&feed, |report| seen.push(report.thresholds_version)).await.unwrap();

        assert_eq!(summary.feed, "synthetic");
        assert_eq!(summary.session.quotes_received, 200);
        // Both legs of a step share a timestamp: one snapshot per step
        assert_eq!(summary.session.snapshots, 100);
        assert_eq!(summary.reports as usize, seen.len());
        assert_eq!(summary.reports, 100);
        assert_eq!(summary.adjustments, 0);
        assert_eq!(runner.engine().tracker().len(), 100);
    }

    #[tokio::test]
    async fn test_runner_adjusts_on_event_time() {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 14, 0, 0).unwrap();
        // Hour-long tick: only the per-quote check can fire during the run
        let mut runner = EngineRunner::new(ArbitrageEngine::new(EngineSettings::default()), Duration::from_secs(3600));
        let feed = SyntheticFeed::new(SyntheticConfig {
            steps: 3000,
            start,
            ..SyntheticConfig::default()
        });

        let summary = runner.run(&feed, |_| {}).await.unwrap();

        // Warm at t=49s, then every 300s of event time up to t=2999s
        assert_eq!(summary.session.snapshots, 3000);
        assert_eq!(summary.adjustments, 10);
        assert_eq!(summary.final_thresholds_version, summary.adjustments);
        let status = runner.engine().regime_status();
        assert_eq!(status.last_adjustment, Some(start + chrono::Duration::seconds(2749)));
    }

    #[tokio::test]
    async fn test_runner_evaluates_trailing_single_leg_instant() {
        let settings = EngineSettings {
            regime: RegimeConfig::disabled(),
            ..EngineSettings::default()
        };
        let mut runner = EngineRunner::new(ArbitrageEngine::new(settings), Duration::from_millis(5));
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 14, 0, 0).unwrap();
        let quote = |symbol: &str, mid: f64, secs: i64| QuoteEvent {
            symbol: symbol.to_string(),
            bid: mid - 0.25,
            ask: mid + 0.25,
            bid_depth: 20,
            ask_depth: 20,
            volume: 5,
            timestamp: start + chrono::Duration::seconds(secs),
        };
        let mut file = NamedTempFile::new().unwrap();
        for event in [quote("WDOFUT", 5000.5, 0), quote("DOLFUT", 5000.0, 0), quote("WDOFUT", 5001.0, 1)] {
            writeln!(file, "{}", serde_json::to_string(&event).unwrap()).unwrap();
        }
        file.flush().unwrap();
        let feed = ReplayFeed::new(file.path());

        let mut spreads = Vec::new();
        let summary = runner.run(&feed, |report| spreads.push(report.spread)).await.unwrap();

        assert_eq!(summary.reports, 2);
        assert_eq!(spreads, vec![0.5, 1.0]);
    }
}
