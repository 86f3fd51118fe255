//! Market Observations
//!
//! Top-of-book quotes as delivered by the ingestion side, and the pair
//! snapshot assembled once both legs have quoted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::instrument::{InstrumentPair, Leg};

/// One top-of-book observation for a single instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteEvent {
    pub symbol: String,
    pub bid: f64,
    pub ask: f64,
    /// Contracts resting at the best bid
    pub bid_depth: u64,
    /// Contracts resting at the best ask
    pub ask_depth: u64,
    /// Traded volume since the previous quote
    #[serde(default)]
    pub volume: u64,
    pub timestamp: DateTime<Utc>,
}

impl QuoteEvent {
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    /// Bid/ask width in points
    pub fn width(&self) -> f64 {
        self.ask - self.bid
    }

    /// Thinnest side of the book
    pub fn depth(&self) -> u64 {
        self.bid_depth.min(self.ask_depth)
    }
}

/// Latest quotes of both legs at a point in time
#[derive(Debug, Clone, PartialEq)]
pub struct PairSnapshot {
    pub leg_a: QuoteEvent,
    pub leg_b: QuoteEvent,
}

impl PairSnapshot {
    /// Timestamp of the most recent leg update
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.leg_a.timestamp.max(self.leg_b.timestamp)
    }

    /// Combined traded volume of both legs
    pub fn volume(&self) -> u64 {
        self.leg_a.volume.saturating_add(self.leg_b.volume)
    }

    pub fn spread(&self, pair: &InstrumentPair) -> f64 {
        pair.spread(self.leg_a.mid(), self.leg_b.mid())
    }
}

/// Merges per-instrument quotes into ordered pair snapshots, one per
/// market instant.
///
/// Quotes must arrive through a single ordered channel. The assembler keeps
/// the latest quote per leg and samples the pair once per timestamp:
///
/// - when both legs carry the same timestamp the snapshot is emitted at once;
/// - when only one leg moved, the snapshot is held until a later quote shows
///   the instant is over (or until [`PairAssembler::flush`]);
/// - further quotes for an instant that was already emitted only update the
///   held state.
///
/// Stale (older than the held quote) events are dropped.
#[derive(Debug, Default)]
pub struct PairAssembler {
    leg_a: Option<QuoteEvent>,
    leg_b: Option<QuoteEvent>,
    pending: bool,
    last_emitted: Option<DateTime<Utc>>,
}

impl PairAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a quote for the given leg; returns the snapshot of a completed instant
    pub fn apply(&mut self, leg: Leg, quote: QuoteEvent) -> Option<PairSnapshot> {
        let held = match leg {
            Leg::A => self.leg_a.as_ref(),
            Leg::B => self.leg_b.as_ref(),
        };
        if let Some(held) = held {
            if quote.timestamp < held.timestamp {
                tracing::debug!(
                    "Dropping out-of-order quote for {} ({} < {})",
                    quote.symbol,
                    quote.timestamp,
                    held.timestamp
                );
                return None;
            }
        }

        // A later quote closes the held instant before it is overwritten
        let closed = match self.current() {
            Some(snapshot) if self.pending && quote.timestamp > snapshot.timestamp() => {
                self.mark_emitted(snapshot.timestamp());
                Some(snapshot)
            }
            _ => None,
        };

        match leg {
            Leg::A => self.leg_a = Some(quote),
            Leg::B => self.leg_b = Some(quote),
        }

        let snapshot = self.current()?;
        let at = snapshot.timestamp();
        if self.last_emitted.is_some_and(|emitted| at <= emitted) {
            return closed;
        }
        if snapshot.leg_a.timestamp == snapshot.leg_b.timestamp {
            // Both legs quoted this instant; `closed` is necessarily empty here
            self.mark_emitted(at);
            return Some(snapshot);
        }
        self.pending = true;
        closed
    }

    /// Emit the held snapshot, if any (end of feed)
    pub fn flush(&mut self) -> Option<PairSnapshot> {
        if !self.pending {
            return None;
        }
        let snapshot = self.current()?;
        self.mark_emitted(snapshot.timestamp());
        Some(snapshot)
    }

    fn current(&self) -> Option<PairSnapshot> {
        match (&self.leg_a, &self.leg_b) {
            (Some(a), Some(b)) => Some(PairSnapshot {
                leg_a: a.clone(),
                leg_b: b.clone(),
            }),
            _ => None,
        }
    }

    fn mark_emitted(&mut self, at: DateTime<Utc>) {
        self.pending = false;
        self.last_emitted = Some(at);
    }

    pub fn reset(&mut self) {
        self.leg_a = None;
        self.leg_b = None;
        self.pending = false;
        self.last_emitted = None;
    }
}
