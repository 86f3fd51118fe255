//! Data Quality Gate
//!
//! Rejects pair snapshots whose books are too thin or too wide to produce a
//! trustworthy spread. Rejections are recoverable: the sample is skipped and
//! never reaches the spread tracker.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::instrument::Leg;
use super::market::{PairSnapshot, QuoteEvent};

/// Reasons a sample was rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataQualityError {
    #[error("{symbol}: book depth {depth} below minimum {minimum}")]
    InsufficientDepth { symbol: String, depth: u64, minimum: u64 },

    #[error("{symbol}: bid/ask width {width:.2} exceeds ceiling {ceiling:.2}")]
    BookTooWide { symbol: String, width: f64, ceiling: f64 },

    #[error("{symbol}: crossed book (bid {bid} > ask {ask})")]
    CrossedBook { symbol: String, bid: f64, ask: f64 },

    #[error("{symbol}: invalid price (bid {bid}, ask {ask})")]
    InvalidPrice { symbol: String, bid: f64, ask: f64 },

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),
}

/// Thresholds for the gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityConfig {
    /// Minimum contracts on the thinnest side of either book
    pub min_book_depth: u64,
    /// Maximum bid/ask width of leg A, in points
    pub max_book_spread_a: f64,
    /// Maximum bid/ask width of leg B, in points
    pub max_book_spread_b: f64,
}

impl Default for DataQualityConfig {
    fn default() -> Self {
        Self {
            min_book_depth: 5,
            max_book_spread_a: 2.0,
            max_book_spread_b: 2.0,
        }
    }
}

/// Stateless snapshot validator
#[derive(Debug, Clone)]
pub struct DataQualityGate {
    config: DataQualityConfig,
}

impl DataQualityGate {
    pub fn new(config: DataQualityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DataQualityConfig {
        &self.config
    }

    /// Check both legs; the first failure wins
    pub fn check(&self, snapshot: &PairSnapshot) -> Result<(), DataQualityError> {
        self.check_quote(Leg::A, &snapshot.leg_a)?;
        self.check_quote(Leg::B, &snapshot.leg_b)
    }

    fn check_quote(&self, leg: Leg, quote: &QuoteEvent) -> Result<(), DataQualityError> {
        let (bid, ask) = (quote.bid, quote.ask);
        if !bid.is_finite() || !ask.is_finite() || bid <= 0.0 || ask <= 0.0 {
            return Err(DataQualityError::InvalidPrice {
                symbol: quote.symbol.clone(),
                bid,
                ask,
            });
        }
        if bid > ask {
            return Err(DataQualityError::CrossedBook {
                symbol: quote.symbol.clone(),
                bid,
                ask,
            });
        }

        let depth = quote.depth();
        if depth < self.config.min_book_depth {
            return Err(DataQualityError::InsufficientDepth {
                symbol: quote.symbol.clone(),
                depth,
                minimum: self.config.min_book_depth,
            });
        }

        let ceiling = match leg {
            Leg::A => self.config.max_book_spread_a,
            Leg::B => self.config.max_book_spread_b,
        };
        let width = quote.width();
        if width > ceiling {
            return Err(DataQualityError::BookTooWide {
                symbol: quote.symbol.clone(),
                width,
                ceiling,
            });
        }

        Ok(())
    }
}
