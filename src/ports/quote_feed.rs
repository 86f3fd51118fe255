//! Quote Feed Port
//!
//! Source of top-of-book quotes for both legs. Implementations merge the two
//! legs into a single ordered channel; the engine is its only reader.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::{InstrumentPair, QuoteEvent};

/// Channel capacity used by the bundled feeds
pub const DEFAULT_FEED_BUFFER: usize = 1024;

/// Quote feed error type
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Feed I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed quote on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid feed settings: {0}")]
    InvalidSettings(String),
}

/// Quote feed port trait
#[async_trait]
pub trait QuoteFeed: Send + Sync {
    /// Start streaming quotes for both legs of `pair`.
    ///
    /// Quotes for other symbols are never delivered. The channel closes when
    /// the feed is exhausted.
    async fn subscribe(&self, pair: &InstrumentPair) -> Result<mpsc::Receiver<QuoteEvent>, FeedError>;

    /// Feed name for logging/display
    fn name(&self) -> &'static str;
}
