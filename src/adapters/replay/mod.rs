//! Replay Feed
//!
//! Streams recorded quotes from a JSON-lines file, one [`QuoteEvent`] per
//! line. Blank lines and `#` comments are skipped; malformed lines are
//! logged and skipped so a single bad record never ends a replay.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::{InstrumentPair, QuoteEvent};
use crate::ports::{FeedError, QuoteFeed, DEFAULT_FEED_BUFFER};

pub struct ReplayFeed {
    path: PathBuf,
    buffer: usize,
    /// Delay between quotes; `None` replays as fast as the reader consumes
    pace: Option<Duration>,
}

impl ReplayFeed {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            buffer: DEFAULT_FEED_BUFFER,
            pace: None,
        }
    }

    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = Some(pace);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse one line; `Ok(None)` for blank lines and comments
    pub fn parse_line(line: &str, line_no: usize) -> Result<Option<QuoteEvent>, FeedError> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }
        serde_json::from_str(trimmed)
            .map(Some)
            .map_err(|source| FeedError::Parse { line: line_no, source })
    }
}

#[async_trait]
impl QuoteFeed for ReplayFeed {
    async fn subscribe(&self, pair: &InstrumentPair) -> Result<mpsc::Receiver<QuoteEvent>, FeedError> {
        let file = File::open(&self.path).await?;
        let (tx, rx) = mpsc::channel(self.buffer.max(1));

        let symbols = [pair.leg_a.symbol.clone(), pair.leg_b.symbol.clone()];
        let pace = self.pace;
        let source = self.path.display().to_string();
        info!("Replaying quotes from {}", source);

        tokio::spawn(async move {
            let mut lines = BufReader::new(file).lines();
            let mut line_no = 0usize;
            let mut sent = 0usize;
            let mut skipped = 0usize;

            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Replay read error in {}: {}", source, e);
                        break;
                    }
                };
                line_no += 1;

                let quote = match ReplayFeed::parse_line(&line, line_no) {
                    Ok(Some(quote)) => quote,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("{}: {}", source, e);
                        skipped += 1;
                        continue;
                    }
                };
                if !symbols.contains(&quote.symbol) {
                    debug!("Ignoring quote for {}", quote.symbol);
                    continue;
                }
                if tx.send(quote).await.is_err() {
                    debug!("Replay receiver dropped");
                    break;
                }
                sent += 1;
                if let Some(pace) = pace {
                    tokio::time::sleep(pace).await;
                }
            }
            info!("Replay finished: {} quotes sent, {} malformed lines skipped", sent, skipped);
        });

        Ok(rx)
    }

    fn name(&self) -> &'static str {
        "replay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InstrumentSpec;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn pair() -> InstrumentPair {
        InstrumentPair {
            leg_a: InstrumentSpec::new("WDOFUT", dec!(0.5), dec!(5), dec!(10)),
            leg_b: InstrumentSpec::new("DOLFUT", dec!(0.5), dec!(25), dec!(50)),
            price_ratio: 1.0,
            contract_ratio: 5,
        }
    }

    #[test]
    fn test_parse_line() {
        assert!(ReplayFeed::parse_line("   ", 1).unwrap().is_none());
        assert!(ReplayFeed::parse_line("# header", 2).unwrap().is_none());

        let quote = ReplayFeed::parse_line(
            r#"{"symbol":"WDOFUT","bid":5000.0,"ask":5000.5,"bid_depth":12,"ask_depth":9,"timestamp":"2024-03-04T12:00:00Z"}"#,
            3,
        )
        .unwrap()
        .unwrap();
        assert_eq!(quote.symbol, "WDOFUT");
        assert_eq!(quote.volume, 0);

        let err = ReplayFeed::parse_line("{not json", 4).unwrap_err();
        assert!(matches!(err, FeedError::Parse { line: 4, .. }));
    }

    #[tokio::test]
    async fn test_replay_streams_pair_quotes_only() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# recorded session").unwrap();
        writeln!(
            file,
            r#"{{"symbol":"WDOFUT","bid":5000.0,"ask":5000.5,"bid_depth":12,"ask_depth":9,"volume":4,"timestamp":"2024-03-04T12:00:00Z"}}"#
        )
        .unwrap();
        writeln!(file, "garbage").unwrap();
        writeln!(
            file,
            r#"{{"symbol":"INDFUT","bid":1.0,"ask":2.0,"bid_depth":1,"ask_depth":1,"timestamp":"2024-03-04T12:00:01Z"}}"#
        )
        .unwrap();
        writeln!(
            file,
            r#"{{"symbol":"DOLFUT","bid":4999.5,"ask":5000.0,"bid_depth":20,"ask_depth":15,"timestamp":"2024-03-04T12:00:02Z"}}"#
        )
        .unwrap();
        file.flush().unwrap();

        let feed = ReplayFeed::new(file.path());
        let mut rx = feed.subscribe(&pair()).await.unwrap();

        let mut symbols = Vec::new();
        while let Some(quote) = rx.recv().await {
            symbols.push(quote.symbol);
        }
        assert_eq!(symbols, vec!["WDOFUT", "DOLFUT"]);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let feed = ReplayFeed::new("/nonexistent/quotes.jsonl");
        assert!(matches!(feed.subscribe(&pair()).await, Err(FeedError::Io(_))));
    }
}
