//! Synthetic Feed
//!
//! Generates a two-leg quote stream for dry runs: leg B follows a random
//! walk and the spread follows a discrete mean-reverting process
//!
//! spread[t+1] = spread[t] + reversion * (mean - spread[t]) + spread_vol * e
//!
//! with e ~ N(0, 1). Seeded, so a given configuration always produces the
//! same stream.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::domain::{InstrumentPair, QuoteEvent};
use crate::ports::{FeedError, QuoteFeed, DEFAULT_FEED_BUFFER};

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Number of steps; each step quotes both legs
    pub steps: usize,
    pub base_price: f64,
    pub mean_spread: f64,
    /// Pull toward the mean per step, in (0, 1]
    pub reversion: f64,
    pub spread_vol: f64,
    pub price_vol: f64,
    /// Bid/ask width in points
    pub book_width: f64,
    pub depth: u64,
    pub max_volume: u64,
    /// Simulated time between steps
    pub step: ChronoDuration,
    /// Wall-clock delay between steps; `None` runs flat out
    pub pace: Option<Duration>,
    pub start: DateTime<Utc>,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            steps: 500,
            base_price: 5000.0,
            mean_spread: 0.0,
            reversion: 0.15,
            spread_vol: 0.4,
            price_vol: 0.5,
            book_width: 0.5,
            depth: 25,
            max_volume: 40,
            step: ChronoDuration::seconds(1),
            pace: None,
            start: Utc::now(),
            seed: 42,
        }
    }
}

impl SyntheticConfig {
    pub fn validate(&self) -> Result<(), FeedError> {
        if !(self.reversion > 0.0 && self.reversion <= 1.0) {
            return Err(FeedError::InvalidSettings(format!("reversion must be in (0, 1], got {}", self.reversion)));
        }
        if !(self.spread_vol >= 0.0) || !(self.price_vol >= 0.0) || !(self.book_width > 0.0) {
            return Err(FeedError::InvalidSettings(
                "volatilities must be >= 0 and book_width > 0".to_string(),
            ));
        }
        if !(self.base_price > 0.0) {
            return Err(FeedError::InvalidSettings(format!("base_price must be > 0, got {}", self.base_price)));
        }
        Ok(())
    }
}

/// Seeded quote generator, usable without a runtime
pub struct QuoteGenerator {
    config: SyntheticConfig,
    rng: StdRng,
    price_b: f64,
    spread: f64,
    step: usize,
}

impl QuoteGenerator {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            price_b: config.base_price,
            spread: config.mean_spread,
            step: 0,
            config,
        }
    }

    /// Standard normal draw (Box-Muller)
    fn gaussian(&mut self) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    fn quote(&mut self, symbol: &str, mid: f64, timestamp: DateTime<Utc>) -> QuoteEvent {
        let half = self.config.book_width / 2.0;
        let volume = if self.config.max_volume == 0 {
            0
        } else {
            self.rng.gen_range(0..=self.config.max_volume)
        };
        QuoteEvent {
            symbol: symbol.to_string(),
            bid: mid - half,
            ask: mid + half,
            bid_depth: self.config.depth,
            ask_depth: self.config.depth,
            volume,
            timestamp,
        }
    }

    /// Next pair of quotes (leg A, leg B), or `None` once all steps are used
    pub fn next_pair(&mut self, pair: &InstrumentPair) -> Option<(QuoteEvent, QuoteEvent)> {
        if self.step >= self.config.steps {
            return None;
        }
        let timestamp = self.config.start + self.config.step * self.step as i32;
        self.step += 1;

        let shock = self.gaussian();
        self.price_b += self.config.price_vol * shock;
        let noise = self.gaussian();
        self.spread += self.config.reversion * (self.config.mean_spread - self.spread) + self.config.spread_vol * noise;

        // spread = mid_a * price_ratio - mid_b
        let mid_a = (self.price_b + self.spread) / pair.price_ratio;
        let mid_b = self.price_b;

        let a = self.quote(&pair.leg_a.symbol, mid_a, timestamp);
        let b = self.quote(&pair.leg_b.symbol, mid_b, timestamp);
        Some((a, b))
    }
}

pub struct SyntheticFeed {
    config: SyntheticConfig,
}

impl SyntheticFeed {
    pub fn new(config: SyntheticConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl QuoteFeed for SyntheticFeed {
    async fn subscribe(&self, pair: &InstrumentPair) -> Result<mpsc::Receiver<QuoteEvent>, FeedError> {
        self.config.validate()?;
        let (tx, rx) = mpsc::channel(DEFAULT_FEED_BUFFER);
        let mut generator = QuoteGenerator::new(self.config.clone());
        let pair = pair.clone();
        let pace = self.config.pace;
        info!(
            "Synthetic feed: {} steps, seed {}, reversion {}",
            self.config.steps, self.config.seed, self.config.reversion
        );

        tokio::spawn(async move {
            while let Some((a, b)) = generator.next_pair(&pair) {
                if tx.send(a).await.is_err() || tx.send(b).await.is_err() {
                    debug!("Synthetic receiver dropped");
                    return;
                }
                if let Some(pace) = pace {
                    tokio::time::sleep(pace).await;
                }
            }
        });

        Ok(rx)
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InstrumentSpec;
    use approx::assert_relative_eq;
    use rust_decimal_macros::dec;

    fn pair() -> InstrumentPair {
        InstrumentPair {
            leg_a: InstrumentSpec::new("WDOFUT", dec!(0.5), dec!(5), dec!(10)),
            leg_b: InstrumentSpec::new("DOLFUT", dec!(0.5), dec!(25), dec!(50)),
            price_ratio: 1.0,
            contract_ratio: 5,
        }
    }

    #[test]
    fn test_generator_is_deterministic() {
        let config = SyntheticConfig {
            steps: 20,
            ..SyntheticConfig::default()
        };
        let mut g1 = QuoteGenerator::new(config.clone());
        let mut g2 = QuoteGenerator::new(config);
        let pair = pair();
        for _ in 0..20 {
            assert_eq!(g1.next_pair(&pair), g2.next_pair(&pair));
        }
        assert!(g1.next_pair(&pair).is_none());
    }

    #[test]
    fn test_generated_quotes_are_well_formed() {
        let pair = pair();
        let mut generator = QuoteGenerator::new(SyntheticConfig::default());
        let mut previous = None;
        while let Some((a, b)) = generator.next_pair(&pair) {
            assert_eq!(a.symbol, "WDOFUT");
            assert_eq!(b.symbol, "DOLFUT");
            assert!(a.bid < a.ask && b.bid < b.ask);
            assert_relative_eq!(a.width(), 0.5, epsilon = 1e-9);
            assert_eq!(a.timestamp, b.timestamp);
            if let Some(prev) = previous {
                assert!(a.timestamp > prev);
            }
            previous = Some(a.timestamp);
        }
    }

    #[test]
    fn test_spread_reverts_without_noise() {
        let pair = pair();
        let mut generator = QuoteGenerator::new(SyntheticConfig {
            spread_vol: 0.0,
            price_vol: 0.0,
            mean_spread: 1.0,
            reversion: 0.5,
            steps: 30,
            ..SyntheticConfig::default()
        });
        let mut last = 0.0;
        while let Some((a, b)) = generator.next_pair(&pair) {
            last = pair.spread(a.mid(), b.mid());
        }
        assert_relative_eq!(last, 1.0, epsilon = 1e-6);
    }

    #[tokio::test]
    async fn test_feed_streams_both_legs() {
        let feed = SyntheticFeed::new(SyntheticConfig {
            steps: 10,
            ..SyntheticConfig::default()
        });
        let mut rx = feed.subscribe(&pair()).await.unwrap();
        let mut count = 0;
        while rx.recv().await.is_some() {
            count += 1;
        }
        assert_eq!(count, 20);
    }

    #[tokio::test]
    async fn test_invalid_settings_rejected() {
        let feed = SyntheticFeed::new(SyntheticConfig {
            reversion: 0.0,
            ..SyntheticConfig::default()
        });
        assert!(matches!(feed.subscribe(&pair()).await, Err(FeedError::InvalidSettings(_))));
    }
}
