//! Market regime and session time-window classifications

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classified volatility/trend state of the spread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    #[default]
    Normal,
    HighVolatility,
    LowVolatility,
    Trending,
}

impl Regime {
    pub const ALL: [Regime; 4] = [
        Regime::Normal,
        Regime::HighVolatility,
        Regime::LowVolatility,
        Regime::Trending,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::Normal => "normal",
            Regime::HighVolatility => "high_volatility",
            Regime::LowVolatility => "low_volatility",
            Regime::Trending => "trending",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intraday session window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    Opening,
    Lunch,
    Closing,
    #[default]
    Normal,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Opening => "opening",
            TimeWindow::Lunch => "lunch",
            TimeWindow::Closing => "closing",
            TimeWindow::Normal => "normal",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(Regime::default(), Regime::Normal);
        assert_eq!(TimeWindow::default(), TimeWindow::Normal);
    }

    #[test]
    fn test_serde_names_match_display() {
        for regime in Regime::ALL {
            let json = serde_json::to_string(&regime).unwrap();
            assert_eq!(json, format!("\"{}\"", regime));
        }
        let parsed: TimeWindow = serde_json::from_str("\"lunch\"").unwrap();
        assert_eq!(parsed, TimeWindow::Lunch);
    }
}
