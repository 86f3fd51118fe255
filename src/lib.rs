//! Spread Sentinel - Adaptive Spread Signal Library
//!
//! Tracks the spread between a mini and a full futures contract (WDO/DOL by
//! default), scores it against a rolling z-score and emits tiered,
//! cost-aware trade signals. Thresholds adapt to the market regime and the
//! session clock. Signals are advisory; nothing here routes orders.
//!
//! # Modules
//!
//! - `domain`: Instruments, quotes, data-quality gate, signals, opportunity log
//! - `strategy`: Parameters, spread statistics, regime controller, validator, leadership
//! - `ports`: Quote feed trait
//! - `adapters`: Replay and synthetic feeds, CLI
//! - `config`: Configuration loading, validation and profiles
//! - `application`: Engine and feed runner

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod strategy;
