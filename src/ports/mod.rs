//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement.
//! Following hexagonal architecture, the engine only sees:
//! - Quote feeds (both legs merged into one ordered stream)

pub mod quote_feed;

pub use quote_feed::{FeedError, QuoteFeed, DEFAULT_FEED_BUFFER};
