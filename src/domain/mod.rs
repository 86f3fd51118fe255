//! Domain Layer - Core types for the spread arbitrage engine
//!
//! Pure value types with no runtime dependencies. Statistical state and
//! decision logic live in `strategy`; wiring lives in `application`.
//!
//! - `instrument`: Contract specs, cost model, exact-decimal money conversion
//! - `market`: Quotes, pair snapshots and ordered pair assembly
//! - `data_quality`: Book depth / width gate applied before statistics
//! - `regime`: Regime and session time-window classifications
//! - `behavior`: External detector confirmations and their weights
//! - `signal`: Confidence tiers, outcomes and evaluation reports
//! - `opportunity`: Bounded history of validated signals

pub mod instrument;
pub mod market;
pub mod data_quality;
pub mod regime;
pub mod behavior;
pub mod signal;
pub mod opportunity;

pub use instrument::{CostModel, InstrumentPair, InstrumentSpec, Leg};
pub use market::{PairAssembler, PairSnapshot, QuoteEvent};
pub use data_quality::{DataQualityConfig, DataQualityError, DataQualityGate};
pub use regime::{Regime, TimeWindow};
pub use behavior::{BehaviorConfig, BehaviorConfirmation, BehaviorKind};
pub use signal::{
    ConfidenceTier, EvaluationReport, Leader, NoSignalReason, Outcome, SpreadDirection, TradeSignal,
};
pub use opportunity::{OpportunityLog, OpportunityRecord};
