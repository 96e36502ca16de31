//! Flow analytics for the flowdash engine.
//!
//! This crate handles:
//! - Bid/offer pressure sampling (imbalance snapshots)
//! - Session-bucketed net flow
//! - Swing high/low detection and Fibonacci retracement
//! - Rolling order flow and sentiment alerts
//! - Headline summary and book pressure
//! - Batch market verdict

pub mod imbalance;
pub mod session;
pub mod swing;
pub mod order_flow;
pub mod sentiment;
pub mod summary;
pub mod signal;
pub mod engine;

pub use imbalance::{ImbalanceAccumulator, ImbalanceCalculator};
pub use session::{SessionFlowAggregator, SessionFlowTable, SessionTable};
pub use swing::{detect_swings, manual_retracement, PricePoint, SwingAnalysis, SwingDetector};
pub use order_flow::{FlowObservation, RollingFlow};
pub use sentiment::{SentimentMachine, SentimentState};
pub use summary::SummaryBuilder;
pub use signal::SignalRules;
pub use engine::{analyze, FlowEngine, FlowEvent, FlowReport};
