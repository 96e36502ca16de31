//! Data ingestion and normalization for the flowdash analytics engine.
//!
//! This crate handles:
//! - Tick validation and ordering
//! - Aggressor side inference (bid/ask classification, tick rule)
//! - Interval bar building

pub mod ingestor;
pub mod classifier;
pub mod bar_builder;

pub use ingestor::{IngestReport, Rejection, TickIngestor};
pub use classifier::{SideClassifier, ClassificationStats};
pub use bar_builder::BarBuilder;
