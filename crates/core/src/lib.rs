//! Core types and configuration for the flowdash analytics engine.
//!
//! This crate provides shared types used across all other crates:
//! - Tick and derived signal types
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result, ValidationError};
pub use types::*;
