//! Replay harness for the flowdash analytics engine.
//!
//! This crate provides:
//! - Batch replay of raw tick files through ingestion and the flow engine
//! - Config and tick loading helpers
//! - A mock feed of the SET50 dashboard contracts
//! - Logging setup for the `flow-replay` binary

pub mod mock;

use anyhow::{Context, Result};
use flowdash_core::{config::LoggingConfig, Config, RawTick};
use flowdash_features::{analyze, FlowReport};
use flowdash_ingestion::{ClassificationStats, Rejection, TickIngestor};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use mock::MockContract;

/// Result of one replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayOutput {
    pub report: FlowReport,
    /// Records the ingestor refused, by input position.
    pub rejected: Vec<Rejection>,
    pub classification: ClassificationStats,
}

/// Runs raw tick batches through ingestion and the flow engine.
pub struct ReplayRunner {
    config: Config,
}

impl ReplayRunner {
    /// Create a runner. Fails on invalid configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate().context("invalid configuration")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Ingest and analyze one batch.
    pub fn run(&self, raws: Vec<RawTick>) -> Result<ReplayOutput> {
        let total = raws.len();
        let ingest = TickIngestor::new(self.config.ingest.clone()).ingest_batch(raws);

        if !ingest.is_clean() {
            warn!(
                rejected = ingest.rejected.len(),
                total,
                "some records were rejected"
            );
        }

        let report = analyze(&self.config, &ingest.ticks)?;
        info!(
            symbol = %report.symbol,
            accepted = ingest.ticks.len(),
            alerts = report.alerts.len(),
            signal = ?report.signal,
            "replay complete"
        );

        Ok(ReplayOutput {
            report,
            rejected: ingest.rejected,
            classification: ingest.classification,
        })
    }
}

/// Load and validate a JSON configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    Config::from_file(path).with_context(|| format!("loading config {}", path.display()))
}

/// Parse raw ticks from a JSON array or JSON lines.
pub fn parse_raw_ticks(contents: &str) -> Result<Vec<RawTick>> {
    if contents.trim_start().starts_with('[') {
        return serde_json::from_str(contents).context("parsing tick array");
    }

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("parsing tick on line {}", n + 1))
        })
        .collect()
}

/// Load raw ticks from a file.
pub fn load_raw_ticks(path: impl AsRef<Path>) -> Result<Vec<RawTick>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading ticks {}", path.display()))?;
    parse_raw_ticks(&contents).with_context(|| format!("in {}", path.display()))
}

/// Initialize logging. `RUST_LOG` overrides the configured level.
///
/// Logs go to stderr so stdout stays machine-readable.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("invalid log level {:?}", config.level))?;

    let registry = tracing_subscriber::registry().with(filter);
    if config.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }
    Ok(())
}
