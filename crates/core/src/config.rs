//! Configuration structures for the flowdash analytics engine.

use crate::error::{Error, Result};
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for the analytics engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Instrument configuration.
    pub instrument: InstrumentConfig,
    /// Tick ingestion configuration.
    pub ingest: IngestConfig,
    /// Imbalance sampling configuration.
    pub imbalance: ImbalanceConfig,
    /// Session window configuration.
    pub session: SessionConfig,
    /// Swing and retracement configuration.
    pub swing: SwingConfig,
    /// Sentiment alert configuration.
    pub sentiment: SentimentConfig,
    /// Book pressure configuration.
    pub book: BookConfig,
    /// Market signal configuration.
    pub signal: SignalConfig,
    /// Logging configuration (used by binaries only).
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse a configuration from JSON. Missing sections take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check every section. Fails fast on the first problem.
    pub fn validate(&self) -> Result<()> {
        self.imbalance.validate()?;
        self.session.validate()?;
        self.swing.validate()?;
        self.sentiment.validate()?;
        self.book.validate()?;
        self.signal.validate()?;
        Ok(())
    }
}

/// Instrument-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    /// Contract symbol (e.g., "S50Z25").
    pub symbol: String,
    /// Exchange name.
    pub exchange: String,
    /// Reference price for percentage change; first price when unset.
    pub reference_price: Option<f64>,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            symbol: "S50Z25".to_string(),
            exchange: "TFEX".to_string(),
            reference_price: None,
        }
    }
}

/// Tick ingestion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Accept ticks without a side (recorded as unknown).
    pub side_optional: bool,
    /// Accept ticks without a price when a two-sided quote gives a mid.
    pub price_optional: bool,
    /// Accept ticks without a volume (recorded as zero).
    pub volume_optional: bool,
    /// Classify unknown-side ticks against their quote.
    pub infer_side: bool,
    /// Fall back to the tick rule when the quote cannot decide.
    pub use_tick_rule: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            side_optional: false,
            price_optional: false,
            volume_optional: false,
            infer_side: true,
            use_tick_rule: true,
        }
    }
}

/// How imbalance pressure accumulates between samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureMode {
    /// Pressure runs from the first tick up to each boundary.
    #[default]
    Running,
    /// Pressure resets at every boundary.
    PerInterval,
}

/// Imbalance sampling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImbalanceConfig {
    /// Sampling granularity in seconds.
    pub interval_seconds: u32,
    /// Accumulation mode.
    pub mode: PressureMode,
}

impl ImbalanceConfig {
    /// Interval in milliseconds.
    pub fn interval_ms(&self) -> i64 {
        self.interval_seconds as i64 * 1000
    }

    fn validate(&self) -> Result<()> {
        if self.interval_seconds == 0 {
            return Err(Error::config("imbalance.interval_seconds must be positive"));
        }
        Ok(())
    }
}

impl Default for ImbalanceConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 300,
            mode: PressureMode::Running,
        }
    }
}

/// A named time-of-day bucket, half-open `[start, end)`.
///
/// An `end` of `00:00:00` means end of day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub name: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl SessionWindow {
    /// Create a window from hour/minute pairs. Fails on an invalid time of day.
    pub fn new(name: impl Into<String>, start: (u32, u32), end: (u32, u32)) -> Result<Self> {
        let name = name.into();
        let time = |(hour, minute): (u32, u32)| {
            NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
                Error::config(format!(
                    "session window `{name}` has invalid time {hour:02}:{minute:02}"
                ))
            })
        };
        let start = time(start)?;
        let end = time(end)?;
        Ok(Self { name, start, end })
    }

    /// Window bounds as seconds from midnight, end exclusive.
    pub fn bounds_secs(&self) -> (u32, u32) {
        let start = self.start.num_seconds_from_midnight();
        let end = match self.end.num_seconds_from_midnight() {
            0 => 86_400,
            secs => secs,
        };
        (start, end)
    }

    /// Whether a second-of-day falls inside the window.
    pub fn contains_secs(&self, secs: u32) -> bool {
        let (start, end) = self.bounds_secs();
        secs >= start && secs < end
    }
}

/// Session window configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Exchange local time offset from UTC in minutes.
    pub utc_offset_minutes: i32,
    /// Windows, assigned by local time of day.
    pub windows: Vec<SessionWindow>,
}

impl SessionConfig {
    /// Reject empty, inverted or overlapping tables.
    pub fn validate(&self) -> Result<()> {
        if self.windows.is_empty() {
            return Err(Error::config("session.windows must not be empty"));
        }
        if self.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(Error::config(format!(
                "session.utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            )));
        }

        let mut spans: Vec<(u32, u32, &str)> = Vec::with_capacity(self.windows.len());
        for window in &self.windows {
            let (start, end) = window.bounds_secs();
            if start >= end {
                return Err(Error::config(format!(
                    "session window `{}` is empty or inverted ({} - {})",
                    window.name, window.start, window.end
                )));
            }
            spans.push((start, end, window.name.as_str()));
        }

        spans.sort_by_key(|&(start, _, _)| start);
        for pair in spans.windows(2) {
            let (_, prev_end, prev_name) = pair[0];
            let (next_start, _, next_name) = pair[1];
            if next_start < prev_end {
                return Err(Error::config(format!(
                    "session windows `{prev_name}` and `{next_name}` overlap"
                )));
            }
        }
        Ok(())
    }
}

fn default_window(name: &str, start: (u32, u32), end: (u32, u32)) -> SessionWindow {
    SessionWindow::new(name, start, end).expect("default session times are valid")
}

impl Default for SessionConfig {
    /// Thai futures day split into four buckets covering the full day.
    fn default() -> Self {
        Self {
            utc_offset_minutes: 7 * 60,
            windows: vec![
                default_window("Morning", (0, 0), (10, 0)),
                default_window("Mid-day", (10, 0), (15, 0)),
                default_window("Late", (15, 0), (16, 0)),
                default_window("AfterClose", (16, 0), (0, 0)),
            ],
        }
    }
}

/// Which price series swing detection runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// Every tick price.
    #[default]
    Ticks,
    /// Close of each sampling interval.
    IntervalClose,
}

/// Swing and retracement configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingConfig {
    /// Points on each side that must not exceed a swing.
    pub lookback: usize,
    /// Minimum price move between opposite swings. Zero keeps every swing.
    pub min_move: f64,
    /// Retracement ratios.
    pub ratios: Vec<f64>,
    /// Price series to scan.
    pub price_source: PriceSource,
    /// Fixed swing pair. When set, retracement levels come from it instead
    /// of the detected swings.
    pub manual: Option<ManualSwing>,
}

/// A user-supplied swing high and low.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManualSwing {
    pub high: f64,
    pub low: f64,
}

impl SwingConfig {
    fn validate(&self) -> Result<()> {
        if self.lookback == 0 {
            return Err(Error::config("swing.lookback must be at least 1"));
        }
        if !self.min_move.is_finite() || self.min_move < 0.0 {
            return Err(Error::config("swing.min_move must be a non-negative number"));
        }
        if let Some(bad) = self.ratios.iter().find(|r| !(0.0..=1.0).contains(*r)) {
            return Err(Error::config(format!("swing ratio {bad} outside [0, 1]")));
        }
        if let Some(ManualSwing { high, low }) = self.manual {
            if !high.is_finite() || !low.is_finite() || high <= low {
                return Err(Error::config(format!(
                    "swing.manual high {high} must be above low {low}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for SwingConfig {
    fn default() -> Self {
        Self {
            lookback: 5,
            min_move: 0.0,
            ratios: vec![0.236, 0.382, 0.5, 0.618, 0.786],
            price_source: PriceSource::Ticks,
            manual: None,
        }
    }
}

/// Sentiment alert configuration.
///
/// Thresholds carry no defaults: a rule with an unset threshold never fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    /// Rolling net flow below this (negative) value counts as heavy selling.
    pub heavy_selling_threshold: Option<f64>,
    /// Consecutive intervals below threshold before alerting.
    pub consecutive_intervals: u32,
    /// Intervals summed into the rolling net flow.
    pub flow_window_intervals: u32,
    /// Interval volume above this multiple of the rolling mean is a spike.
    pub panic_volume_multiple: Option<f64>,
    /// Intervals averaged into the volume baseline.
    pub volume_window_intervals: u32,
    /// Seconds after a selling alert during which a flow reversal is a rebound.
    /// Unset means unbounded.
    pub rebound_window_seconds: Option<u32>,
    /// Interval close below this price is a price panic when selling also
    /// dominates. Needs `sell_buy_volume_ratio`.
    pub alert_price: Option<f64>,
    /// Rolling sell volume above this multiple of buy volume dominates.
    pub sell_buy_volume_ratio: Option<f64>,
}

impl SentimentConfig {
    fn validate(&self) -> Result<()> {
        if let Some(threshold) = self.heavy_selling_threshold {
            if !threshold.is_finite() || threshold >= 0.0 {
                return Err(Error::config(
                    "sentiment.heavy_selling_threshold must be negative",
                ));
            }
        }
        if let Some(multiple) = self.panic_volume_multiple {
            if !multiple.is_finite() || multiple <= 0.0 {
                return Err(Error::config(
                    "sentiment.panic_volume_multiple must be positive",
                ));
            }
        }
        for (name, value) in [
            ("alert_price", self.alert_price),
            ("sell_buy_volume_ratio", self.sell_buy_volume_ratio),
        ] {
            if let Some(value) = value {
                if !value.is_finite() || value <= 0.0 {
                    return Err(Error::config(format!("sentiment.{name} must be positive")));
                }
            }
        }
        if self.consecutive_intervals == 0
            || self.flow_window_intervals == 0
            || self.volume_window_intervals == 0
        {
            return Err(Error::config("sentiment interval counts must be at least 1"));
        }
        Ok(())
    }
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            heavy_selling_threshold: None,
            consecutive_intervals: 1,
            flow_window_intervals: 1,
            panic_volume_multiple: None,
            volume_window_intervals: 1,
            rebound_window_seconds: None,
            alert_price: None,
            sell_buy_volume_ratio: None,
        }
    }
}

/// Book pressure configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BookConfig {
    /// |ask_sz - bid_sz| must exceed this for a non-neutral label.
    pub pressure_band: f64,
}

impl BookConfig {
    fn validate(&self) -> Result<()> {
        if !self.pressure_band.is_finite() || self.pressure_band < 0.0 {
            return Err(Error::config("book.pressure_band must be non-negative"));
        }
        Ok(())
    }
}

/// Market signal configuration.
///
/// The verdict reuses `sentiment.alert_price` and
/// `sentiment.sell_buy_volume_ratio` for its price panic check. Levels are
/// fractions of the swing range above the swing low.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Batch net flow below this value is flagged.
    pub net_flow_threshold: Option<f64>,
    /// Batch sell volume below this value, with price above `easing_level`,
    /// means selling is easing.
    pub easing_sell_volume: Option<f64>,
    pub easing_level: f64,
    /// Positive net flow with price above this level is a reversal.
    pub reversal_level: f64,
}

impl SignalConfig {
    fn validate(&self) -> Result<()> {
        if let Some(threshold) = self.net_flow_threshold {
            if !threshold.is_finite() {
                return Err(Error::config("signal.net_flow_threshold must be finite"));
            }
        }
        if let Some(volume) = self.easing_sell_volume {
            if !volume.is_finite() || volume < 0.0 {
                return Err(Error::config("signal.easing_sell_volume must be non-negative"));
            }
        }
        for (name, level) in [
            ("easing_level", self.easing_level),
            ("reversal_level", self.reversal_level),
        ] {
            if !(0.0..=1.0).contains(&level) {
                return Err(Error::config(format!("signal.{name} {level} outside [0, 1]")));
            }
        }
        Ok(())
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            net_flow_threshold: None,
            easing_sell_volume: None,
            easing_level: 0.2,
            reversal_level: 0.25,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.imbalance.interval_seconds, 300);
        assert_eq!(config.session.windows.len(), 4);
        assert_eq!(config.swing.ratios, vec![0.236, 0.382, 0.5, 0.618, 0.786]);
        assert!(config.sentiment.heavy_selling_threshold.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_windows_cover_day() {
        let config = SessionConfig::default();
        let total: u32 = config
            .windows
            .iter()
            .map(|w| {
                let (start, end) = w.bounds_secs();
                end - start
            })
            .sum();
        assert_eq!(total, 86_400);
    }

    #[test]
    fn test_overlapping_windows_rejected() {
        let config = SessionConfig {
            utc_offset_minutes: 0,
            windows: vec![
                SessionWindow::new("A", (9, 0), (11, 0)).unwrap(),
                SessionWindow::new("B", (10, 30), (12, 0)).unwrap(),
            ],
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("overlap")));
    }

    #[test]
    fn test_empty_and_inverted_windows_rejected() {
        let empty = SessionConfig {
            utc_offset_minutes: 0,
            windows: vec![],
        };
        assert!(empty.validate().is_err());

        let inverted = SessionConfig {
            utc_offset_minutes: 0,
            windows: vec![SessionWindow::new("A", (12, 0), (9, 0)).unwrap()],
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_invalid_window_time_rejected() {
        let err = SessionWindow::new("X", (25, 0), (26, 0)).unwrap_err();
        assert!(err.to_string().contains("25:00"));
        assert!(SessionWindow::new("X", (9, 60), (10, 0)).is_err());
        assert!(SessionWindow::new("X", (9, 0), (0, 0)).is_ok());
    }

    #[test]
    fn test_manual_swing_checked() {
        let mut config = Config::default();
        config.swing.manual = Some(ManualSwing { high: 830.0, low: 800.0 });
        assert!(config.validate().is_ok());

        config.swing.manual = Some(ManualSwing { high: 800.0, low: 830.0 });
        assert!(config.validate().is_err());
        config.swing.manual = Some(ManualSwing { high: f64::NAN, low: 800.0 });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_price_alert_and_signal_checked() {
        let mut config = Config::default();
        config.sentiment.alert_price = Some(820.0);
        config.sentiment.sell_buy_volume_ratio = Some(2.0);
        config.signal.net_flow_threshold = Some(-10_000.0);
        config.signal.easing_sell_volume = Some(400.0);
        assert!(config.validate().is_ok());

        config.sentiment.sell_buy_volume_ratio = Some(0.0);
        assert!(config.validate().is_err());
        config.sentiment.sell_buy_volume_ratio = Some(2.0);

        config.signal.reversal_level = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_gapped_windows_allowed() {
        let config = SessionConfig {
            utc_offset_minutes: 0,
            windows: vec![
                SessionWindow::new("A", (9, 0), (10, 0)).unwrap(),
                SessionWindow::new("B", (11, 0), (12, 0)).unwrap(),
            ],
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_sign_checked() {
        let mut config = Config::default();
        config.sentiment.heavy_selling_threshold = Some(100.0);
        assert!(config.validate().is_err());

        config.sentiment.heavy_selling_threshold = Some(-100.0);
        config.sentiment.panic_volume_multiple = Some(0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let json = r#"{
            "imbalance": { "interval_seconds": 60, "mode": "per_interval" },
            "session": {
                "utc_offset_minutes": 0,
                "windows": [{ "name": "Day", "start": "09:00:00", "end": "17:00:00" }]
            },
            "swing": { "manual": { "high": 830.0, "low": 800.0 } }
        }"#;
        let config = Config::from_json_str(json).unwrap();
        assert_eq!(config.imbalance.interval_ms(), 60_000);
        assert_eq!(config.imbalance.mode, PressureMode::PerInterval);
        assert_eq!(config.session.windows[0].bounds_secs(), (9 * 3600, 17 * 3600));
        assert_eq!(config.swing.lookback, 5);
        assert_eq!(config.swing.manual, Some(ManualSwing { high: 830.0, low: 800.0 }));
        assert_eq!(config.signal.reversal_level, 0.25);
    }

    #[test]
    fn test_zero_lookback_rejected() {
        let mut config = Config::default();
        config.swing.lookback = 0;
        assert!(config.validate().is_err());
    }
}
