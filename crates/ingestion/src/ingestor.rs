//! Tick validation and ordering.
//!
//! Turns raw trade/quote records into an ordered, validated tick sequence.
//! Invalid records are rejected individually; the batch continues.
//!
//! Batch ingestion is a pure function of the batch and the configuration.
//! Only `ingest_one` carries ordering and classifier state between calls.

use crate::classifier::{ClassificationStats, SideClassifier};
use flowdash_core::{
    config::IngestConfig, RawTick, Side, Tick, TimestampMs, ValidationError, MAX_TIMESTAMP_MS,
};
use serde::Serialize;
use tracing::{debug, warn};

/// A record that failed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    /// Position of the record in the input batch.
    pub index: usize,
    /// Why it was rejected.
    #[serde(serialize_with = "serialize_display")]
    pub error: ValidationError,
}

fn serialize_display<S: serde::Serializer>(
    err: &ValidationError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(err)
}

/// Outcome of ingesting a batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    /// Accepted ticks, non-decreasing in timestamp.
    pub ticks: Vec<Tick>,
    /// Rejected records.
    pub rejected: Vec<Rejection>,
    /// How the accepted ticks got their sides.
    pub classification: ClassificationStats,
}

impl IngestReport {
    /// Whether every record was accepted.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Tick ingestor.
pub struct TickIngestor {
    config: IngestConfig,
    classifier: SideClassifier,
    /// Next ingestion sequence number.
    next_seq: u64,
    /// Last accepted timestamp (streaming mode).
    last_ts_ms: Option<TimestampMs>,
}

impl TickIngestor {
    /// Create a new ingestor.
    pub fn new(config: IngestConfig) -> Self {
        let classifier = SideClassifier::new(config.use_tick_rule);
        Self {
            config,
            classifier,
            next_seq: 0,
            last_ts_ms: None,
        }
    }

    /// Ingest a whole batch.
    ///
    /// Records are stably sorted by timestamp first, so equal timestamps keep
    /// their input order. Records without a timestamp are rejected up front.
    /// Sequence numbers and side inference start fresh for every batch.
    pub fn ingest_batch(&self, raws: Vec<RawTick>) -> IngestReport {
        let mut report = IngestReport::default();

        let mut indexed: Vec<(usize, RawTick)> = Vec::with_capacity(raws.len());
        for (index, raw) in raws.into_iter().enumerate() {
            if raw.ts_ms.is_none() {
                report.rejected.push(Rejection {
                    index,
                    error: ValidationError::MissingField("ts_ms"),
                });
            } else {
                indexed.push((index, raw));
            }
        }
        indexed.sort_by_key(|(index, raw)| (raw.ts_ms.unwrap_or_default(), *index));

        let mut classifier = SideClassifier::new(self.config.use_tick_rule);
        report.ticks.reserve(indexed.len());
        for (index, raw) in indexed {
            match self.validate(&raw) {
                Ok(mut tick) => {
                    tick.side = resolve_side(self.config.infer_side, &mut classifier, &tick);
                    tick.seq = report.ticks.len() as u64;
                    report.ticks.push(tick);
                }
                Err(error) => {
                    debug!(index, %error, "rejected tick");
                    report.rejected.push(Rejection { index, error });
                }
            }
        }

        report.classification = classifier.stats().clone();
        report.rejected.sort_by_key(|r| r.index);
        if !report.rejected.is_empty() {
            warn!(
                accepted = report.ticks.len(),
                rejected = report.rejected.len(),
                "ingested batch with rejections"
            );
        }
        report
    }

    /// Ingest one record in streaming order.
    pub fn ingest_one(&mut self, raw: RawTick) -> Result<Tick, ValidationError> {
        let mut tick = self.validate(&raw)?;

        if let Some(last) = self.last_ts_ms {
            if tick.ts_ms < last {
                return Err(ValidationError::OutOfOrder {
                    ts_ms: tick.ts_ms,
                    last_ts_ms: last,
                });
            }
        }

        tick.side = resolve_side(self.config.infer_side, &mut self.classifier, &tick);
        tick.seq = self.next_seq;
        self.next_seq += 1;
        self.last_ts_ms = Some(tick.ts_ms);
        Ok(tick)
    }

    /// Validate a record without touching ingestion state.
    pub fn validate(&self, raw: &RawTick) -> Result<Tick, ValidationError> {
        let ts_ms = raw.ts_ms.ok_or(ValidationError::MissingField("ts_ms"))?;
        if !(0..=MAX_TIMESTAMP_MS).contains(&ts_ms) {
            return Err(ValidationError::TimestampOutOfRange {
                ts_ms,
                max_ts_ms: MAX_TIMESTAMP_MS,
            });
        }

        let bid_px = finite_or_zero(raw.bid_px, "bid_px")?;
        let ask_px = finite_or_zero(raw.ask_px, "ask_px")?;
        let bid_sz = non_negative(finite_or_zero(raw.bid_sz, "bid_sz")?, "bid_sz")?;
        let ask_sz = non_negative(finite_or_zero(raw.ask_sz, "ask_sz")?, "ask_sz")?;
        if bid_px < 0.0 {
            return Err(ValidationError::Negative { field: "bid_px", value: bid_px });
        }
        if ask_px < 0.0 {
            return Err(ValidationError::Negative { field: "ask_px", value: ask_px });
        }
        if bid_px > 0.0 && ask_px > 0.0 && bid_px > ask_px {
            return Err(ValidationError::CrossedQuote { bid: bid_px, ask: ask_px });
        }

        let price = match raw.price {
            Some(price) => {
                if !price.is_finite() {
                    return Err(ValidationError::NonFinite("price"));
                }
                price
            }
            None if self.config.price_optional && bid_px > 0.0 && ask_px > 0.0 => {
                (bid_px + ask_px) / 2.0
            }
            None => return Err(ValidationError::MissingField("price")),
        };
        if price <= 0.0 {
            return Err(ValidationError::NonPositivePrice(price));
        }

        let volume = match raw.volume {
            Some(volume) => {
                if !volume.is_finite() {
                    return Err(ValidationError::NonFinite("volume"));
                }
                non_negative(volume, "volume")?
            }
            None if self.config.volume_optional => 0.0,
            None => return Err(ValidationError::MissingField("volume")),
        };

        let side = match raw.side {
            Some(side) => side,
            None if self.config.side_optional => Side::Unknown,
            None => return Err(ValidationError::MissingField("side")),
        };

        Ok(Tick {
            ts_ms,
            seq: 0,
            price,
            volume,
            side,
            bid_px,
            bid_sz,
            ask_px,
            ask_sz,
        })
    }

    /// Classifier used by `ingest_one`.
    pub fn classifier(&self) -> &SideClassifier {
        &self.classifier
    }

    /// Forget streaming state and sequence numbering.
    pub fn reset(&mut self) {
        self.classifier.clear();
        self.next_seq = 0;
        self.last_ts_ms = None;
    }
}

/// Side of an accepted tick. Inference fills in unknown sides; otherwise the
/// reported side is kept and only counted.
fn resolve_side(infer: bool, classifier: &mut SideClassifier, tick: &Tick) -> Side {
    if infer {
        classifier.classify(tick)
    } else {
        classifier.observe(tick);
        tick.side
    }
}

fn finite_or_zero(value: Option<f64>, field: &'static str) -> Result<f64, ValidationError> {
    match value {
        Some(v) if !v.is_finite() => Err(ValidationError::NonFinite(field)),
        Some(v) => Ok(v),
        None => Ok(0.0),
    }
}

fn non_negative(value: f64, field: &'static str) -> Result<f64, ValidationError> {
    if value < 0.0 {
        Err(ValidationError::Negative { field, value })
    } else {
        Ok(value)
    }
}
