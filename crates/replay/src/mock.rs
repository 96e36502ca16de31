//! Mock feed for the SET50 index futures dashboard contracts.
//!
//! Four trade prints per contract across the trading day, followed by a
//! closing quote carrying the snapshot price and resting book sizes.

use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveDate, TimeZone};
use clap::ValueEnum;
use flowdash_core::{RawTick, Side, TimestampMs};

/// Bangkok is UTC+7 all year.
pub const BANGKOK_UTC_OFFSET_SECS: i32 = 7 * 3600;

/// Trading day the mock prints are stamped on.
const MOCK_DATE: (i32, u32, u32) = (2025, 10, 1);

/// Quote half-spread around each print.
const HALF_SPREAD: f64 = 0.1;

/// Time of the closing quote.
const CLOSE_QUOTE_AT: (u32, u32) = (16, 30);

/// A mock contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MockContract {
    #[value(name = "S50Z25")]
    S50Z25,
    #[value(name = "S50H26")]
    S50H26,
    #[value(name = "S50M26")]
    S50M26,
}

/// Snapshot line shown on the dashboard.
#[derive(Debug, Clone, Copy)]
struct Snapshot {
    price: f64,
    change_pct: f64,
    bid_sz: f64,
    ask_sz: f64,
}

/// (hour, minute, price, volume, side)
type Print = (u32, u32, f64, f64, Side);

const S50Z25_PRINTS: [Print; 4] = [
    (9, 45, 814.2, 300.0, Side::Sell),
    (11, 15, 814.6, 200.0, Side::Buy),
    (15, 45, 814.0, 500.0, Side::Sell),
    (16, 5, 814.8, 400.0, Side::Buy),
];

const S50H26_PRINTS: [Print; 4] = [
    (9, 30, 841.8, 150.0, Side::Buy),
    (13, 20, 842.2, 250.0, Side::Buy),
    (15, 50, 842.0, 100.0, Side::Sell),
    (16, 10, 842.5, 300.0, Side::Buy),
];

const S50M26_PRINTS: [Print; 4] = [
    (9, 50, 799.0, 400.0, Side::Sell),
    (14, 10, 798.5, 300.0, Side::Sell),
    (15, 40, 798.8, 200.0, Side::Buy),
    (16, 20, 799.2, 250.0, Side::Buy),
];

impl MockContract {
    pub const ALL: [MockContract; 3] = [Self::S50Z25, Self::S50H26, Self::S50M26];

    /// Contract symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::S50Z25 => "S50Z25",
            Self::S50H26 => "S50H26",
            Self::S50M26 => "S50M26",
        }
    }

    fn snapshot(self) -> Snapshot {
        match self {
            Self::S50Z25 => Snapshot {
                price: 814.0,
                change_pct: -1.32,
                bid_sz: 20_000.0,
                ask_sz: 50_000.0,
            },
            Self::S50H26 => Snapshot {
                price: 842.1,
                change_pct: 0.45,
                bid_sz: 18_000.0,
                ask_sz: 22_000.0,
            },
            Self::S50M26 => Snapshot {
                price: 798.75,
                change_pct: -0.62,
                bid_sz: 15_000.0,
                ask_sz: 30_000.0,
            },
        }
    }

    fn prints(self) -> &'static [Print] {
        match self {
            Self::S50Z25 => &S50Z25_PRINTS,
            Self::S50H26 => &S50H26_PRINTS,
            Self::S50M26 => &S50M26_PRINTS,
        }
    }

    /// Last price on the snapshot.
    pub fn last_price(self) -> f64 {
        self.snapshot().price
    }

    /// Previous settlement implied by the snapshot's percentage change.
    pub fn reference_price(self) -> f64 {
        let snapshot = self.snapshot();
        snapshot.price / (1.0 + snapshot.change_pct / 100.0)
    }

    /// Raw records for the mock trading day.
    pub fn raw_ticks(self) -> Result<Vec<RawTick>> {
        let snapshot = self.snapshot();
        let mut ticks = Vec::with_capacity(self.prints().len() + 1);

        for &(hour, minute, price, volume, side) in self.prints() {
            ticks.push(
                RawTick::trade(bangkok_ts(hour, minute)?, price, volume, side).with_quote(
                    price - HALF_SPREAD,
                    snapshot.bid_sz,
                    price + HALF_SPREAD,
                    snapshot.ask_sz,
                ),
            );
        }

        let (hour, minute) = CLOSE_QUOTE_AT;
        ticks.push(
            RawTick::trade(bangkok_ts(hour, minute)?, snapshot.price, 0.0, Side::Unknown)
                .with_quote(
                    snapshot.price - HALF_SPREAD,
                    snapshot.bid_sz,
                    snapshot.price + HALF_SPREAD,
                    snapshot.ask_sz,
                ),
        );
        Ok(ticks)
    }
}

/// UTC milliseconds for a Bangkok wall-clock time on the mock trading day.
pub fn bangkok_ts(hour: u32, minute: u32) -> Result<TimestampMs> {
    let (year, month, day) = MOCK_DATE;
    let offset =
        FixedOffset::east_opt(BANGKOK_UTC_OFFSET_SECS).context("invalid Bangkok offset")?;
    let local = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .with_context(|| format!("invalid mock time {hour:02}:{minute:02}"))?;
    let ts = offset
        .from_local_datetime(&local)
        .single()
        .with_context(|| format!("ambiguous mock time {hour:02}:{minute:02}"))?;
    Ok(ts.timestamp_millis())
}
