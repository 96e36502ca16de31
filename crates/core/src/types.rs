//! Core data types for the flowdash analytics engine.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Timestamp in milliseconds since Unix epoch (UTC).
pub type TimestampMs = i64;

/// Price type with ordering support.
pub type Price = OrderedFloat<f64>;

/// Volume/quantity type.
pub type Size = f64;

/// Milliseconds in one calendar day.
pub const MS_PER_DAY: i64 = 86_400_000;

/// Latest accepted tick timestamp, 9999-12-31T23:59:59.999Z.
pub const MAX_TIMESTAMP_MS: TimestampMs = 253_402_300_799_999;

/// End of the sampling interval containing `ts_ms`.
///
/// Intervals are right-closed, `(end - interval, end]`, with boundaries at
/// multiples of `interval_ms` since epoch. A timestamp exactly on a boundary
/// belongs to the interval ending there. Saturates at `i64::MAX`.
#[inline]
pub fn interval_end(ts_ms: TimestampMs, interval_ms: i64) -> TimestampMs {
    let floor = ts_ms.div_euclid(interval_ms) * interval_ms;
    if ts_ms.rem_euclid(interval_ms) == 0 {
        floor
    } else {
        floor.checked_add(interval_ms).unwrap_or(TimestampMs::MAX)
    }
}

/// Normalised pressure difference `(bid - ask) / (bid + ask)`.
///
/// Returns 0 when both sides are empty so consumers never see NaN.
#[inline]
pub fn imbalance_ratio(bid: f64, ask: f64) -> f64 {
    let total = bid + ask;
    if total > 0.0 {
        ((bid - ask) / total).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Aggressor side of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i8)]
pub enum Side {
    /// Buyer-initiated (lifted the offer).
    #[serde(alias = "Buy", alias = "BUY", alias = "Aggressive Buy")]
    Buy = 1,
    /// Seller-initiated (hit the bid).
    #[serde(alias = "Sell", alias = "SELL", alias = "Aggressive Sell")]
    Sell = -1,
    /// Aggressor not known.
    #[serde(alias = "Unknown", alias = "UNKNOWN")]
    Unknown = 0,
}

impl Side {
    /// Get the sign as i8.
    #[inline]
    pub fn sign(self) -> i8 {
        self as i8
    }

    /// Get the sign as f64.
    #[inline]
    pub fn sign_f64(self) -> f64 {
        self.sign() as f64
    }
}

/// A raw trade/quote record as supplied by a market-data collaborator.
///
/// Every field is optional; the ingestor decides what is acceptable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTick {
    #[serde(alias = "timestamp")]
    pub ts_ms: Option<TimestampMs>,
    pub price: Option<f64>,
    #[serde(alias = "size")]
    pub volume: Option<Size>,
    #[serde(alias = "type")]
    pub side: Option<Side>,
    #[serde(alias = "bid_price")]
    pub bid_px: Option<f64>,
    #[serde(alias = "bid_volume")]
    pub bid_sz: Option<Size>,
    #[serde(alias = "ask_price")]
    pub ask_px: Option<f64>,
    #[serde(alias = "ask_volume")]
    pub ask_sz: Option<Size>,
}

impl RawTick {
    /// A trade print with a known side and no quote.
    pub fn trade(ts_ms: TimestampMs, price: f64, volume: Size, side: Side) -> Self {
        Self {
            ts_ms: Some(ts_ms),
            price: Some(price),
            volume: Some(volume),
            side: Some(side),
            ..Self::default()
        }
    }

    /// Attach a top-of-book quote.
    pub fn with_quote(mut self, bid_px: f64, bid_sz: Size, ask_px: f64, ask_sz: Size) -> Self {
        self.bid_px = Some(bid_px);
        self.bid_sz = Some(bid_sz);
        self.ask_px = Some(ask_px);
        self.ask_sz = Some(ask_sz);
        self
    }
}

/// A validated tick. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Timestamp in milliseconds.
    pub ts_ms: TimestampMs,
    /// Ingestion sequence number, breaks timestamp ties.
    pub seq: u64,
    /// Trade price.
    pub price: f64,
    /// Traded volume (zero for quote-only updates).
    pub volume: Size,
    /// Aggressor side.
    pub side: Side,
    /// Best bid price (0 when absent).
    pub bid_px: f64,
    /// Best bid size.
    pub bid_sz: Size,
    /// Best ask price (0 when absent).
    pub ask_px: f64,
    /// Best ask size.
    pub ask_sz: Size,
}

impl Tick {
    /// Signed volume: positive for buys, negative for sells, zero otherwise.
    #[inline]
    pub fn signed_volume(&self) -> f64 {
        self.volume * self.side.sign_f64()
    }

    /// Whether the tick carries a two-sided quote.
    #[inline]
    pub fn has_quote(&self) -> bool {
        self.bid_px > 0.0 && self.ask_px > 0.0
    }

    /// Quote mid price.
    #[inline]
    pub fn mid(&self) -> f64 {
        (self.bid_px + self.ask_px) / 2.0
    }

    /// Quote spread.
    #[inline]
    pub fn spread(&self) -> f64 {
        self.ask_px - self.bid_px
    }

    /// Resting book imbalance: (bid_sz - ask_sz) / (bid_sz + ask_sz).
    #[inline]
    pub fn book_imbalance(&self) -> f64 {
        imbalance_ratio(self.bid_sz, self.ask_sz)
    }

    /// Sort key: timestamp, then ingestion order.
    #[inline]
    pub fn order_key(&self) -> (TimestampMs, u64) {
        (self.ts_ms, self.seq)
    }
}

/// Bid/offer pressure sampled at an interval boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImbalanceSnapshot {
    /// Interval boundary (end of interval).
    pub ts_ms: TimestampMs,
    /// Buyer-initiated volume.
    pub bid_pressure: f64,
    /// Seller-initiated volume.
    pub ask_pressure: f64,
    /// (bid - ask) / (bid + ask), 0 when both are 0.
    pub imbalance_ratio: f64,
    /// Buy volume traded inside this interval alone.
    pub interval_buy_volume: f64,
    /// Sell volume traded inside this interval alone.
    pub interval_sell_volume: f64,
}

/// Net flow accumulated inside one session window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFlow {
    /// Window name.
    pub window: String,
    /// Buyer-initiated volume.
    pub buy_volume: f64,
    /// Seller-initiated volume.
    pub sell_volume: f64,
    /// Signed volume (buy positive, sell negative).
    pub net_volume: f64,
    /// Buy trades minus sell trades.
    pub net_trades: i64,
    /// All trades assigned to the window.
    pub trade_count: u64,
}

impl SessionFlow {
    /// Empty flow for a window.
    pub fn empty(window: impl Into<String>) -> Self {
        Self {
            window: window.into(),
            buy_volume: 0.0,
            sell_volume: 0.0,
            net_volume: 0.0,
            net_trades: 0,
            trade_count: 0,
        }
    }
}

/// One sampling interval of price and flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalBar {
    /// Interval end timestamp.
    pub ts_end: TimestampMs,
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
    /// Total volume.
    pub volume: Size,
    /// Buyer-initiated volume.
    pub buy_volume: Size,
    /// Seller-initiated volume.
    pub sell_volume: Size,
    /// VWAP, absent for empty intervals.
    pub vwap: Option<f64>,
    /// Number of trades.
    pub trade_count: u32,
}

impl IntervalBar {
    /// Net signed flow of the interval.
    #[inline]
    pub fn net_flow(&self) -> f64 {
        self.buy_volume - self.sell_volume
    }

    /// Whether the interval saw no trades.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trade_count == 0
    }
}

/// Swing point kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwingKind {
    High,
    Low,
}

/// A confirmed local extremum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    /// Timestamp of the extremum.
    pub ts_ms: TimestampMs,
    /// Position in the price series.
    pub index: usize,
    /// Extremum price.
    pub price: f64,
    /// High or low.
    pub kind: SwingKind,
}

/// Direction of the move a retracement is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwingDirection {
    /// Low then high.
    Up,
    /// High then low.
    Down,
}

/// A Fibonacci retracement price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetracementLevel {
    /// Ratio of the swing range (e.g. 0.618).
    pub ratio: f64,
    /// Level price.
    pub price: f64,
}

/// Retracement levels derived from one swing high/low pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetracementSet {
    pub high: SwingPoint,
    pub low: SwingPoint,
    pub direction: SwingDirection,
    pub levels: Vec<RetracementLevel>,
}

impl RetracementSet {
    /// Swing range (high - low).
    pub fn range(&self) -> f64 {
        self.high.price - self.low.price
    }

    /// Level price for a ratio, if computed.
    pub fn level(&self, ratio: f64) -> Option<f64> {
        self.levels
            .iter()
            .find(|l| (l.ratio - ratio).abs() < 1e-12)
            .map(|l| l.price)
    }

    /// Whether this set still belongs to the latest swing pair.
    pub fn is_current(&self, swings: &[SwingPoint]) -> bool {
        match swings {
            [.., a, b] => {
                let (first, second) = match self.direction {
                    SwingDirection::Up => (&self.low, &self.high),
                    SwingDirection::Down => (&self.high, &self.low),
                };
                a == first && b == second
            }
            _ => false,
        }
    }
}

/// Sentiment alert kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    /// Sustained net selling.
    HeavySelling,
    /// Net selling with a volume spike.
    Panic,
    /// Net flow reversed after a selling alert.
    Rebound,
    /// Close below the alert price while selling dominates.
    PricePanic,
}

/// Overall market verdict for a batch. Checks run in declaration order and
/// the first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketSignal {
    /// Price below the alert price with sell volume dominating.
    PricePanic,
    /// Net flow below the configured threshold.
    NetFlowBelowThreshold,
    /// Light selling with price holding above the easing level.
    SellingEasing,
    /// Net buying with price above the reversal level.
    Reversal,
    Stable,
}

/// A classified market-condition signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentAlert {
    /// Interval end the alert fired on.
    pub ts_ms: TimestampMs,
    pub kind: AlertKind,
    /// Magnitude relative to the rule's threshold.
    pub severity: f64,
}

/// Resting-book pressure label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookPressure {
    /// Bids outweigh offers beyond the band.
    Bullish,
    /// Within the band.
    Neutral,
    /// Offers outweigh bids beyond the band.
    BearishPressure,
}

/// Latest top-of-book liquidity view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub bid_sz: Size,
    pub ask_sz: Size,
    /// (bid - ask) / (bid + ask).
    pub imbalance: f64,
    /// ask / (bid + 1).
    pub offer_bid_ratio: f64,
    pub pressure: BookPressure,
}

/// Headline numbers for a tick batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSummary {
    pub open: f64,
    pub last: f64,
    /// Percentage change of last versus the reference price.
    pub change_pct: f64,
    pub buy_volume: Size,
    pub sell_volume: Size,
    pub net_flow: f64,
    pub vwap: Option<f64>,
    pub trade_count: u64,
    pub book: Option<BookSnapshot>,
}
