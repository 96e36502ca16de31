//! Aggressor side inference using bid/ask alignment.
//!
//! Ticks that arrive without a side are classified as buy-initiated or
//! sell-initiated from their price relative to the prevailing quote, with an
//! optional tick-rule fallback for prints inside the spread.

use flowdash_core::{Side, Tick};
use serde::Serialize;

/// Statistics about side classification quality.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassificationStats {
    /// Total ticks seen.
    pub total_ticks: u64,
    /// Ticks that arrived with a side.
    pub reported_ticks: u64,
    /// Ticks whose side was inferred from the quote.
    pub quote_inferred: u64,
    /// Ticks whose side was inferred by the tick rule.
    pub tick_rule_inferred: u64,
    /// Ticks left unknown.
    pub unknown_ticks: u64,
    /// Total volume processed.
    pub total_volume: f64,
    /// Volume left unknown.
    pub unknown_volume: f64,
}

impl ClassificationStats {
    /// Fraction of volume whose side is still unknown.
    pub fn unknown_frac(&self) -> f64 {
        if self.total_volume > 0.0 {
            self.unknown_volume / self.total_volume
        } else {
            0.0
        }
    }

    /// Reset statistics.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Side classifier with tick-rule memory.
pub struct SideClassifier {
    /// Whether to use tick rule fallback for ambiguous prints.
    use_tick_rule: bool,
    /// Last trade price (for tick rule).
    last_price: Option<f64>,
    /// Last known side (for zero-tick continuation).
    last_side: Side,
    /// Classification statistics.
    stats: ClassificationStats,
}

impl SideClassifier {
    /// Create a new classifier.
    pub fn new(use_tick_rule: bool) -> Self {
        Self {
            use_tick_rule,
            last_price: None,
            last_side: Side::Unknown,
            stats: ClassificationStats::default(),
        }
    }

    /// Side of a tick: the reported side when known, otherwise inferred.
    pub fn classify(&mut self, tick: &Tick) -> Side {
        self.stats.total_ticks += 1;
        self.stats.total_volume += tick.volume;

        let side = if tick.side != Side::Unknown {
            self.stats.reported_ticks += 1;
            tick.side
        } else {
            let by_quote = Self::quote_side(tick);
            if by_quote != Side::Unknown {
                self.stats.quote_inferred += 1;
                by_quote
            } else {
                let by_tick = self.tick_rule(tick.price);
                if by_tick != Side::Unknown {
                    self.stats.tick_rule_inferred += 1;
                }
                by_tick
            }
        };

        if side == Side::Unknown {
            self.stats.unknown_ticks += 1;
            self.stats.unknown_volume += tick.volume;
        }

        self.remember(tick.price, side);
        side
    }

    /// Track price and side without classifying.
    pub fn observe(&mut self, tick: &Tick) {
        self.remember(tick.price, tick.side);
    }

    /// Classify against the tick's own quote.
    fn quote_side(tick: &Tick) -> Side {
        if !tick.has_quote() {
            return Side::Unknown;
        }
        if tick.price >= tick.ask_px {
            Side::Buy
        } else if tick.price <= tick.bid_px {
            Side::Sell
        } else {
            Side::Unknown
        }
    }

    /// Uptick buys, downtick sells, zero tick continues the last side.
    fn tick_rule(&self, price: f64) -> Side {
        if !self.use_tick_rule {
            return Side::Unknown;
        }
        match self.last_price {
            Some(last) if price > last => Side::Buy,
            Some(last) if price < last => Side::Sell,
            Some(_) => self.last_side,
            None => Side::Unknown,
        }
    }

    fn remember(&mut self, price: f64, side: Side) {
        self.last_price = Some(price);
        if side != Side::Unknown {
            self.last_side = side;
        }
    }

    /// Get classification statistics.
    pub fn stats(&self) -> &ClassificationStats {
        &self.stats
    }

    /// Clear all state (statistics, last trade info).
    pub fn clear(&mut self) {
        self.last_price = None;
        self.last_side = Side::Unknown;
        self.stats.reset();
    }
}
