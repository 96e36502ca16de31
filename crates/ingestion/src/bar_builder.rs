//! Interval bar building from ticks.
//!
//! Builds dense OHLCV bars with buy/sell volume split, one per sampling
//! interval. Intervals without trades repeat the previous close with zero
//! volume so downstream rolling windows see every interval.

use flowdash_core::{interval_end, IntervalBar, Side, Tick, TimestampMs};

/// A bar that's currently being built.
#[derive(Debug, Clone)]
struct BarInProgress {
    ts_end: TimestampMs,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    buy_volume: f64,
    sell_volume: f64,
    vwap_numerator: f64,
    trade_count: u32,
}

impl BarInProgress {
    fn new(ts_end: TimestampMs, price: f64) -> Self {
        Self {
            ts_end,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0.0,
            buy_volume: 0.0,
            sell_volume: 0.0,
            vwap_numerator: 0.0,
            trade_count: 0,
        }
    }

    fn add_tick(&mut self, tick: &Tick) {
        self.high = self.high.max(tick.price);
        self.low = self.low.min(tick.price);
        self.close = tick.price;
        if tick.volume > 0.0 {
            self.volume += tick.volume;
            self.vwap_numerator += tick.price * tick.volume;
            self.trade_count += 1;
            match tick.side {
                Side::Buy => self.buy_volume += tick.volume,
                Side::Sell => self.sell_volume += tick.volume,
                Side::Unknown => {}
            }
        }
    }

    fn to_bar(&self) -> IntervalBar {
        let vwap = if self.volume > 0.0 {
            Some(self.vwap_numerator / self.volume)
        } else {
            None
        };

        IntervalBar {
            ts_end: self.ts_end,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            buy_volume: self.buy_volume,
            sell_volume: self.sell_volume,
            vwap,
            trade_count: self.trade_count,
        }
    }
}

/// Builder for interval bars from ordered ticks.
pub struct BarBuilder {
    /// Interval length in milliseconds.
    interval_ms: i64,
    /// Bar currently being built.
    current: Option<BarInProgress>,
    /// Completed bars not yet drained.
    completed: Vec<IntervalBar>,
}

impl BarBuilder {
    /// Create a new bar builder.
    pub fn new(interval_ms: i64) -> Self {
        Self {
            interval_ms,
            current: None,
            completed: Vec::new(),
        }
    }

    /// Add a tick. Ticks must arrive in timestamp order.
    pub fn add_tick(&mut self, tick: &Tick) {
        let ts_end = interval_end(tick.ts_ms, self.interval_ms);

        if let Some(bar) = self.current.as_mut() {
            if bar.ts_end == ts_end {
                bar.add_tick(tick);
                return;
            }
        }

        if let Some(finished) = self.current.take() {
            let last_close = finished.close;
            let mut gap_end = finished.ts_end + self.interval_ms;
            self.completed.push(finished.to_bar());

            // Empty intervals carry the close forward
            while gap_end < ts_end {
                self.completed.push(BarInProgress::new(gap_end, last_close).to_bar());
                gap_end += self.interval_ms;
            }
        }

        let mut bar = BarInProgress::new(ts_end, tick.price);
        bar.add_tick(tick);
        self.current = Some(bar);
    }

    /// Take bars completed so far.
    pub fn drain_completed(&mut self) -> Vec<IntervalBar> {
        std::mem::take(&mut self.completed)
    }

    /// Force finalize the bar in progress.
    pub fn flush(&mut self) -> Option<IntervalBar> {
        self.current.take().map(|bar| bar.to_bar())
    }

    /// Build all bars for an ordered tick slice.
    pub fn build(ticks: &[Tick], interval_ms: i64) -> Vec<IntervalBar> {
        let mut builder = Self::new(interval_ms);
        for tick in ticks {
            builder.add_tick(tick);
        }
        let mut bars = builder.drain_completed();
        bars.extend(builder.flush());
        bars
    }

    /// Whether a bar is in progress.
    pub fn has_pending(&self) -> bool {
        self.current.is_some()
    }

    /// Clear all state.
    pub fn clear(&mut self) {
        self.current = None;
        self.completed.clear();
    }
}
