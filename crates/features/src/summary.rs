//! Headline flow summary and top-of-book view.

use flowdash_core::{BookPressure, BookSnapshot, FlowSummary, Side, Tick};

/// Book view from one tick's resting sizes.
pub fn book_snapshot(tick: &Tick, pressure_band: f64) -> BookSnapshot {
    let excess_offer = tick.ask_sz - tick.bid_sz;
    let pressure = if excess_offer > pressure_band {
        BookPressure::BearishPressure
    } else if -excess_offer > pressure_band {
        BookPressure::Bullish
    } else {
        BookPressure::Neutral
    };

    BookSnapshot {
        bid_sz: tick.bid_sz,
        ask_sz: tick.ask_sz,
        imbalance: tick.book_imbalance(),
        offer_bid_ratio: tick.ask_sz / (tick.bid_sz + 1.0),
        pressure,
    }
}

/// Percentage change of `last` against `reference`; zero without a usable reference.
pub fn change_pct(last: f64, reference: f64) -> f64 {
    if reference > 0.0 {
        (last - reference) / reference * 100.0
    } else {
        0.0
    }
}

/// Streaming summary builder.
#[derive(Debug, Clone, Default)]
pub struct SummaryBuilder {
    open: Option<f64>,
    last: f64,
    buy_volume: f64,
    sell_volume: f64,
    volume: f64,
    notional: f64,
    trade_count: u64,
    last_book: Option<Tick>,
}

impl SummaryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tick.
    pub fn add_tick(&mut self, tick: &Tick) {
        self.open.get_or_insert(tick.price);
        self.last = tick.price;

        if tick.volume > 0.0 {
            self.trade_count += 1;
            self.volume += tick.volume;
            self.notional += tick.price * tick.volume;
            match tick.side {
                Side::Buy => self.buy_volume += tick.volume,
                Side::Sell => self.sell_volume += tick.volume,
                Side::Unknown => {}
            }
        }

        if tick.bid_sz > 0.0 || tick.ask_sz > 0.0 {
            self.last_book = Some(tick.clone());
        }
    }

    /// Build the summary. `None` until a tick has been seen.
    ///
    /// The change is measured against `reference_price` when given, else
    /// against the first price.
    pub fn summary(&self, reference_price: Option<f64>, pressure_band: f64) -> Option<FlowSummary> {
        let open = self.open?;
        let vwap = (self.volume > 0.0).then(|| self.notional / self.volume);

        Some(FlowSummary {
            open,
            last: self.last,
            change_pct: change_pct(self.last, reference_price.unwrap_or(open)),
            buy_volume: self.buy_volume,
            sell_volume: self.sell_volume,
            net_flow: self.buy_volume - self.sell_volume,
            vwap,
            trade_count: self.trade_count,
            book: self
                .last_book
                .as_ref()
                .map(|tick| book_snapshot(tick, pressure_band)),
        })
    }

    /// Clear all state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_tick(price: f64, volume: f64, side: Side) -> Tick {
        Tick {
            ts_ms: 0,
            seq: 0,
            price,
            volume,
            side,
            bid_px: 0.0,
            bid_sz: 0.0,
            ask_px: 0.0,
            ask_sz: 0.0,
        }
    }

    fn with_book(mut tick: Tick, bid_sz: f64, ask_sz: f64) -> Tick {
        tick.bid_px = tick.price - 0.1;
        tick.ask_px = tick.price + 0.1;
        tick.bid_sz = bid_sz;
        tick.ask_sz = ask_sz;
        tick
    }

    #[test]
    fn test_bearish_book() {
        // S50Z25 dashboard book: bid 20000, offer 50000
        let tick = with_book(make_tick(814.0, 0.0, Side::Unknown), 20_000.0, 50_000.0);
        let book = book_snapshot(&tick, 1_000.0);

        assert_eq!(book.pressure, BookPressure::BearishPressure);
        assert_relative_eq!(book.offer_bid_ratio, 50_000.0 / 20_001.0);
        assert_relative_eq!(book.imbalance, -30_000.0 / 70_000.0);
    }

    #[test]
    fn test_pressure_band() {
        let tick = with_book(make_tick(842.1, 0.0, Side::Unknown), 18_000.0, 18_500.0);
        assert_eq!(book_snapshot(&tick, 1_000.0).pressure, BookPressure::Neutral);
        assert_eq!(
            book_snapshot(&tick, 0.0).pressure,
            BookPressure::BearishPressure
        );

        let tick = with_book(make_tick(842.1, 0.0, Side::Unknown), 22_000.0, 18_000.0);
        assert_eq!(book_snapshot(&tick, 1_000.0).pressure, BookPressure::Bullish);
    }

    #[test]
    fn test_summary() {
        let mut builder = SummaryBuilder::new();
        builder.add_tick(&make_tick(815.0, 300.0, Side::Sell));
        builder.add_tick(&make_tick(814.5, 200.0, Side::Buy));
        builder.add_tick(&with_book(make_tick(814.0, 0.0, Side::Unknown), 20_000.0, 50_000.0));

        let summary = builder.summary(None, 0.0).unwrap();
        assert_relative_eq!(summary.open, 815.0);
        assert_relative_eq!(summary.last, 814.0);
        assert_relative_eq!(summary.net_flow, -100.0);
        assert_eq!(summary.trade_count, 2);
        assert_relative_eq!(
            summary.vwap.unwrap(),
            (815.0 * 300.0 + 814.5 * 200.0) / 500.0
        );
        assert_relative_eq!(summary.change_pct, (814.0 - 815.0) / 815.0 * 100.0);
        assert_eq!(summary.book.unwrap().bid_sz, 20_000.0);
    }

    #[test]
    fn test_reference_price() {
        let mut builder = SummaryBuilder::new();
        builder.add_tick(&make_tick(814.0, 1.0, Side::Buy));
        let summary = builder.summary(Some(824.88), 0.0).unwrap();
        assert_relative_eq!(summary.change_pct, -1.319, epsilon = 1e-3);
    }

    #[test]
    fn test_empty() {
        let builder = SummaryBuilder::new();
        assert!(builder.summary(None, 0.0).is_none());
    }

    #[test]
    fn test_quote_only_batch_has_no_vwap() {
        let mut builder = SummaryBuilder::new();
        builder.add_tick(&make_tick(814.0, 0.0, Side::Unknown));
        let summary = builder.summary(None, 0.0).unwrap();
        assert!(summary.vwap.is_none());
        assert_eq!(summary.trade_count, 0);
        assert!(summary.book.is_none());
    }
}
