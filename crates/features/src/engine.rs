//! Flow analytics engine.
//!
//! Combines all flow components into a unified interface. Ticks go in one at
//! a time; every accumulator is a fold, so streaming and batch runs agree.

use crate::{
    imbalance::ImbalanceAccumulator,
    sentiment::SentimentMachine,
    session::{SessionFlowAggregator, SessionFlowTable, SessionTable},
    signal::SignalRules,
    summary::SummaryBuilder,
    swing::{PricePoint, SwingDetector},
};
use flowdash_core::{
    config::PriceSource, Config, FlowSummary, ImbalanceSnapshot, IntervalBar, MarketSignal, Result,
    RetracementSet, SentimentAlert, SwingPoint, Tick,
};
use flowdash_ingestion::BarBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Something a tick completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum FlowEvent {
    /// Pressure sampled at an interval boundary.
    Imbalance(ImbalanceSnapshot),
    /// Interval closed.
    Bar(IntervalBar),
    /// Swing accepted or replaced.
    Swing(SwingPoint),
    /// Retracement levels recomputed after a swing.
    Retracement(RetracementSet),
    /// Sentiment alert raised.
    Alert(SentimentAlert),
}

/// Everything computed over one tick batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowReport {
    pub symbol: String,
    pub snapshots: Vec<ImbalanceSnapshot>,
    pub sessions: SessionFlowTable,
    pub bars: Vec<IntervalBar>,
    pub swings: Vec<SwingPoint>,
    pub retracement: Option<RetracementSet>,
    pub alerts: Vec<SentimentAlert>,
    /// Absent when no ticks were seen.
    pub summary: Option<FlowSummary>,
    /// Verdict over the whole batch, absent when no ticks were seen.
    pub signal: Option<MarketSignal>,
}

/// Flow analytics engine.
pub struct FlowEngine {
    symbol: String,
    imbalance: ImbalanceAccumulator,
    sessions: SessionFlowAggregator,
    bar_builder: BarBuilder,
    swings: SwingDetector,
    sentiment: SentimentMachine,
    summary: SummaryBuilder,
    signal: SignalRules,
    price_source: PriceSource,
    reference_price: Option<f64>,
    pressure_band: f64,
    /// Completed outputs.
    snapshots: Vec<ImbalanceSnapshot>,
    bars: Vec<IntervalBar>,
    tick_count: u64,
}

impl FlowEngine {
    /// Create a new engine. Fails on invalid configuration before any tick
    /// is processed.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let table = SessionTable::new(&config.session)?;
        let interval_ms = config.imbalance.interval_ms();

        info!(
            symbol = %config.instrument.symbol,
            interval_seconds = config.imbalance.interval_seconds,
            mode = ?config.imbalance.mode,
            sessions = table.windows().len(),
            lookback = config.swing.lookback,
            "flow engine ready"
        );

        Ok(Self {
            symbol: config.instrument.symbol.clone(),
            imbalance: ImbalanceAccumulator::new(interval_ms, config.imbalance.mode),
            sessions: SessionFlowAggregator::new(table),
            bar_builder: BarBuilder::new(interval_ms),
            swings: SwingDetector::new(&config.swing),
            sentiment: SentimentMachine::new(&config.sentiment),
            summary: SummaryBuilder::new(),
            signal: SignalRules::new(&config.sentiment, &config.signal),
            price_source: config.swing.price_source,
            reference_price: config.instrument.reference_price,
            pressure_band: config.book.pressure_band,
            snapshots: Vec::new(),
            bars: Vec::new(),
            tick_count: 0,
        })
    }

    /// Process one tick. Ticks must arrive in timestamp order.
    pub fn push(&mut self, tick: &Tick) -> Vec<FlowEvent> {
        let mut events = Vec::new();
        self.tick_count += 1;

        for snapshot in self.imbalance.push(tick) {
            self.snapshots.push(snapshot.clone());
            events.push(FlowEvent::Imbalance(snapshot));
        }

        self.sessions.add_tick(tick);
        self.summary.add_tick(tick);

        if self.price_source == PriceSource::Ticks {
            self.push_price(
                PricePoint {
                    ts_ms: tick.ts_ms,
                    price: tick.price,
                },
                &mut events,
            );
        }

        self.bar_builder.add_tick(tick);
        for bar in self.bar_builder.drain_completed() {
            self.on_bar(bar, &mut events);
        }

        events
    }

    /// Process multiple ticks.
    pub fn push_all(&mut self, ticks: &[Tick]) -> Vec<FlowEvent> {
        ticks.iter().flat_map(|tick| self.push(tick)).collect()
    }

    fn on_bar(&mut self, bar: IntervalBar, events: &mut Vec<FlowEvent>) {
        if self.price_source == PriceSource::IntervalClose {
            self.push_price(
                PricePoint {
                    ts_ms: bar.ts_end,
                    price: bar.close,
                },
                events,
            );
        }

        let alerts = self.sentiment.on_bar(&bar);
        self.bars.push(bar.clone());
        events.push(FlowEvent::Bar(bar));
        events.extend(alerts.into_iter().map(FlowEvent::Alert));
    }

    fn push_price(&mut self, point: PricePoint, events: &mut Vec<FlowEvent>) {
        let Some(swing) = self.swings.push(point).cloned() else {
            return;
        };
        debug!(ts_ms = swing.ts_ms, price = swing.price, kind = ?swing.kind, "swing");
        events.push(FlowEvent::Swing(swing));
        if self.swings.is_pinned() {
            return;
        }
        if let Some(retracement) = self.swings.retracement() {
            events.push(FlowEvent::Retracement(retracement.clone()));
        }
    }

    /// Current state without closing the interval in progress.
    pub fn current_snapshot(&self) -> Option<ImbalanceSnapshot> {
        self.imbalance.current()
    }

    /// Get the number of ticks processed.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Close the interval in progress and build the report.
    pub fn finish(mut self) -> FlowReport {
        let mut events = Vec::new();
        if let Some(snapshot) = self.imbalance.flush() {
            self.snapshots.push(snapshot);
        }
        if let Some(bar) = self.bar_builder.flush() {
            self.on_bar(bar, &mut events);
        }

        let analysis = self.swings.analysis();
        let summary = self.summary.summary(self.reference_price, self.pressure_band);
        let signal = summary
            .as_ref()
            .map(|summary| self.signal.evaluate(summary, analysis.retracement.as_ref()));
        let report = FlowReport {
            symbol: self.symbol,
            snapshots: self.snapshots,
            sessions: self.sessions.table(),
            bars: self.bars,
            swings: analysis.swings,
            retracement: analysis.retracement,
            alerts: self.sentiment.alerts().to_vec(),
            summary,
            signal,
        };

        info!(
            ticks = self.tick_count,
            snapshots = report.snapshots.len(),
            bars = report.bars.len(),
            swings = report.swings.len(),
            alerts = report.alerts.len(),
            signal = ?report.signal,
            "flow report built"
        );
        report
    }
}

/// Run the engine over an ordered tick slice.
pub fn analyze(config: &Config, ticks: &[Tick]) -> Result<FlowReport> {
    let mut engine = FlowEngine::new(config)?;
    for tick in ticks {
        engine.push(tick);
    }
    Ok(engine.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use flowdash_core::{
        config::{ManualSwing, SessionWindow},
        AlertKind, Side, SwingKind,
    };

    const FIVE_MIN: i64 = 300_000;
    /// 10:00 Bangkok time on 1970-01-01.
    const TEN_AM: i64 = 3 * 3_600_000;

    fn make_tick(ts_ms: i64, price: f64, volume: f64, side: Side) -> Tick {
        Tick {
            ts_ms,
            seq: 0,
            price,
            volume,
            side,
            bid_px: price - 0.1,
            bid_sz: 20_000.0,
            ask_px: price + 0.1,
            ask_sz: 50_000.0,
        }
    }

    #[test]
    fn test_buy_then_sell_report() {
        let ticks = vec![
            make_tick(TEN_AM, 50.0, 100.0, Side::Buy),
            make_tick(TEN_AM + FIVE_MIN, 49.0, 50.0, Side::Sell),
        ];
        let report = analyze(&Config::default(), &ticks).unwrap();

        assert_eq!(report.snapshots.len(), 2);
        let last = report.snapshots.last().unwrap();
        assert_relative_eq!(last.bid_pressure, 100.0);
        assert_relative_eq!(last.ask_pressure, 50.0);
        assert_relative_eq!(last.imbalance_ratio, 0.333, epsilon = 1e-3);

        assert_relative_eq!(report.sessions.get("Mid-day").unwrap().net_volume, 50.0);
        assert_eq!(report.bars.len(), 2);
        assert!(report.alerts.is_empty());

        let summary = report.summary.unwrap();
        assert_relative_eq!(summary.net_flow, 50.0);
        assert_eq!(summary.trade_count, 2);
    }

    #[test]
    fn test_default_config_gap_interval_is_neutral() {
        let ticks = vec![
            make_tick(1, 50.0, 10.0, Side::Buy),
            make_tick(2 * FIVE_MIN + 1, 50.0, 10.0, Side::Sell),
        ];
        let report = analyze(&Config::default(), &ticks).unwrap();

        let ends: Vec<i64> = report.snapshots.iter().map(|s| s.ts_ms).collect();
        assert_eq!(ends, vec![FIVE_MIN, 2 * FIVE_MIN, 3 * FIVE_MIN]);
        let gap = &report.snapshots[1];
        assert_eq!(gap.interval_buy_volume + gap.interval_sell_volume, 0.0);
        assert_eq!(gap.imbalance_ratio, 0.0);
    }

    #[test]
    fn test_empty_batch() {
        let report = analyze(&Config::default(), &[]).unwrap();
        assert!(report.snapshots.is_empty());
        assert!(report.bars.is_empty());
        assert!(report.swings.is_empty());
        assert!(report.alerts.is_empty());
        assert!(report.summary.is_none());
        assert_eq!(report.sessions.flows.len(), 4);
    }

    #[test]
    fn test_invalid_config_fails_before_processing() {
        let mut config = Config::default();
        config.session.windows = vec![
            SessionWindow::new("A", (9, 0), (12, 0)).unwrap(),
            SessionWindow::new("B", (11, 0), (13, 0)).unwrap(),
        ];
        assert!(FlowEngine::new(&config).is_err());

        let mut config = Config::default();
        config.imbalance.interval_seconds = 0;
        assert!(analyze(&config, &[]).is_err());
    }

    fn selloff() -> Vec<Tick> {
        let prices = [
            820.0, 822.0, 825.0, 823.0, 819.0, 815.0, 812.0, 814.0, 817.0, 816.0, 813.0, 810.0,
        ];
        prices
            .iter()
            .enumerate()
            .map(|(i, &price)| {
                let side = if i % 3 == 0 { Side::Buy } else { Side::Sell };
                make_tick(TEN_AM + i as i64 * 60_000, price, 50.0, side)
            })
            .collect()
    }

    #[test]
    fn test_idempotent() {
        let mut config = Config::default();
        config.swing.lookback = 2;
        config.sentiment.heavy_selling_threshold = Some(-40.0);

        let ticks = selloff();
        let first = analyze(&config, &ticks).unwrap();
        let second = analyze(&config, &ticks).unwrap();
        assert_eq!(first, second);
        assert!(!first.swings.is_empty());
        assert!(first
            .alerts
            .iter()
            .any(|a| a.kind == AlertKind::HeavySelling));
    }

    #[test]
    fn test_streamed_events_match_report() {
        let mut config = Config::default();
        config.swing.lookback = 2;

        let ticks = selloff();
        let mut engine = FlowEngine::new(&config).unwrap();
        let events = engine.push_all(&ticks);
        assert_eq!(engine.tick_count(), ticks.len() as u64);
        let report = engine.finish();

        let streamed_swings = events
            .iter()
            .filter(|e| matches!(e, FlowEvent::Swing(_)))
            .count();
        assert!(streamed_swings >= report.swings.len());

        let last_retracement = events.iter().rev().find_map(|e| match e {
            FlowEvent::Retracement(r) => Some(r.clone()),
            _ => None,
        });
        assert_eq!(last_retracement, report.retracement);
        assert_eq!(report.swings[0].kind, SwingKind::High);
    }

    #[test]
    fn test_price_alert_levels_and_signal() {
        let mut config = Config::default();
        config.swing.lookback = 2;
        config.swing.manual = Some(ManualSwing { high: 830.0, low: 800.0 });
        config.sentiment.alert_price = Some(815.0);
        config.sentiment.sell_buy_volume_ratio = Some(1.5);

        let mut engine = FlowEngine::new(&config).unwrap();
        let events = engine.push_all(&selloff());
        let report = engine.finish();

        // Only the last interval closes below 815 with selling dominant
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.alerts[0].kind, AlertKind::PricePanic);
        assert_eq!(report.alerts[0].ts_ms, TEN_AM + 3 * FIVE_MIN);
        assert_relative_eq!(report.alerts[0].severity, 5.0);

        // Detected swings are still reported; levels stay on the manual pair
        assert!(!report.swings.is_empty());
        assert!(!events.iter().any(|e| matches!(e, FlowEvent::Retracement(_))));
        let fib = report.retracement.as_ref().unwrap();
        assert_relative_eq!(fib.level(0.5).unwrap(), 815.0);
        assert_relative_eq!(fib.level(0.236).unwrap(), 822.92, epsilon = 1e-9);

        // 810 below 815 with 400 sold against 200 bought
        assert_eq!(report.signal, Some(MarketSignal::PricePanic));
    }

    #[test]
    fn test_signal_defaults() {
        let report = analyze(&Config::default(), &selloff()).unwrap();
        assert_eq!(report.signal, Some(MarketSignal::Stable));
        assert!(analyze(&Config::default(), &[]).unwrap().signal.is_none());
    }

    #[test]
    fn test_interval_close_price_source() {
        let mut config = Config::default();
        config.imbalance.interval_seconds = 60;
        config.swing.lookback = 1;
        config.swing.price_source = PriceSource::IntervalClose;

        let report = analyze(&config, &selloff()).unwrap();
        assert_eq!(report.bars.len(), 12);
        for swing in &report.swings {
            assert_eq!(swing.ts_ms % 60_000, 0);
        }
        assert!(!report.swings.is_empty());
    }
}
