//! Session-bucketed net order flow.
//!
//! Assigns each tick to one time-of-day window by exchange local time and
//! accumulates signed volume and trade counts per window.

use flowdash_core::{
    config::{SessionConfig, SessionWindow},
    Result, SessionFlow, Side, Tick, TimestampMs, MS_PER_DAY,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Validated session window table.
#[derive(Debug, Clone)]
pub struct SessionTable {
    windows: Vec<SessionWindow>,
    offset_ms: i64,
}

impl SessionTable {
    /// Build a table, failing on empty, inverted or overlapping windows.
    pub fn new(config: &SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            windows: config.windows.clone(),
            offset_ms: config.utc_offset_minutes as i64 * 60_000,
        })
    }

    /// Local second-of-day for a UTC timestamp.
    pub fn local_secs(&self, ts_ms: TimestampMs) -> u32 {
        let local = ts_ms.rem_euclid(MS_PER_DAY) + self.offset_ms.rem_euclid(MS_PER_DAY);
        (local.rem_euclid(MS_PER_DAY) / 1000) as u32
    }

    /// Index of the window containing the timestamp.
    pub fn assign(&self, ts_ms: TimestampMs) -> Option<usize> {
        let secs = self.local_secs(ts_ms);
        self.windows.iter().position(|w| w.contains_secs(secs))
    }

    /// Windows in table order.
    pub fn windows(&self) -> &[SessionWindow] {
        &self.windows
    }
}

/// Per-window flow plus the count of ticks no window claimed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFlowTable {
    /// Flows in table order.
    pub flows: Vec<SessionFlow>,
    /// Ticks outside every window.
    pub dropped: u64,
}

impl SessionFlowTable {
    /// Flow for a window by name.
    pub fn get(&self, window: &str) -> Option<&SessionFlow> {
        self.flows.iter().find(|f| f.window == window)
    }

    /// Sum of net volume across windows.
    pub fn total_net_volume(&self) -> f64 {
        self.flows.iter().map(|f| f.net_volume).sum()
    }
}

/// Session flow aggregator.
#[derive(Debug, Clone)]
pub struct SessionFlowAggregator {
    table: SessionTable,
    flows: Vec<SessionFlow>,
    dropped: u64,
}

impl SessionFlowAggregator {
    /// Create a new aggregator over a validated table.
    pub fn new(table: SessionTable) -> Self {
        let flows = table
            .windows()
            .iter()
            .map(|w| SessionFlow::empty(w.name.clone()))
            .collect();
        Self {
            table,
            flows,
            dropped: 0,
        }
    }

    /// Add a tick.
    pub fn add_tick(&mut self, tick: &Tick) {
        let Some(idx) = self.table.assign(tick.ts_ms) else {
            self.dropped += 1;
            debug!(ts_ms = tick.ts_ms, "tick outside all session windows");
            return;
        };

        let flow = &mut self.flows[idx];
        if tick.volume > 0.0 {
            flow.trade_count += 1;
        }
        match tick.side {
            Side::Buy => {
                flow.buy_volume += tick.volume;
                if tick.volume > 0.0 {
                    flow.net_trades += 1;
                }
            }
            Side::Sell => {
                flow.sell_volume += tick.volume;
                if tick.volume > 0.0 {
                    flow.net_trades -= 1;
                }
            }
            Side::Unknown => {}
        }
        flow.net_volume += tick.signed_volume();
    }

    /// Add multiple ticks.
    pub fn add_ticks(&mut self, ticks: &[Tick]) {
        for tick in ticks {
            self.add_tick(tick);
        }
    }

    /// Current table.
    pub fn table(&self) -> SessionFlowTable {
        SessionFlowTable {
            flows: self.flows.clone(),
            dropped: self.dropped,
        }
    }

    /// Aggregate a whole slice.
    pub fn aggregate(table: SessionTable, ticks: &[Tick]) -> SessionFlowTable {
        let mut aggregator = Self::new(table);
        aggregator.add_ticks(ticks);
        aggregator.table()
    }

    /// Clear accumulated flow, keep the table.
    pub fn clear(&mut self) {
        for flow in &mut self.flows {
            *flow = SessionFlow::empty(std::mem::take(&mut flow.window));
        }
        self.dropped = 0;
    }
}
