//! Bid/offer pressure sampling.
//!
//! Buyer-initiated volume is bid pressure, seller-initiated volume is ask
//! pressure. One snapshot is produced per interval boundary, from the first
//! tick's interval through the last tick's interval. An interval without any
//! signed volume reports a ratio of 0 in either mode.

use flowdash_core::{
    config::{ImbalanceConfig, PressureMode},
    imbalance_ratio, interval_end, ImbalanceSnapshot, Side, Tick, TimestampMs,
};
use std::collections::VecDeque;

/// Streaming pressure accumulator.
#[derive(Debug, Clone)]
pub struct ImbalanceAccumulator {
    interval_ms: i64,
    mode: PressureMode,
    /// Boundary of the interval currently accumulating.
    next_boundary: Option<TimestampMs>,
    running_buy: f64,
    running_sell: f64,
    interval_buy: f64,
    interval_sell: f64,
}

impl ImbalanceAccumulator {
    /// Create a new accumulator.
    pub fn new(interval_ms: i64, mode: PressureMode) -> Self {
        Self {
            interval_ms,
            mode,
            next_boundary: None,
            running_buy: 0.0,
            running_sell: 0.0,
            interval_buy: 0.0,
            interval_sell: 0.0,
        }
    }

    /// Fold a tick in. Returns snapshots for every boundary it moved past.
    pub fn push(&mut self, tick: &Tick) -> Vec<ImbalanceSnapshot> {
        let end = interval_end(tick.ts_ms, self.interval_ms);
        let mut closed = Vec::new();

        match self.next_boundary {
            None => self.next_boundary = Some(end),
            Some(mut boundary) => {
                while end > boundary {
                    closed.push(self.close(boundary));
                    boundary += self.interval_ms;
                }
                self.next_boundary = Some(boundary);
            }
        }

        match tick.side {
            Side::Buy => {
                self.running_buy += tick.volume;
                self.interval_buy += tick.volume;
            }
            Side::Sell => {
                self.running_sell += tick.volume;
                self.interval_sell += tick.volume;
            }
            Side::Unknown => {}
        }

        closed
    }

    /// Close the interval in progress. Later ticks start a fresh sequence.
    pub fn flush(&mut self) -> Option<ImbalanceSnapshot> {
        let boundary = self.next_boundary.take()?;
        Some(self.close(boundary))
    }

    /// Snapshot of the interval in progress without closing it.
    pub fn current(&self) -> Option<ImbalanceSnapshot> {
        self.next_boundary.map(|boundary| self.snapshot(boundary))
    }

    fn close(&mut self, boundary: TimestampMs) -> ImbalanceSnapshot {
        let snapshot = self.snapshot(boundary);
        self.interval_buy = 0.0;
        self.interval_sell = 0.0;
        snapshot
    }

    fn snapshot(&self, boundary: TimestampMs) -> ImbalanceSnapshot {
        let (bid_pressure, ask_pressure) = match self.mode {
            PressureMode::Running => (self.running_buy, self.running_sell),
            PressureMode::PerInterval => (self.interval_buy, self.interval_sell),
        };
        let ratio = if self.interval_buy + self.interval_sell > 0.0 {
            imbalance_ratio(bid_pressure, ask_pressure)
        } else {
            0.0
        };
        ImbalanceSnapshot {
            ts_ms: boundary,
            bid_pressure,
            ask_pressure,
            imbalance_ratio: ratio,
            interval_buy_volume: self.interval_buy,
            interval_sell_volume: self.interval_sell,
        }
    }

    /// Clear all state.
    pub fn clear(&mut self) {
        *self = Self::new(self.interval_ms, self.mode);
    }
}

/// Imbalance calculator over ordered tick slices.
#[derive(Debug, Clone)]
pub struct ImbalanceCalculator {
    interval_ms: i64,
    mode: PressureMode,
}

impl ImbalanceCalculator {
    /// Create a calculator from configuration.
    pub fn new(config: &ImbalanceConfig) -> Self {
        Self {
            interval_ms: config.interval_ms(),
            mode: config.mode,
        }
    }

    /// Fresh streaming accumulator with this calculator's settings.
    pub fn accumulator(&self) -> ImbalanceAccumulator {
        ImbalanceAccumulator::new(self.interval_ms, self.mode)
    }

    /// Lazy snapshot sequence over ordered ticks.
    pub fn snapshots<'a>(&self, ticks: &'a [Tick]) -> ImbalanceSnapshots<'a> {
        ImbalanceSnapshots {
            ticks: ticks.iter(),
            acc: self.accumulator(),
            pending: VecDeque::new(),
            flushed: false,
        }
    }
}

/// Iterator returned by [`ImbalanceCalculator::snapshots`].
pub struct ImbalanceSnapshots<'a> {
    ticks: std::slice::Iter<'a, Tick>,
    acc: ImbalanceAccumulator,
    pending: VecDeque<ImbalanceSnapshot>,
    flushed: bool,
}

impl Iterator for ImbalanceSnapshots<'_> {
    type Item = ImbalanceSnapshot;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(snapshot) = self.pending.pop_front() {
                return Some(snapshot);
            }
            match self.ticks.next() {
                Some(tick) => self.pending.extend(self.acc.push(tick)),
                None if self.flushed => return None,
                None => {
                    self.flushed = true;
                    return self.acc.flush();
                }
            }
        }
    }
}
