//! Rolling order flow over interval bars.
//!
//! Tracks net flow summed over the last few intervals and the volume baseline
//! that spike detection compares against.

use flowdash_core::{IntervalBar, TimestampMs};
use statrs::statistics::Statistics;
use std::collections::VecDeque;

/// Rolling metrics as of one interval.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowObservation {
    /// Interval end.
    pub ts_ms: TimestampMs,
    /// Net flow summed over the flow window, this interval included.
    pub net_flow: f64,
    /// Buy volume over the flow window.
    pub buy_volume: f64,
    /// Sell volume over the flow window.
    pub sell_volume: f64,
    /// This interval's close.
    pub close: f64,
    /// This interval's volume.
    pub volume: f64,
    /// Mean volume of the preceding intervals, if any.
    pub mean_volume: Option<f64>,
}

impl FlowObservation {
    /// Volume relative to the baseline.
    pub fn volume_multiple(&self) -> Option<f64> {
        self.mean_volume
            .filter(|&mean| mean > 0.0)
            .map(|mean| self.volume / mean)
    }
}

/// Rolling flow window.
#[derive(Debug, Clone)]
pub struct RollingFlow {
    flow_window: usize,
    volume_window: usize,
    /// (buy, sell) per interval.
    flows: VecDeque<(f64, f64)>,
    volumes: VecDeque<f64>,
}

impl RollingFlow {
    /// Create a rolling window over `flow_window` intervals of net flow and
    /// `volume_window` intervals of volume baseline.
    pub fn new(flow_window: usize, volume_window: usize) -> Self {
        Self {
            flow_window: flow_window.max(1),
            volume_window: volume_window.max(1),
            flows: VecDeque::with_capacity(flow_window),
            volumes: VecDeque::with_capacity(volume_window),
        }
    }

    /// Add an interval bar and observe the window.
    pub fn push(&mut self, bar: &IntervalBar) -> FlowObservation {
        // Baseline excludes the interval being judged
        let mean_volume = if self.volumes.is_empty() {
            None
        } else {
            Some(self.volumes.iter().mean())
        };

        if self.flows.len() >= self.flow_window {
            self.flows.pop_front();
        }
        self.flows.push_back((bar.buy_volume, bar.sell_volume));

        if self.volumes.len() >= self.volume_window {
            self.volumes.pop_front();
        }
        self.volumes.push_back(bar.volume);

        let (buy_volume, sell_volume) = self
            .flows
            .iter()
            .fold((0.0, 0.0), |(buy, sell), &(b, s)| (buy + b, sell + s));
        FlowObservation {
            ts_ms: bar.ts_end,
            net_flow: self.flows.iter().map(|(b, s)| b - s).sum(),
            buy_volume,
            sell_volume,
            close: bar.close,
            volume: bar.volume,
            mean_volume,
        }
    }

    /// Get the number of intervals tracked.
    pub fn interval_count(&self) -> usize {
        self.flows.len()
    }

    /// Clear all data.
    pub fn clear(&mut self) {
        self.flows.clear();
        self.volumes.clear();
    }
}
