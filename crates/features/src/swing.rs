//! Swing high/low detection and Fibonacci retracement.
//!
//! A point is a confirmed High when it is strictly above the `lookback`
//! points before it and no lower than the `lookback` points after it, so the
//! first point of a plateau wins. Lows are symmetric. Accepted swings
//! alternate in kind and must move at least `min_move` from the previous one.
//!
//! A configured manual swing pair pins the retracement levels; detection
//! still runs and reports swings.

use flowdash_core::{
    config::{ManualSwing, SwingConfig},
    Price, RetracementLevel, RetracementSet, SwingDirection, SwingKind,
    SwingPoint, TimestampMs,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One observation of the price series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub ts_ms: TimestampMs,
    pub price: f64,
}

/// Detected swings and the retracement of the latest pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwingAnalysis {
    pub swings: Vec<SwingPoint>,
    pub retracement: Option<RetracementSet>,
}

/// Classify the centre of a window.
fn classify(left: &[f64], center: f64, right: &[f64]) -> Option<SwingKind> {
    let max = |s: &[f64]| s.iter().copied().map(Price::from).max();
    let min = |s: &[f64]| s.iter().copied().map(Price::from).min();
    let c = Price::from(center);

    if max(left).map_or(false, |m| c > m) && max(right).map_or(false, |m| c >= m) {
        Some(SwingKind::High)
    } else if min(left).map_or(false, |m| c < m) && min(right).map_or(false, |m| c <= m) {
        Some(SwingKind::Low)
    } else {
        None
    }
}

/// Apply the alternation and `min_move` rules. Returns true if `swings` changed.
fn accept(swings: &mut Vec<SwingPoint>, candidate: SwingPoint, min_move: f64) -> bool {
    match swings.last_mut() {
        None => {
            swings.push(candidate);
            true
        }
        Some(last) if last.kind == candidate.kind => {
            let more_extreme = match candidate.kind {
                SwingKind::High => candidate.price > last.price,
                SwingKind::Low => candidate.price < last.price,
            };
            if more_extreme {
                *last = candidate;
            }
            more_extreme
        }
        Some(last) => {
            if (candidate.price - last.price).abs() >= min_move {
                swings.push(candidate);
                true
            } else {
                false
            }
        }
    }
}

/// Retracement levels from the latest swing pair.
pub fn retracement(swings: &[SwingPoint], ratios: &[f64]) -> Option<RetracementSet> {
    let [.., first, second] = swings else {
        return None;
    };

    let (high, low, direction) = match (first.kind, second.kind) {
        (SwingKind::High, SwingKind::Low) => (first, second, SwingDirection::Down),
        (SwingKind::Low, SwingKind::High) => (second, first, SwingDirection::Up),
        _ => return None,
    };

    let range = high.price - low.price;
    let levels = ratios
        .iter()
        .map(|&ratio| RetracementLevel {
            ratio,
            price: match direction {
                SwingDirection::Down => low.price + range * ratio,
                SwingDirection::Up => high.price - range * ratio,
            },
        })
        .collect();

    Some(RetracementSet {
        high: high.clone(),
        low: low.clone(),
        direction,
        levels,
    })
}

/// Levels for a user-supplied pair, measured down from the high.
pub fn manual_retracement(pair: &ManualSwing, ratios: &[f64]) -> RetracementSet {
    let point = |price, kind| SwingPoint {
        ts_ms: 0,
        index: 0,
        price,
        kind,
    };
    let range = pair.high - pair.low;
    RetracementSet {
        high: point(pair.high, SwingKind::High),
        low: point(pair.low, SwingKind::Low),
        direction: SwingDirection::Up,
        levels: ratios
            .iter()
            .map(|&ratio| RetracementLevel {
                ratio,
                price: pair.high - range * ratio,
            })
            .collect(),
    }
}

/// Batch swing detection using index windows over the series.
pub fn detect_swings(points: &[PricePoint], config: &SwingConfig) -> SwingAnalysis {
    let lookback = config.lookback;
    let mut swings = Vec::new();

    if lookback > 0 && points.len() > 2 * lookback {
        let prices: Vec<f64> = points.iter().map(|p| p.price).collect();
        for i in lookback..prices.len() - lookback {
            let left = &prices[i - lookback..i];
            let right = &prices[i + 1..=i + lookback];
            if let Some(kind) = classify(left, prices[i], right) {
                let candidate = SwingPoint {
                    ts_ms: points[i].ts_ms,
                    index: i,
                    price: prices[i],
                    kind,
                };
                accept(&mut swings, candidate, config.min_move);
            }
        }
    }

    let retracement = match &config.manual {
        Some(pair) => Some(manual_retracement(pair, &config.ratios)),
        None => retracement(&swings, &config.ratios),
    };
    SwingAnalysis { swings, retracement }
}

/// Streaming swing detector with a `2 * lookback + 1` ring buffer.
pub struct SwingDetector {
    lookback: usize,
    min_move: f64,
    ratios: Vec<f64>,
    /// Most recent points, oldest first.
    buffer: VecDeque<(usize, PricePoint)>,
    /// Index of the next point.
    next_index: usize,
    swings: Vec<SwingPoint>,
    retracement: Option<RetracementSet>,
    /// Levels come from a manual pair and never move.
    pinned: bool,
}

impl SwingDetector {
    /// Create a new detector.
    pub fn new(config: &SwingConfig) -> Self {
        let capacity = 2 * config.lookback + 1;
        Self {
            lookback: config.lookback,
            min_move: config.min_move,
            ratios: config.ratios.clone(),
            buffer: VecDeque::with_capacity(capacity),
            next_index: 0,
            swings: Vec::new(),
            retracement: config
                .manual
                .as_ref()
                .map(|pair| manual_retracement(pair, &config.ratios)),
            pinned: config.manual.is_some(),
        }
    }

    /// Add a point. Returns the latest swing when the swing list changed.
    pub fn push(&mut self, point: PricePoint) -> Option<&SwingPoint> {
        let window = 2 * self.lookback + 1;
        if self.buffer.len() == window {
            self.buffer.pop_front();
        }
        self.buffer.push_back((self.next_index, point));
        self.next_index += 1;

        if self.lookback == 0 || self.buffer.len() < window {
            return None;
        }

        let prices: Vec<f64> = self.buffer.iter().map(|(_, p)| p.price).collect();
        let center = self.lookback;
        let kind = classify(&prices[..center], prices[center], &prices[center + 1..])?;

        let (index, at) = self.buffer[center];
        let candidate = SwingPoint {
            ts_ms: at.ts_ms,
            index,
            price: at.price,
            kind,
        };
        if accept(&mut self.swings, candidate, self.min_move) {
            if !self.pinned {
                self.retracement = retracement(&self.swings, &self.ratios);
            }
            self.swings.last()
        } else {
            None
        }
    }

    /// Accepted swings so far.
    pub fn swings(&self) -> &[SwingPoint] {
        &self.swings
    }

    /// Retracement of the latest pair; replaced whenever a new swing lands
    /// unless pinned to a manual pair.
    pub fn retracement(&self) -> Option<&RetracementSet> {
        self.retracement.as_ref()
    }

    /// Whether levels come from a manual pair.
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Detected swings and the current retracement.
    pub fn analysis(&self) -> SwingAnalysis {
        SwingAnalysis {
            swings: self.swings.clone(),
            retracement: self.retracement.clone(),
        }
    }

    /// Clear all state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.next_index = 0;
        self.swings.clear();
        if !self.pinned {
            self.retracement = None;
        }
    }
}
