//! Sentiment alert state machine.
//!
//! Runs once per interval bar. Rolling net flow below the heavy-selling
//! threshold for enough consecutive intervals raises HeavySelling, a volume
//! spike while selling escalates to Panic, and a flow reversal shortly after
//! either one is a Rebound.
//!
//! PricePanic runs beside the state machine: it fires when an interval closes
//! below the alert price while rolling sell volume dominates buy volume, and
//! re-arms once either condition clears.

use crate::order_flow::{FlowObservation, RollingFlow};
use flowdash_core::{
    config::SentimentConfig, AlertKind, IntervalBar, SentimentAlert, TimestampMs,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Alert state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SentimentState {
    /// Counting consecutive intervals below the threshold.
    NoAlert { streak: u32 },
    /// Heavy selling raised at `since`.
    HeavySelling { since: TimestampMs },
    /// Panic raised at `since`.
    Panic { since: TimestampMs },
    /// Rebound raised at `at`. Counts as NoAlert from the next interval.
    Rebound { at: TimestampMs },
}

impl Default for SentimentState {
    fn default() -> Self {
        Self::NoAlert { streak: 0 }
    }
}

/// Thresholds the transition function evaluates against.
#[derive(Debug, Clone)]
pub struct SentimentRules {
    pub heavy_selling_threshold: Option<f64>,
    pub consecutive_intervals: u32,
    pub panic_volume_multiple: Option<f64>,
    pub rebound_window_ms: Option<i64>,
    pub alert_price: Option<f64>,
    pub sell_buy_volume_ratio: Option<f64>,
}

impl From<&SentimentConfig> for SentimentRules {
    fn from(config: &SentimentConfig) -> Self {
        Self {
            heavy_selling_threshold: config.heavy_selling_threshold,
            consecutive_intervals: config.consecutive_intervals.max(1),
            panic_volume_multiple: config.panic_volume_multiple,
            rebound_window_ms: config.rebound_window_seconds.map(|s| s as i64 * 1000),
            alert_price: config.alert_price,
            sell_buy_volume_ratio: config.sell_buy_volume_ratio,
        }
    }
}

impl SentimentRules {
    fn is_spike(&self, obs: &FlowObservation) -> Option<f64> {
        let multiple = self.panic_volume_multiple?;
        let ratio = obs.volume_multiple()?;
        (ratio > multiple).then_some(ratio)
    }

    /// Points below the alert price, when the price panic condition holds.
    pub fn price_panic(&self, obs: &FlowObservation) -> Option<f64> {
        let alert_price = self.alert_price?;
        let ratio = self.sell_buy_volume_ratio?;
        (obs.close < alert_price && obs.sell_volume > obs.buy_volume * ratio)
            .then_some(alert_price - obs.close)
    }
}

/// Advance the machine by one observation.
pub fn transition(
    state: SentimentState,
    obs: &FlowObservation,
    rules: &SentimentRules,
) -> (SentimentState, Vec<SentimentAlert>) {
    let Some(threshold) = rules.heavy_selling_threshold else {
        return (SentimentState::default(), Vec::new());
    };

    let below = obs.net_flow < threshold;
    let spike = rules.is_spike(obs);
    let alert = |kind, severity| SentimentAlert {
        ts_ms: obs.ts_ms,
        kind,
        severity,
    };

    match state {
        SentimentState::NoAlert { .. } | SentimentState::Rebound { .. } => {
            let streak = match state {
                SentimentState::NoAlert { streak } if below => streak + 1,
                _ if below => 1,
                _ => 0,
            };
            if streak < rules.consecutive_intervals {
                return (SentimentState::NoAlert { streak }, Vec::new());
            }

            let mut alerts = vec![alert(AlertKind::HeavySelling, obs.net_flow / threshold)];
            match spike {
                Some(ratio) => {
                    alerts.push(alert(AlertKind::Panic, ratio));
                    (SentimentState::Panic { since: obs.ts_ms }, alerts)
                }
                None => (SentimentState::HeavySelling { since: obs.ts_ms }, alerts),
            }
        }
        SentimentState::HeavySelling { since } | SentimentState::Panic { since }
            if obs.net_flow > 0.0 =>
        {
            let within = rules
                .rebound_window_ms
                .map_or(true, |window| obs.ts_ms - since <= window);
            if within {
                let severity = obs.net_flow / threshold.abs();
                (
                    SentimentState::Rebound { at: obs.ts_ms },
                    vec![alert(AlertKind::Rebound, severity)],
                )
            } else {
                (SentimentState::default(), Vec::new())
            }
        }
        SentimentState::HeavySelling { .. } => match spike {
            Some(ratio) if below => (
                SentimentState::Panic { since: obs.ts_ms },
                vec![alert(AlertKind::Panic, ratio)],
            ),
            _ => (state, Vec::new()),
        },
        SentimentState::Panic { .. } => (state, Vec::new()),
    }
}

/// Streaming sentiment evaluator over interval bars.
#[derive(Debug, Clone)]
pub struct SentimentMachine {
    rules: SentimentRules,
    flow: RollingFlow,
    state: SentimentState,
    /// Price panic condition held on the previous interval.
    price_panic: bool,
    alerts: Vec<SentimentAlert>,
}

impl SentimentMachine {
    /// Create a machine from configuration.
    pub fn new(config: &SentimentConfig) -> Self {
        Self {
            rules: SentimentRules::from(config),
            flow: RollingFlow::new(
                config.flow_window_intervals as usize,
                config.volume_window_intervals as usize,
            ),
            state: SentimentState::default(),
            price_panic: false,
            alerts: Vec::new(),
        }
    }

    /// Evaluate one completed interval. Returns alerts raised by it.
    pub fn on_bar(&mut self, bar: &IntervalBar) -> Vec<SentimentAlert> {
        let obs = self.flow.push(bar);
        let (next, mut raised) = transition(self.state, &obs, &self.rules);

        let price_panic = self.rules.price_panic(&obs);
        if let (Some(severity), false) = (price_panic, self.price_panic) {
            raised.push(SentimentAlert {
                ts_ms: obs.ts_ms,
                kind: AlertKind::PricePanic,
                severity,
            });
        }
        self.price_panic = price_panic.is_some();

        if next != self.state {
            debug!(ts_ms = obs.ts_ms, from = ?self.state, to = ?next, "sentiment state change");
        }
        for alert in &raised {
            info!(
                ts_ms = alert.ts_ms,
                kind = ?alert.kind,
                severity = alert.severity,
                net_flow = obs.net_flow,
                "sentiment alert"
            );
        }

        self.state = next;
        self.alerts.extend(raised.iter().cloned());
        raised
    }

    /// Evaluate a run of bars.
    pub fn evaluate(config: &SentimentConfig, bars: &[IntervalBar]) -> Vec<SentimentAlert> {
        let mut machine = Self::new(config);
        for bar in bars {
            machine.on_bar(bar);
        }
        machine.alerts
    }

    pub fn state(&self) -> SentimentState {
        self.state
    }

    /// All alerts raised so far.
    pub fn alerts(&self) -> &[SentimentAlert] {
        &self.alerts
    }

    /// Clear all state.
    pub fn clear(&mut self) {
        self.flow.clear();
        self.state = SentimentState::default();
        self.price_panic = false;
        self.alerts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const FIVE_MIN: i64 = 300_000;

    fn make_bar(i: i64, buy: f64, sell: f64) -> IntervalBar {
        priced_bar(i, 814.0, buy, sell)
    }

    fn priced_bar(i: i64, close: f64, buy: f64, sell: f64) -> IntervalBar {
        IntervalBar {
            ts_end: (i + 1) * FIVE_MIN,
            open: close,
            high: close,
            low: close,
            close,
            volume: buy + sell,
            buy_volume: buy,
            sell_volume: sell,
            vwap: Some(814.0),
            trade_count: 1,
        }
    }

    fn config(threshold: f64, consecutive: u32) -> SentimentConfig {
        SentimentConfig {
            heavy_selling_threshold: Some(threshold),
            consecutive_intervals: consecutive,
            ..SentimentConfig::default()
        }
    }

    fn kinds(alerts: &[SentimentAlert]) -> Vec<AlertKind> {
        alerts.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn test_sustained_selling_alerts_once() {
        let bars: Vec<_> = (0..5).map(|i| make_bar(i, 10.0, 110.0)).collect();

        let alerts = SentimentMachine::evaluate(&config(-50.0, 1), &bars);
        assert_eq!(kinds(&alerts), vec![AlertKind::HeavySelling]);
        assert_eq!(alerts[0].ts_ms, FIVE_MIN);
        assert_relative_eq!(alerts[0].severity, 2.0);

        let alerts = SentimentMachine::evaluate(&config(-50.0, 5), &bars);
        assert_eq!(kinds(&alerts), vec![AlertKind::HeavySelling]);
        assert_eq!(alerts[0].ts_ms, 5 * FIVE_MIN);
    }

    #[test]
    fn test_streak_resets_on_recovery() {
        let bars = vec![
            make_bar(0, 0.0, 100.0),
            make_bar(1, 0.0, 100.0),
            make_bar(2, 50.0, 50.0),
            make_bar(3, 0.0, 100.0),
            make_bar(4, 0.0, 100.0),
        ];
        let alerts = SentimentMachine::evaluate(&config(-50.0, 3), &bars);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_disabled_without_threshold() {
        let bars: Vec<_> = (0..10).map(|i| make_bar(i, 0.0, 1_000.0)).collect();
        let alerts = SentimentMachine::evaluate(&SentimentConfig::default(), &bars);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_volume_spike_escalates_to_panic() {
        let cfg = SentimentConfig {
            panic_volume_multiple: Some(3.0),
            volume_window_intervals: 3,
            ..config(-50.0, 2)
        };
        let bars = vec![
            make_bar(0, 50.0, 50.0),
            make_bar(1, 40.0, 60.0),
            make_bar(2, 0.0, 100.0),
            make_bar(3, 0.0, 100.0),
            make_bar(4, 100.0, 900.0),
        ];
        let mut machine = SentimentMachine::new(&cfg);
        for bar in &bars {
            machine.on_bar(bar);
        }

        assert_eq!(
            kinds(machine.alerts()),
            vec![AlertKind::HeavySelling, AlertKind::Panic]
        );
        let panic = &machine.alerts()[1];
        assert_eq!(panic.ts_ms, 5 * FIVE_MIN);
        assert_relative_eq!(panic.severity, 10.0);
        assert_eq!(machine.state(), SentimentState::Panic { since: 5 * FIVE_MIN });
    }

    #[test]
    fn test_spike_with_confirmation_raises_both() {
        let cfg = SentimentConfig {
            panic_volume_multiple: Some(2.0),
            ..config(-50.0, 1)
        };
        let bars = vec![make_bar(0, 50.0, 50.0), make_bar(1, 0.0, 500.0)];
        let alerts = SentimentMachine::evaluate(&cfg, &bars);
        assert_eq!(kinds(&alerts), vec![AlertKind::HeavySelling, AlertKind::Panic]);
        assert!(alerts.iter().all(|a| a.ts_ms == 2 * FIVE_MIN));
    }

    #[test]
    fn test_no_spike_without_history() {
        let cfg = SentimentConfig {
            panic_volume_multiple: Some(1.5),
            ..config(-50.0, 1)
        };
        let alerts = SentimentMachine::evaluate(&cfg, &[make_bar(0, 0.0, 1_000.0)]);
        assert_eq!(kinds(&alerts), vec![AlertKind::HeavySelling]);
    }

    #[test]
    fn test_rebound_within_window() {
        let cfg = SentimentConfig {
            rebound_window_seconds: Some(900),
            ..config(-50.0, 1)
        };
        let bars = vec![
            make_bar(0, 0.0, 100.0),
            make_bar(1, 0.0, 100.0),
            make_bar(2, 200.0, 0.0),
        ];
        let mut machine = SentimentMachine::new(&cfg);
        for bar in &bars {
            machine.on_bar(bar);
        }

        assert_eq!(
            kinds(machine.alerts()),
            vec![AlertKind::HeavySelling, AlertKind::Rebound]
        );
        assert_relative_eq!(machine.alerts()[1].severity, 4.0);
        assert_eq!(machine.state(), SentimentState::Rebound { at: 3 * FIVE_MIN });
    }

    #[test]
    fn test_panic_then_rebound() {
        let cfg = SentimentConfig {
            panic_volume_multiple: Some(2.0),
            rebound_window_seconds: Some(900),
            ..config(-50.0, 1)
        };
        let bars = vec![
            make_bar(0, 50.0, 50.0),
            make_bar(1, 0.0, 500.0),
            make_bar(2, 200.0, 0.0),
        ];
        let mut machine = SentimentMachine::new(&cfg);
        machine.on_bar(&bars[0]);
        machine.on_bar(&bars[1]);
        assert_eq!(machine.state(), SentimentState::Panic { since: 2 * FIVE_MIN });

        let raised = machine.on_bar(&bars[2]);
        assert_eq!(kinds(&raised), vec![AlertKind::Rebound]);
        assert_eq!(raised[0].ts_ms, 3 * FIVE_MIN);
        assert_relative_eq!(raised[0].severity, 4.0);
        assert_eq!(machine.state(), SentimentState::Rebound { at: 3 * FIVE_MIN });
        assert_eq!(
            kinds(machine.alerts()),
            vec![AlertKind::HeavySelling, AlertKind::Panic, AlertKind::Rebound]
        );
    }

    #[test]
    fn test_panic_reversal_after_window_is_silent() {
        let cfg = SentimentConfig {
            panic_volume_multiple: Some(2.0),
            rebound_window_seconds: Some(300),
            ..config(-50.0, 1)
        };
        let bars = vec![
            make_bar(0, 50.0, 50.0),
            make_bar(1, 0.0, 500.0),
            make_bar(2, 0.0, 0.0),
            make_bar(3, 200.0, 0.0),
        ];
        let mut machine = SentimentMachine::new(&cfg);
        for bar in &bars {
            machine.on_bar(bar);
        }

        assert_eq!(
            kinds(machine.alerts()),
            vec![AlertKind::HeavySelling, AlertKind::Panic]
        );
        assert_eq!(machine.state(), SentimentState::NoAlert { streak: 0 });
    }

    #[test]
    fn test_price_panic_is_edge_triggered() {
        let cfg = SentimentConfig {
            alert_price: Some(820.0),
            sell_buy_volume_ratio: Some(2.0),
            ..SentimentConfig::default()
        };
        let bars = vec![
            priced_bar(0, 825.0, 10.0, 100.0),
            priced_bar(1, 815.0, 10.0, 100.0),
            priced_bar(2, 814.0, 10.0, 100.0),
            priced_bar(3, 814.0, 60.0, 100.0),
            priced_bar(4, 812.0, 0.0, 30.0),
        ];
        let alerts = SentimentMachine::evaluate(&cfg, &bars);

        // Above the alert price, then held, then cleared by buying
        assert_eq!(kinds(&alerts), vec![AlertKind::PricePanic, AlertKind::PricePanic]);
        assert_eq!(alerts[0].ts_ms, 2 * FIVE_MIN);
        assert_relative_eq!(alerts[0].severity, 5.0);
        assert_eq!(alerts[1].ts_ms, 5 * FIVE_MIN);
        assert_relative_eq!(alerts[1].severity, 8.0);
    }

    #[test]
    fn test_price_panic_needs_both_settings() {
        let cfg = SentimentConfig {
            alert_price: Some(820.0),
            ..SentimentConfig::default()
        };
        let alerts = SentimentMachine::evaluate(&cfg, &[priced_bar(0, 800.0, 0.0, 100.0)]);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_late_reversal_is_silent() {
        let cfg = SentimentConfig {
            rebound_window_seconds: Some(300),
            ..config(-50.0, 1)
        };
        let bars = vec![
            make_bar(0, 0.0, 100.0),
            make_bar(1, 0.0, 100.0),
            make_bar(2, 0.0, 100.0),
            make_bar(3, 200.0, 0.0),
        ];
        let mut machine = SentimentMachine::new(&cfg);
        for bar in &bars {
            machine.on_bar(bar);
        }

        assert_eq!(kinds(machine.alerts()), vec![AlertKind::HeavySelling]);
        assert_eq!(machine.state(), SentimentState::NoAlert { streak: 0 });
    }

    #[test]
    fn test_selling_after_rebound_alerts_again() {
        let bars = vec![
            make_bar(0, 0.0, 100.0),
            make_bar(1, 200.0, 0.0),
            make_bar(2, 0.0, 100.0),
        ];
        let alerts = SentimentMachine::evaluate(&config(-50.0, 1), &bars);
        assert_eq!(
            kinds(&alerts),
            vec![
                AlertKind::HeavySelling,
                AlertKind::Rebound,
                AlertKind::HeavySelling
            ]
        );
    }

    #[test]
    fn test_rolling_window_smooths_flow() {
        let cfg = SentimentConfig {
            flow_window_intervals: 3,
            ..config(-100.0, 1)
        };
        // -60 per interval only breaches -100 once two intervals accumulate
        let bars: Vec<_> = (0..3).map(|i| make_bar(i, 20.0, 80.0)).collect();
        let alerts = SentimentMachine::evaluate(&cfg, &bars);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].ts_ms, 2 * FIVE_MIN);
        assert_relative_eq!(alerts[0].severity, 1.2);
    }
}
