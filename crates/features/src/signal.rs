//! Batch market verdict.
//!
//! Reads the headline summary and the active retracement range and picks the
//! first matching condition: price panic, net flow below threshold, selling
//! easing, reversal, else stable. Checks with unset settings are skipped, and
//! the range-based checks need a retracement.

use flowdash_core::{
    config::{SentimentConfig, SignalConfig},
    FlowSummary, MarketSignal, RetracementSet,
};

/// Settings the verdict evaluates against.
#[derive(Debug, Clone)]
pub struct SignalRules {
    pub alert_price: Option<f64>,
    pub sell_buy_volume_ratio: Option<f64>,
    pub net_flow_threshold: Option<f64>,
    pub easing_sell_volume: Option<f64>,
    pub easing_level: f64,
    pub reversal_level: f64,
}

impl SignalRules {
    pub fn new(sentiment: &SentimentConfig, signal: &SignalConfig) -> Self {
        Self {
            alert_price: sentiment.alert_price,
            sell_buy_volume_ratio: sentiment.sell_buy_volume_ratio,
            net_flow_threshold: signal.net_flow_threshold,
            easing_sell_volume: signal.easing_sell_volume,
            easing_level: signal.easing_level,
            reversal_level: signal.reversal_level,
        }
    }

    /// Classify a batch.
    pub fn evaluate(&self, summary: &FlowSummary, range: Option<&RetracementSet>) -> MarketSignal {
        let price = summary.last;
        // Fraction of the range above the swing low
        let above = |fraction: f64| {
            range.is_some_and(|set| price > set.low.price + set.range() * fraction)
        };

        if let (Some(alert_price), Some(ratio)) = (self.alert_price, self.sell_buy_volume_ratio) {
            if price < alert_price && summary.sell_volume > summary.buy_volume * ratio {
                return MarketSignal::PricePanic;
            }
        }
        if self
            .net_flow_threshold
            .is_some_and(|threshold| summary.net_flow < threshold)
        {
            return MarketSignal::NetFlowBelowThreshold;
        }
        if self
            .easing_sell_volume
            .is_some_and(|limit| summary.sell_volume < limit && above(self.easing_level))
        {
            return MarketSignal::SellingEasing;
        }
        if summary.net_flow > 0.0 && above(self.reversal_level) {
            return MarketSignal::Reversal;
        }
        MarketSignal::Stable
    }
}
