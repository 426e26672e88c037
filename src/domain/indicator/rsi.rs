//! RSI (Relative Strength Index) indicator.
//!
//! Average gain and average loss are plain means over the trailing n
//! close-to-close deltas (gain = max(delta, 0), loss = max(-delta, 0)).
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//!
//! Saturation when avg_loss == 0:
//! - avg_gain > 0: RSI = 100
//! - avg_gain == 0 (flat window): RSI = 50
//!
//! Warmup: first n bars are invalid (need n price changes).

use crate::domain::indicator::{IndicatorSeries, IndicatorType, invalid_point, simple_point};
use crate::domain::ohlcv::Bar;

pub fn calculate_rsi(bars: &[Bar], period: usize) -> IndicatorSeries {
    let deltas: Vec<(f64, f64)> = bars
        .windows(2)
        .map(|w| split_delta(w[1].close - w[0].close))
        .collect();

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if period == 0 || i < period {
                return invalid_point(bar.timestamp);
            }
            // Summed fresh per window so a flat window is exactly zero on both sides.
            let (gain_sum, loss_sum) = deltas[i - period..i]
                .iter()
                .fold((0.0, 0.0), |(g, l), (gain, loss)| (g + gain, l + loss));
            let avg_gain = gain_sum / period as f64;
            let avg_loss = loss_sum / period as f64;
            simple_point(bar.timestamp, rsi_from_averages(avg_gain, avg_loss))
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

/// Relative strength index from average gain/loss, with explicit saturation
/// instead of relying on float division by zero.
pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    match (avg_gain > 0.0, avg_loss > 0.0) {
        (false, false) => 50.0,
        (true, false) => 100.0,
        (false, true) => 0.0,
        (true, true) => 100.0 - (100.0 / (1.0 + avg_gain / avg_loss)),
    }
}

fn split_delta(delta: f64) -> (f64, f64) {
    if delta > 0.0 {
        (delta, 0.0)
    } else {
        (0.0, -delta)
    }
}
