//! Average True Range indicator.
//!
//! ATR(n)[i] = mean(TR[i-n+1..=i]) where TR is the bar's true range against
//! the previous close. The first bar has no previous close, so its TR is
//! high - low. Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorSeries, IndicatorType, invalid_point, simple_point};
use crate::domain::ohlcv::Bar;

pub fn calculate_atr(bars: &[Bar], period: usize) -> IndicatorSeries {
    let tr_values: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect();

    let mut values = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        if period == 0 || i + 1 < period {
            values.push(invalid_point(bar.timestamp));
        } else {
            let window = &tr_values[i + 1 - period..=i];
            values.push(simple_point(
                bar.timestamp,
                window.iter().sum::<f64>() / period as f64,
            ));
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    }
}
