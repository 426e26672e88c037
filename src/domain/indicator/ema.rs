//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorSeries, IndicatorType, invalid_point, simple_point};
use crate::domain::ohlcv::Bar;

pub fn calculate_ema(bars: &[Bar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Ema(period),
            values: bars.iter().map(|b| invalid_point(b.timestamp)).collect(),
        };
    }

    let mut values = Vec::with_capacity(bars.len());
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = 0.0;
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i < period - 1 {
            sum += bar.close;
            values.push(invalid_point(bar.timestamp));
        } else if i == period - 1 {
            sum += bar.close;
            ema = sum / period as f64;
            values.push(simple_point(bar.timestamp, ema));
        } else {
            ema = bar.close * k + ema * (1.0 - k);
            values.push(simple_point(bar.timestamp, ema));
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}
