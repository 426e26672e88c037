//! Simple Moving Average indicator.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]). Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorSeries, IndicatorType, invalid_point, simple_point};
use crate::domain::ohlcv::Bar;

pub fn calculate_sma(bars: &[Bar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        sum += bar.close;
        if period > 0 && i >= period {
            sum -= bars[i - period].close;
        }

        if period == 0 || i + 1 < period {
            values.push(invalid_point(bar.timestamp));
        } else {
            values.push(simple_point(bar.timestamp, sum / period as f64));
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;

    #[test]
    fn sma_warmup() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_sma(&bars, 3);

        assert_eq!(series.values.len(), 5);
        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
    }

    #[test]
    fn sma_rolling_values() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_sma(&bars, 3);

        assert!((series.simple_at(2).unwrap() - 20.0).abs() < 1e-10);
        assert!((series.simple_at(3).unwrap() - 30.0).abs() < 1e-10);
        assert!((series.simple_at(4).unwrap() - 40.0).abs() < 1e-10);
    }

    #[test]
    fn sma_period_one_is_close() {
        let bars = make_bars(&[1.5, 2.5]);
        let series = calculate_sma(&bars, 1);
        assert_eq!(series.simple_at(0), Some(1.5));
        assert_eq!(series.simple_at(1), Some(2.5));
    }

    #[test]
    fn sma_shorter_than_period_all_invalid() {
        let bars = make_bars(&[1.0, 2.0]);
        let series = calculate_sma(&bars, 5);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn sma_zero_period() {
        let bars = make_bars(&[1.0, 2.0]);
        let series = calculate_sma(&bars, 0);
        assert_eq!(series.values.len(), 2);
        assert!(series.values.iter().all(|p| !p.valid));
    }
}
