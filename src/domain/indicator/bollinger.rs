//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::Bar;

pub fn calculate_bollinger(bars: &[Bar], period: usize, stddev_mult_x100: u32) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let mult = stddev_mult_x100 as f64 / 100.0;

    for (i, bar) in bars.iter().enumerate() {
        let valid = period > 0 && i + 1 >= period;

        let (upper, middle, lower) = if valid {
            let window = &bars[i + 1 - period..=i];
            let middle = window.iter().map(|b| b.close).sum::<f64>() / period as f64;
            let variance = window
                .iter()
                .map(|b| {
                    let diff = b.close - middle;
                    diff * diff
                })
                .sum::<f64>()
                / period as f64;
            let stddev = variance.sqrt();
            (middle + mult * stddev, middle, middle - mult * stddev)
        } else {
            (0.0, 0.0, 0.0)
        };

        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid,
            value: IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            },
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Bollinger {
            period,
            stddev_mult_x100,
        },
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;

    #[test]
    fn bollinger_warmup() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_bollinger(&bars, 3, 200);

        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[3].valid);
        assert!(series.values[4].valid);
    }

    #[test]
    fn bollinger_constant_values() {
        let bars = make_bars(&[100.0; 5]);
        let series = calculate_bollinger(&bars, 3, 200);

        let (upper, middle, lower) = series.bands_at(2).unwrap();
        assert!((middle - 100.0).abs() < f64::EPSILON);
        assert!((upper - 100.0).abs() < f64::EPSILON);
        assert!((lower - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bollinger_basic_calculation() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let series = calculate_bollinger(&bars, 3, 200);

        let (upper, middle, lower) = series.bands_at(2).unwrap();
        let variance: f64 = (100.0 + 0.0 + 100.0) / 3.0;
        let stddev = variance.sqrt();

        assert!((middle - 20.0).abs() < 1e-10);
        assert!((upper - (20.0 + 2.0 * stddev)).abs() < 1e-10);
        assert!((lower - (20.0 - 2.0 * stddev)).abs() < 1e-10);
    }

    #[test]
    fn bollinger_multiplier_variations() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let series = calculate_bollinger(&bars, 3, 100);

        let (upper, _, lower) = series.bands_at(2).unwrap();
        let stddev = (200.0_f64 / 3.0).sqrt();
        assert!((upper - (20.0 + stddev)).abs() < 1e-10);
        assert!((lower - (20.0 - stddev)).abs() < 1e-10);
    }

    #[test]
    fn bollinger_symmetry() {
        let bars = make_bars(&[10.0, 25.0, 30.0, 12.0]);
        let series = calculate_bollinger(&bars, 3, 200);

        let (upper, middle, lower) = series.bands_at(3).unwrap();
        assert!(((upper - middle) - (middle - lower)).abs() < 1e-10);
    }

    #[test]
    fn bollinger_indicator_type() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let series = calculate_bollinger(&bars, 20, 200);

        assert_eq!(
            series.indicator_type,
            IndicatorType::Bollinger {
                period: 20,
                stddev_mult_x100: 200
            }
        );
        assert!(series.values.iter().all(|p| !p.valid));
    }
}
