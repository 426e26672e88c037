//! Log-return volatility measures.
//!
//! log_return[i] = ln(C[i] / C[i-1]), undefined at bar 0.
//!
//! - Rolling volatility: sample standard deviation (N-1) of the trailing n
//!   log returns. Warmup: first n bars are invalid.
//! - Annualized volatility: rolling volatility × sqrt(252).
//! - EWMA volatility: var[i] = λ·var[i-1] + (1-λ)·r[i]², seeded with r[1]²,
//!   reported as sqrt(var). Shares the rolling warmup so all volatility
//!   columns become valid on the same bar.

use crate::domain::indicator::{IndicatorSeries, IndicatorType, invalid_point, simple_point};
use crate::domain::ohlcv::Bar;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Log returns aligned with `bars`; index 0 is always `None`.
pub fn log_returns(bars: &[Bar]) -> Vec<Option<f64>> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                None
            } else {
                Some((bar.close / bars[i - 1].close).ln())
            }
        })
        .collect()
}

pub fn calculate_rolling_vol(bars: &[Bar], period: usize) -> IndicatorSeries {
    IndicatorSeries {
        indicator_type: IndicatorType::RollingVol(period),
        values: rolling_std(bars, period, 1.0),
    }
}

pub fn calculate_annualized_vol(bars: &[Bar], period: usize) -> IndicatorSeries {
    IndicatorSeries {
        indicator_type: IndicatorType::AnnualizedVol(period),
        values: rolling_std(bars, period, TRADING_DAYS_PER_YEAR.sqrt()),
    }
}

pub fn calculate_ewma_vol(bars: &[Bar], period: usize, lambda_x100: u32) -> IndicatorSeries {
    let lambda = lambda_x100 as f64 / 100.0;
    let returns = log_returns(bars);
    let mut values = Vec::with_capacity(bars.len());
    let mut variance: Option<f64> = None;

    for (i, bar) in bars.iter().enumerate() {
        if let Some(r) = returns[i] {
            variance = Some(match variance {
                None => r * r,
                Some(prev) => lambda * prev + (1.0 - lambda) * r * r,
            });
        }

        match variance {
            Some(var) if period >= 2 && i >= period => {
                values.push(simple_point(bar.timestamp, var.sqrt()))
            }
            _ => values.push(invalid_point(bar.timestamp)),
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::EwmaVol {
            period,
            lambda_x100,
        },
        values,
    }
}

fn rolling_std(bars: &[Bar], period: usize, scale: f64) -> Vec<crate::domain::indicator::IndicatorPoint> {
    let returns = log_returns(bars);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            // sample deviation needs at least two returns
            if period < 2 || i < period {
                return invalid_point(bar.timestamp);
            }
            let window: Vec<f64> = returns[i + 1 - period..=i].iter().flatten().copied().collect();
            let n = window.len() as f64;
            let mean = window.iter().sum::<f64>() / n;
            let variance = window.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
            simple_point(bar.timestamp, variance.sqrt() * scale)
        })
        .collect()
}
