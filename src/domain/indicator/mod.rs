//! Technical indicator implementations.
//!
//! Every indicator is a pure function over a bar slice returning an
//! [`IndicatorSeries`] aligned one-to-one with the input. Points inside an
//! indicator's warmup window carry `valid: false` and must not be read.
//!
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: A time series of indicator values

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod rsi;
pub mod sma;
pub mod volatility;

use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Bollinger { upper: f64, middle: f64, lower: f64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Atr(usize),
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
    RollingVol(usize),
    AnnualizedVol(usize),
    EwmaVol {
        period: usize,
        lambda_x100: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Value at `index` for single-valued indicators, `None` during warmup.
    pub fn simple_at(&self, index: usize) -> Option<f64> {
        match self.values.get(index) {
            Some(IndicatorPoint {
                valid: true,
                value: IndicatorValue::Simple(v),
                ..
            }) => Some(*v),
            _ => None,
        }
    }

    /// (upper, middle, lower) at `index`, `None` during warmup.
    pub fn bands_at(&self, index: usize) -> Option<(f64, f64, f64)> {
        match self.values.get(index) {
            Some(IndicatorPoint {
                valid: true,
                value:
                    IndicatorValue::Bollinger {
                        upper,
                        middle,
                        lower,
                    },
                ..
            }) => Some((*upper, *middle, *lower)),
            _ => None,
        }
    }

    pub fn first_valid(&self) -> Option<usize> {
        self.values.iter().position(|p| p.valid)
    }
}

pub(crate) fn invalid_point(timestamp: NaiveDateTime) -> IndicatorPoint {
    IndicatorPoint {
        timestamp,
        valid: false,
        value: IndicatorValue::Simple(0.0),
    }
}

pub(crate) fn simple_point(timestamp: NaiveDateTime, value: f64) -> IndicatorPoint {
    IndicatorPoint {
        timestamp,
        valid: true,
        value: IndicatorValue::Simple(value),
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
            IndicatorType::RollingVol(period) => write!(f, "ROLLING_VOL({})", period),
            IndicatorType::AnnualizedVol(period) => write!(f, "ANNUALIZED_VOL({})", period),
            IndicatorType::EwmaVol {
                period,
                lambda_x100,
            } => {
                write!(f, "EWMA_VOL({},{})", period, *lambda_x100 as f64 / 100.0)
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_type_display_sma() {
        assert_eq!(IndicatorType::Sma(20).to_string(), "SMA(20)");
    }

    #[test]
    fn indicator_type_display_bollinger() {
        let boll = IndicatorType::Bollinger {
            period: 20,
            stddev_mult_x100: 200,
        };
        assert_eq!(boll.to_string(), "BOLLINGER(20,2)");
    }

    #[test]
    fn indicator_type_display_ewma() {
        assert_eq!(
            IndicatorType::EwmaVol {
                period: 20,
                lambda_x100: 94
            }
            .to_string(),
            "EWMA_VOL(20,0.94)"
        );
    }

    #[test]
    fn simple_at_hides_warmup() {
        let bars = test_support::make_bars(&[1.0, 2.0]);
        let series = IndicatorSeries {
            indicator_type: IndicatorType::Sma(2),
            values: vec![
                invalid_point(bars[0].timestamp),
                simple_point(bars[1].timestamp, 1.5),
            ],
        };
        assert_eq!(series.simple_at(0), None);
        assert_eq!(series.simple_at(1), Some(1.5));
        assert_eq!(series.simple_at(2), None);
        assert_eq!(series.bands_at(1), None);
        assert_eq!(series.first_valid(), Some(1));
    }

    #[test]
    fn indicator_type_hash_eq() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(IndicatorType::Sma(20), "sma20");
        map.insert(IndicatorType::Sma(50), "sma50");
        map.insert(IndicatorType::Rsi(14), "rsi14");

        assert_eq!(map.get(&IndicatorType::Sma(20)), Some(&"sma20"));
        assert_eq!(map.get(&IndicatorType::Rsi(14)), Some(&"rsi14"));
        assert_eq!(map.get(&IndicatorType::Ema(20)), None);
    }
}
