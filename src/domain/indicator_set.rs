//! Augmented series: bars plus every indicator column, and the per-bar
//! [`IndicatorSet`] used by signal rules and the simulator.
//!
//! A bar carries an `IndicatorSet` only when every column is valid at that
//! bar. Bars without one are never handed to a rule.

use std::collections::HashMap;

use crate::domain::indicator::atr::calculate_atr;
use crate::domain::indicator::bollinger::calculate_bollinger;
use crate::domain::indicator::ema::calculate_ema;
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::volatility::{
    calculate_annualized_vol, calculate_ewma_vol, calculate_rolling_vol,
};
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Bar;
use crate::domain::series::Series;

/// Window lengths and multipliers for every indicator column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorParams {
    pub short_ma: usize,
    pub long_ma: usize,
    pub ema: usize,
    pub rsi: usize,
    pub bb_period: usize,
    pub bb_stddev_mult_x100: u32,
    pub atr: usize,
    pub volatility: usize,
    pub ewma_lambda_x100: u32,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        IndicatorParams {
            short_ma: 20,
            long_ma: 50,
            ema: 20,
            rsi: 14,
            bb_period: 20,
            bb_stddev_mult_x100: 200,
            atr: 14,
            volatility: 20,
            ewma_lambda_x100: 94,
        }
    }
}

impl IndicatorParams {
    pub fn short_ma_type(&self) -> IndicatorType {
        IndicatorType::Sma(self.short_ma)
    }

    pub fn long_ma_type(&self) -> IndicatorType {
        IndicatorType::Sma(self.long_ma)
    }

    pub fn bollinger_type(&self) -> IndicatorType {
        IndicatorType::Bollinger {
            period: self.bb_period,
            stddev_mult_x100: self.bb_stddev_mult_x100,
        }
    }

    pub fn ewma_type(&self) -> IndicatorType {
        IndicatorType::EwmaVol {
            period: self.volatility,
            lambda_x100: self.ewma_lambda_x100,
        }
    }

    /// Smallest bar count for which the last bar carries a full indicator set.
    /// Indicators built on close-to-close deltas need one extra bar.
    pub fn minimum_bars(&self) -> usize {
        [
            self.short_ma,
            self.long_ma,
            self.ema,
            self.rsi + 1,
            self.bb_period,
            self.atr,
            self.volatility + 1,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    pub fn indicator_types(&self) -> Vec<IndicatorType> {
        let mut types = vec![
            self.short_ma_type(),
            self.long_ma_type(),
            IndicatorType::Ema(self.ema),
            IndicatorType::Rsi(self.rsi),
            self.bollinger_type(),
            IndicatorType::Atr(self.atr),
            IndicatorType::RollingVol(self.volatility),
            IndicatorType::AnnualizedVol(self.volatility),
            self.ewma_type(),
        ];
        types.dedup();
        types
    }
}

/// Indicator values for one fully indicated bar.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndicatorSet {
    pub short_ma: f64,
    pub long_ma: f64,
    pub ema: f64,
    pub rsi: f64,
    pub bb_mid: f64,
    pub bb_upper: f64,
    pub bb_lower: f64,
    pub atr: f64,
    pub rolling_std: f64,
    pub annualized_vol: f64,
    pub ewma_vol: f64,
}

/// A fully indicated bar, as seen by rules and the simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRow {
    pub index: usize,
    pub bar: Bar,
    pub indicators: IndicatorSet,
}

#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    pub params: IndicatorParams,
    bars: Vec<Bar>,
    columns: HashMap<IndicatorType, IndicatorSeries>,
    sets: Vec<Option<IndicatorSet>>,
}

pub fn compute_indicators(bars: &[Bar], params: &IndicatorParams) -> HashMap<IndicatorType, IndicatorSeries> {
    let mut columns = HashMap::new();
    for series in [
        calculate_sma(bars, params.short_ma),
        calculate_sma(bars, params.long_ma),
        calculate_ema(bars, params.ema),
        calculate_rsi(bars, params.rsi),
        calculate_bollinger(bars, params.bb_period, params.bb_stddev_mult_x100),
        calculate_atr(bars, params.atr),
        calculate_rolling_vol(bars, params.volatility),
        calculate_annualized_vol(bars, params.volatility),
        calculate_ewma_vol(bars, params.volatility, params.ewma_lambda_x100),
    ] {
        columns.insert(series.indicator_type.clone(), series);
    }
    columns
}

impl IndicatorFrame {
    pub fn compute(series: &Series, params: IndicatorParams) -> Self {
        let bars = series.bars().to_vec();
        let columns = compute_indicators(&bars, &params);
        let sets = (0..bars.len())
            .map(|i| assemble_set(&columns, &params, i))
            .collect();
        Self {
            params,
            bars,
            columns,
            sets,
        }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn column(&self, indicator_type: &IndicatorType) -> Option<&IndicatorSeries> {
        self.columns.get(indicator_type)
    }

    pub fn set_at(&self, index: usize) -> Option<&IndicatorSet> {
        self.sets.get(index).and_then(Option::as_ref)
    }

    pub fn row(&self, index: usize) -> Option<IndicatorRow> {
        self.set_at(index).map(|set| IndicatorRow {
            index,
            bar: self.bars[index].clone(),
            indicators: *set,
        })
    }

    /// Fully indicated bars in timestamp order.
    pub fn rows(&self) -> Vec<IndicatorRow> {
        (0..self.bars.len()).filter_map(|i| self.row(i)).collect()
    }

    pub fn indicated_count(&self) -> usize {
        self.sets.iter().filter(|s| s.is_some()).count()
    }
}

fn assemble_set(
    columns: &HashMap<IndicatorType, IndicatorSeries>,
    params: &IndicatorParams,
    i: usize,
) -> Option<IndicatorSet> {
    let simple = |t: IndicatorType| columns.get(&t).and_then(|s| s.simple_at(i));

    let (bb_upper, bb_mid, bb_lower) = columns.get(&params.bollinger_type())?.bands_at(i)?;

    Some(IndicatorSet {
        short_ma: simple(params.short_ma_type())?,
        long_ma: simple(params.long_ma_type())?,
        ema: simple(IndicatorType::Ema(params.ema))?,
        rsi: simple(IndicatorType::Rsi(params.rsi))?,
        bb_mid,
        bb_upper,
        bb_lower,
        atr: simple(IndicatorType::Atr(params.atr))?,
        rolling_std: simple(IndicatorType::RollingVol(params.volatility))?,
        annualized_vol: simple(IndicatorType::AnnualizedVol(params.volatility))?,
        ewma_vol: simple(params.ewma_type())?,
    })
}
