#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use fxtrader::domain::error::FxError;
use fxtrader::domain::indicator_set::{IndicatorParams, IndicatorRow, IndicatorSet};
pub use fxtrader::domain::ohlcv::Bar;
use fxtrader::domain::series::Series;
use fxtrader::domain::signal::{Signal, SignalRule};
use fxtrader::domain::strategy::StrategyConfig;
use fxtrader::ports::data_port::DataPort;
use std::collections::HashMap;
use std::path::Path;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, instrument: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(instrument.to_string(), bars);
        self
    }

    pub fn with_error(mut self, instrument: &str, reason: &str) -> Self {
        self.errors.insert(instrument.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_series(&self, instrument: &str) -> Result<Series, FxError> {
        if let Some(reason) = self.errors.get(instrument) {
            return Err(FxError::Data {
                reason: reason.clone(),
            });
        }
        Series::new(self.data.get(instrument).cloned().unwrap_or_default())
    }
}

pub fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn hour(i: usize) -> NaiveDateTime {
    start() + Duration::hours(i as i64)
}

pub fn make_bar(i: usize, close: f64) -> Bar {
    Bar {
        timestamp: hour(i),
        open: close,
        high: close + 0.0005,
        low: close - 0.0005,
        close,
        volume: 1000.0,
    }
}

pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i, c))
        .collect()
}

pub fn make_series(closes: &[f64]) -> Series {
    Series::new(make_bars(closes)).unwrap()
}

/// Rows with empty indicator sets, for driving the simulator directly.
pub fn plain_rows(closes: &[f64]) -> Vec<IndicatorRow> {
    make_bars(closes)
        .into_iter()
        .enumerate()
        .map(|(index, bar)| IndicatorRow {
            index,
            bar,
            indicators: IndicatorSet::default(),
        })
        .collect()
}

/// Short windows so a few dozen bars are enough to exercise every rule.
pub fn small_params() -> IndicatorParams {
    IndicatorParams {
        short_ma: 3,
        long_ma: 6,
        ema: 4,
        rsi: 4,
        bb_period: 5,
        bb_stddev_mult_x100: 150,
        atr: 4,
        volatility: 4,
        ewma_lambda_x100: 94,
    }
}

pub fn small_strategy() -> StrategyConfig {
    StrategyConfig {
        name: "Test".into(),
        params: small_params(),
        ..StrategyConfig::default()
    }
}

/// Enters once, on the bar with the given index.
pub struct ForcedEntry {
    pub at: usize,
    pub signal: Signal,
}

impl SignalRule for ForcedEntry {
    fn name(&self) -> &str {
        "forced"
    }

    fn evaluate(&self, current: &IndicatorRow, _previous: Option<&IndicatorRow>) -> Signal {
        if current.index == self.at {
            self.signal
        } else {
            Signal::None
        }
    }
}

/// Enters on every bar it is asked about.
pub struct Always(pub Signal);

impl SignalRule for Always {
    fn name(&self) -> &str {
        "always"
    }

    fn evaluate(&self, _current: &IndicatorRow, _previous: Option<&IndicatorRow>) -> Signal {
        self.0
    }
}

/// A deterministic oscillating price path around 1.10.
pub fn wave(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            1.1000 + 0.0040 * (t / 3.0).sin() + 0.0015 * (t / 1.7).cos()
        })
        .collect()
}

pub fn write_price_csv(path: &Path, closes: &[f64]) {
    let mut content = String::from("time,open,high,low,close,volume\n");
    for bar in make_bars(closes) {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.timestamp.format("%Y-%m-%d %H:%M:%S"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        ));
    }
    std::fs::write(path, content).unwrap();
}
