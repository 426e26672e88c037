//! Entry signal rules.
//!
//! A rule looks at the current fully indicated bar and, at most, the bar
//! immediately before it. Rules hold no state between calls.

use std::fmt;
use std::str::FromStr;

use crate::domain::indicator_set::IndicatorRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    None,
    EnterLong,
    EnterShort,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::None => "none",
            Signal::EnterLong => "enter_long",
            Signal::EnterShort => "enter_short",
        }
    }
}

pub trait SignalRule {
    fn name(&self) -> &str;

    /// `previous` is the bar at `current.index - 1` when that bar is fully
    /// indicated, `None` otherwise.
    fn evaluate(&self, current: &IndicatorRow, previous: Option<&IndicatorRow>) -> Signal;
}

/// Short/long moving average crossover.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CrossoverRule;

impl SignalRule for CrossoverRule {
    fn name(&self) -> &str {
        "crossover"
    }

    fn evaluate(&self, current: &IndicatorRow, previous: Option<&IndicatorRow>) -> Signal {
        let Some(prev) = previous else {
            return Signal::None;
        };
        let (short, long) = (current.indicators.short_ma, current.indicators.long_ma);
        let (prev_short, prev_long) = (prev.indicators.short_ma, prev.indicators.long_ma);

        if short > long && prev_short <= prev_long {
            Signal::EnterLong
        } else if short < long && prev_short >= prev_long {
            Signal::EnterShort
        } else {
            Signal::None
        }
    }
}

/// RSI extreme confirmed by a close outside the Bollinger envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanReversionRule {
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for MeanReversionRule {
    fn default() -> Self {
        MeanReversionRule {
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

impl SignalRule for MeanReversionRule {
    fn name(&self) -> &str {
        "mean_reversion"
    }

    fn evaluate(&self, current: &IndicatorRow, _previous: Option<&IndicatorRow>) -> Signal {
        let close = current.bar.close;
        let ind = &current.indicators;

        if ind.rsi < self.oversold && close < ind.bb_lower {
            Signal::EnterLong
        } else if ind.rsi > self.overbought && close > ind.bb_upper {
            Signal::EnterShort
        } else {
            Signal::None
        }
    }
}

/// Which entry rule a strategy runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Crossover,
    MeanReversion,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Crossover => "crossover",
            RuleKind::MeanReversion => "mean_reversion",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "crossover" | "ma_crossover" => Ok(RuleKind::Crossover),
            "mean_reversion" => Ok(RuleKind::MeanReversion),
            other => Err(format!(
                "unknown rule '{other}' (expected crossover or mean_reversion)"
            )),
        }
    }
}

/// Position instruction for the fractional-capital variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

/// Trend filter: close against EMA, confirmed by RSI momentum.
///
/// BUY when close > ema and rsi > `buy_rsi`; SELL when close < ema or
/// rsi < `sell_rsi`; HOLD otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendFilterRule {
    pub buy_rsi: f64,
    pub sell_rsi: f64,
}

impl Default for TrendFilterRule {
    fn default() -> Self {
        TrendFilterRule {
            buy_rsi: 55.0,
            sell_rsi: 50.0,
        }
    }
}

impl TrendFilterRule {
    pub fn decide(&self, row: &IndicatorRow) -> Action {
        let close = row.bar.close;
        let ind = &row.indicators;
        if close > ind.ema && ind.rsi > self.buy_rsi {
            Action::Buy
        } else if close < ind.ema || ind.rsi < self.sell_rsi {
            Action::Sell
        } else {
            Action::Hold
        }
    }
}
