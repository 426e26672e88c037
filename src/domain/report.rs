//! Aggregate results and trade statistics.
//!
//! Two reporting conventions:
//! - `Pips`: sum of realized trade profits scaled by the instrument's pip
//!   factor (10_000 for 4-decimal quotes).
//! - `Compounding`: Π(1 + per-bar strategy return) for the fractional-capital
//!   BUY/SELL/HOLD variant, where the position is 1 after BUY, 0 after SELL
//!   and carried forward on HOLD. The return of bar i is earned by the
//!   position held at the close of bar i-1.

use std::fmt;

use chrono::NaiveDateTime;

use crate::domain::indicator_set::IndicatorRow;
use crate::domain::position::TradeRecord;
use crate::domain::signal::{Action, TrendFilterRule};

pub const DEFAULT_PIP_FACTOR: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportingMode {
    Pips { pip_factor: f64 },
    Compounding,
}

impl ReportingMode {
    pub fn name(&self) -> &'static str {
        match self {
            ReportingMode::Pips { .. } => "pips",
            ReportingMode::Compounding => "compounding",
        }
    }
}

/// Scalar outcome of a run under one reporting mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateResult {
    pub mode: ReportingMode,
    pub value: f64,
}

impl fmt::Display for AggregateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            ReportingMode::Pips { .. } => write!(f, "{:.2} pips", self.value),
            ReportingMode::Compounding => write!(f, "{:.2}x", self.value),
        }
    }
}

pub fn pips_total(trades: &[TradeRecord], pip_factor: f64) -> f64 {
    trades.iter().map(|t| t.profit).sum::<f64>() * pip_factor
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub position: u8,
    pub multiple: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompoundingResult {
    pub final_multiple: f64,
    pub curve: Vec<EquityPoint>,
}

pub fn compounding_return(rows: &[IndicatorRow], rule: &TrendFilterRule) -> CompoundingResult {
    let mut multiple = 1.0;
    let mut position: u8 = 0;
    let mut curve = Vec::with_capacity(rows.len());

    for (k, row) in rows.iter().enumerate() {
        if k > 0 {
            let prev_close = rows[k - 1].bar.close;
            let bar_return = row.bar.close / prev_close - 1.0;
            multiple *= 1.0 + position as f64 * bar_return;
        }

        position = match rule.decide(row) {
            Action::Buy => 1,
            Action::Sell => 0,
            Action::Hold => position,
        };

        curve.push(EquityPoint {
            index: row.index,
            timestamp: row.bar.timestamp,
            position,
            multiple,
        });
    }

    CompoundingResult {
        final_multiple: multiple,
        curve,
    }
}

pub fn aggregate(
    mode: ReportingMode,
    trades: &[TradeRecord],
    rows: &[IndicatorRow],
    trend: &TrendFilterRule,
) -> AggregateResult {
    let value = match mode {
        ReportingMode::Pips { pip_factor } => pips_total(trades, pip_factor),
        ReportingMode::Compounding => compounding_return(rows, trend).final_multiple,
    };
    AggregateResult { mode, value }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TradeStats {
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub total_profit: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
}

impl TradeStats {
    pub fn compute(trades: &[TradeRecord]) -> Self {
        let mut stats = TradeStats::default();
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;

        for trade in trades {
            let profit = trade.profit;
            stats.total_profit += profit;
            if profit > 0.0 {
                stats.trades_won += 1;
                total_wins += profit;
                stats.largest_win = stats.largest_win.max(profit);
            } else if profit < 0.0 {
                stats.trades_lost += 1;
                total_losses += profit.abs();
                stats.largest_loss = stats.largest_loss.max(profit.abs());
            } else {
                stats.trades_breakeven += 1;
            }
        }

        stats.total_trades = trades.len();
        if stats.total_trades > 0 {
            stats.win_rate = stats.trades_won as f64 / stats.total_trades as f64;
        }

        stats.profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        if stats.trades_won > 0 {
            stats.avg_win = total_wins / stats.trades_won as f64;
        }
        if stats.trades_lost > 0 {
            stats.avg_loss = total_losses / stats.trades_lost as f64;
        }

        stats
    }
}
