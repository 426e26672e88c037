//! Bar-by-bar position/fill simulation.
//!
//! Single forward pass over fully indicated bars:
//! - FLAT: evaluate the entry rule; on a signal open at the bar's close.
//! - LONG/SHORT: from the next bar on, exit at the take-profit level when the
//!   close reaches it, else at the stop level when the close reaches that.
//!   Take-profit is checked first, so it wins when both hold on one bar.
//!
//! Only the close is consulted for exits; intra-bar high/low paths are not
//! modelled. At most one position is open at any time and entry signals
//! raised while a position is open are ignored.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::domain::indicator_set::{IndicatorFrame, IndicatorRow};
use crate::domain::position::{ExitReason, OpenPosition, PositionState, Side, TradeRecord};
use crate::domain::signal::{Signal, SignalRule};

/// Fixed exit distances in price units (not percentages).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    pub take_profit: f64,
    pub stop_loss: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            take_profit: 0.0030,
            stop_loss: 0.0020,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PositionEvent {
    Opened {
        index: usize,
        timestamp: NaiveDateTime,
        side: Side,
        entry_price: f64,
    },
    Closed {
        index: usize,
        trade: TradeRecord,
    },
}

/// Per-bar snapshot of the walk.
#[derive(Debug, Clone, PartialEq)]
pub struct BarTrace {
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub signal: Signal,
    /// Side held after the bar was processed.
    pub position: Option<Side>,
    /// Set on the bar a position was opened.
    pub entry_price: Option<f64>,
    /// Set on the bar a position was closed.
    pub exit_price: Option<f64>,
    pub profit: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimulationResult {
    pub events: Vec<PositionEvent>,
    pub trades: Vec<TradeRecord>,
    pub trace: Vec<BarTrace>,
    /// Position still open when the series ended.
    pub open_position: Option<OpenPosition>,
}

impl SimulationResult {
    pub fn signal_count(&self) -> usize {
        self.trace
            .iter()
            .filter(|t| t.signal != Signal::None)
            .count()
    }

    pub fn total_profit(&self) -> f64 {
        self.trades.iter().map(|t| t.profit).sum()
    }
}

pub fn run_backtest(
    frame: &IndicatorFrame,
    rule: &dyn SignalRule,
    config: &SimulationConfig,
) -> SimulationResult {
    simulate(&frame.rows(), rule, config)
}

/// Walk `rows` (fully indicated bars, increasing index) once.
pub fn simulate(
    rows: &[IndicatorRow],
    rule: &dyn SignalRule,
    config: &SimulationConfig,
) -> SimulationResult {
    let mut result = SimulationResult::default();
    let mut state = PositionState::Flat;

    for (k, row) in rows.iter().enumerate() {
        let previous = k
            .checked_sub(1)
            .map(|p| &rows[p])
            .filter(|p| p.index + 1 == row.index);

        let mut trace = BarTrace {
            index: row.index,
            timestamp: row.bar.timestamp,
            signal: Signal::None,
            position: None,
            entry_price: None,
            exit_price: None,
            profit: None,
        };

        state = match state {
            PositionState::Flat => {
                let signal = rule.evaluate(row, previous);
                trace.signal = signal;
                match signal {
                    Signal::EnterLong => open(&mut result, &mut trace, row, Side::Long, config),
                    Signal::EnterShort => open(&mut result, &mut trace, row, Side::Short, config),
                    Signal::None => PositionState::Flat,
                }
            }
            PositionState::Open(pos) => {
                let price = row.bar.close;
                let reason = if pos.should_take_profit(price) {
                    Some(ExitReason::TakeProfit)
                } else if pos.should_stop_loss(price) {
                    Some(ExitReason::StopLoss)
                } else {
                    None
                };

                match reason {
                    Some(reason) => {
                        close(&mut result, &mut trace, row, &pos, reason);
                        PositionState::Flat
                    }
                    None => PositionState::Open(pos),
                }
            }
        };

        trace.position = state.side();
        result.trace.push(trace);
    }

    if let PositionState::Open(pos) = state {
        result.open_position = Some(pos);
    }
    result
}

fn open(
    result: &mut SimulationResult,
    trace: &mut BarTrace,
    row: &IndicatorRow,
    side: Side,
    config: &SimulationConfig,
) -> PositionState {
    let entry_price = row.bar.close;
    let pos = OpenPosition::open(
        side,
        row.index,
        row.bar.timestamp,
        entry_price,
        config.take_profit,
        config.stop_loss,
    );
    debug!(
        index = row.index,
        %side,
        entry_price,
        take_profit = pos.take_profit,
        stop_loss = pos.stop_loss,
        "position opened"
    );
    trace.entry_price = Some(entry_price);
    result.events.push(PositionEvent::Opened {
        index: row.index,
        timestamp: row.bar.timestamp,
        side,
        entry_price,
    });
    PositionState::Open(pos)
}

fn close(
    result: &mut SimulationResult,
    trace: &mut BarTrace,
    row: &IndicatorRow,
    pos: &OpenPosition,
    reason: ExitReason,
) {
    let (exit_price, profit) = pos.exit(reason);
    let trade = TradeRecord {
        side: pos.side,
        entry_time: pos.entry_time,
        exit_time: row.bar.timestamp,
        entry_price: pos.entry_price,
        exit_price,
        profit,
        reason,
    };
    debug!(index = row.index, %reason, exit_price, profit, "position closed");
    trace.exit_price = Some(exit_price);
    trace.profit = Some(profit);
    result.events.push(PositionEvent::Closed {
        index: row.index,
        trade: trade.clone(),
    });
    result.trades.push(trade);
}
