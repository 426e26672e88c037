//! Position tracking and trade records.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => f.write_str("long"),
            Side::Short => f.write_str("short"),
        }
    }
}

/// An open position with its fixed exit levels.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub side: Side,
    pub entry_index: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
    pub tp_distance: f64,
    pub sl_distance: f64,
}

impl OpenPosition {
    /// Levels sit `tp_distance` / `sl_distance` price units away from entry,
    /// on the profitable / losing side respectively.
    pub fn open(
        side: Side,
        entry_index: usize,
        entry_time: NaiveDateTime,
        entry_price: f64,
        tp_distance: f64,
        sl_distance: f64,
    ) -> Self {
        let sign = side.sign();
        OpenPosition {
            side,
            entry_index,
            entry_time,
            entry_price,
            take_profit: entry_price + sign * tp_distance,
            stop_loss: entry_price - sign * sl_distance,
            tp_distance,
            sl_distance,
        }
    }

    pub fn should_take_profit(&self, price: f64) -> bool {
        match self.side {
            Side::Long => price >= self.take_profit,
            Side::Short => price <= self.take_profit,
        }
    }

    pub fn should_stop_loss(&self, price: f64) -> bool {
        match self.side {
            Side::Long => price <= self.stop_loss,
            Side::Short => price >= self.stop_loss,
        }
    }

    /// Fill price and realized profit for an exit at one of the levels.
    /// Profit is the configured distance itself, so a take-profit always
    /// books exactly `+tp_distance` and a stop exactly `-sl_distance`.
    pub fn exit(&self, reason: ExitReason) -> (f64, f64) {
        match reason {
            ExitReason::TakeProfit => (self.take_profit, self.tp_distance),
            ExitReason::StopLoss => (self.stop_loss, -self.sl_distance),
        }
    }

    /// Mark-to-market profit in price units at `price`.
    pub fn unrealized_profit(&self, price: f64) -> f64 {
        self.side.sign() * (price - self.entry_price)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Open(OpenPosition),
}

impl PositionState {
    pub fn side(&self) -> Option<Side> {
        match self {
            PositionState::Flat => None,
            PositionState::Open(pos) => Some(pos.side),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::TakeProfit => f.write_str("take_profit"),
            ExitReason::StopLoss => f.write_str("stop_loss"),
        }
    }
}

/// One realized round trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub side: Side,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_price: f64,
    pub profit: f64,
    pub reason: ExitReason,
}
