//! Core domain types and logic.

pub mod ohlcv;
pub mod series;
pub mod indicator;
pub mod indicator_set;
pub mod signal;
pub mod position;
pub mod simulator;
pub mod report;
pub mod order_intent;
pub mod live;
pub mod strategy;
pub mod config_validation;
pub mod error;
