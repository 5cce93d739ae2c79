//! Core domain types and logic.

pub mod ohlcv;
pub mod series;
pub mod indicator;
pub mod signal;
pub mod sizing;
pub mod position;
pub mod strategy;
pub mod backtest;
pub mod metrics;
pub mod walk_forward;
pub mod execution;
pub mod config_validation;
pub mod error;
