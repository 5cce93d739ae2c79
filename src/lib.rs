//! sigtrader: single-asset technical strategy backtester.
//!
//! Indicators (EMA, RSI, ATR) feed threshold signals, an ATR position sizer
//! and a one-bar-lagged Flat/Long state machine; the result is simulated
//! under commission, scored, and optionally re-run over walk-forward windows.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
