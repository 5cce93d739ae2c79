//! Boundary to a broker-execution collaborator.
//!
//! Reduces a strategy run to what an executor needs: the latest bar's
//! signal and realized position, plus an action given the caller's
//! current holding. Placing orders is left to the caller.

use chrono::NaiveDate;

use super::error::SigtraderError;
use super::position::PositionState;
use super::signal::Signal;
use super::sizing::SizingDecision;
use super::strategy::StrategyRun;

/// A position reported by the broker. Absence is expressed as `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeldPosition {
    pub quantity: f64,
    pub average_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum HoldReason {
    /// Holding and no sell signal.
    AlreadyInvested,
    /// Not holding and no buy signal.
    AwaitingEntry,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Action {
    Enter(SizingDecision),
    Exit,
    Hold(HoldReason),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TradeDecision {
    pub date: NaiveDate,
    pub close: f64,
    pub signal: Signal,
    pub position: PositionState,
    pub action: Action,
}

/// Decides what to do on the latest bar of `run`.
///
/// Fails only when the run is empty.
pub fn decide(
    run: &StrategyRun,
    held: Option<HeldPosition>,
) -> Result<TradeDecision, SigtraderError> {
    let last = run.signals.len().checked_sub(1);
    let Some((i, date)) = last.and_then(|i| Some((i, run.frame.date(i)?))) else {
        return Err(SigtraderError::InsufficientData { bars: 0, minimum: 1 });
    };
    let close = run.frame.close(i).unwrap_or_default();
    let signal = run.signals[i];
    let position = run.realized.get(i).copied().unwrap_or_default();
    let holding = held.is_some_and(|h| h.quantity > 0.0);

    let action = match (signal, holding) {
        (Signal::Buy, false) => Action::Enter(run.sizing.get(i).copied().unwrap_or_default()),
        (Signal::Sell, true) => Action::Exit,
        (_, true) => Action::Hold(HoldReason::AlreadyInvested),
        (_, false) => Action::Hold(HoldReason::AwaitingEntry),
    };

    tracing::debug!(%date, %signal, holding, ?action, "trade decision");

    Ok(TradeDecision {
        date,
        close,
        signal,
        position,
        action,
    })
}
