//! Position state machine and round-trip trades.
//!
//! Flat --Buy--> Long --Sell--> Flat; Hold keeps the current state.
//! The realized timeline is the state sequence shifted one bar forward, so a
//! signal seen at bar i only affects returns from bar i+1 onward.

use chrono::NaiveDate;

use super::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum PositionState {
    #[default]
    Flat,
    Long,
}

impl PositionState {
    pub fn is_long(&self) -> bool {
        matches!(self, PositionState::Long)
    }

    /// Exposure multiplier applied to market returns.
    pub fn exposure(&self) -> f64 {
        match self {
            PositionState::Flat => 0.0,
            PositionState::Long => 1.0,
        }
    }

    pub fn next(self, signal: Signal) -> Self {
        match (self, signal) {
            (PositionState::Flat, Signal::Buy) => PositionState::Long,
            (PositionState::Long, Signal::Sell) => PositionState::Flat,
            (state, _) => state,
        }
    }
}

/// State after each bar's signal, starting from Flat.
pub fn fold_states(signals: &[Signal]) -> Vec<PositionState> {
    signals
        .iter()
        .scan(PositionState::Flat, |state, &signal| {
            *state = state.next(signal);
            Some(*state)
        })
        .collect()
}

/// Shifts `states` one bar forward; bar 0 is Flat.
pub fn realize(states: &[PositionState]) -> Vec<PositionState> {
    if states.is_empty() {
        return Vec::new();
    }
    std::iter::once(PositionState::Flat)
        .chain(states[..states.len() - 1].iter().copied())
        .collect()
}

/// A change in realized position at a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Entry,
    Exit,
}

/// Entry/exit transition at bar `i` of a realized timeline (never at bar 0).
pub fn transition_at(realized: &[PositionState], i: usize) -> Option<Transition> {
    if i == 0 || i >= realized.len() {
        return None;
    }
    match (realized[i - 1], realized[i]) {
        (PositionState::Flat, PositionState::Long) => Some(Transition::Entry),
        (PositionState::Long, PositionState::Flat) => Some(Transition::Exit),
        _ => None,
    }
}

/// A matched round trip.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Trade {
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub size_fraction: f64,
    pub stop_loss_price: f64,
}

impl Trade {
    /// (exit - entry) / entry, before commission.
    pub fn gross_return(&self) -> f64 {
        (self.exit_price - self.entry_price) / self.entry_price
    }

    pub fn is_win(&self) -> bool {
        self.exit_price > self.entry_price
    }

    pub fn bars_held(&self) -> usize {
        self.exit_index - self.entry_index
    }
}

/// An entry with no exit before the series ended.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct OpenTrade {
    pub entry_index: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub size_fraction: f64,
    pub stop_loss_price: f64,
}
