//! Strategy configuration and composition.
//!
//! A `Strategy` is a validated parameter set; `evaluate` runs indicators,
//! signals, sizing and the position state machine over one series.

use crate::domain::error::SigtraderError;
use crate::domain::indicator::{self, IndicatorFrame, IndicatorParams};
use crate::domain::position::{self, PositionState};
use crate::domain::series::Series;
use crate::domain::signal::{self, Signal, Thresholds};
use crate::domain::sizing::{PositionSizer, SizingDecision};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StrategyParams {
    pub indicators: IndicatorParams,
    pub thresholds: Thresholds,
    pub atr_multiplier: f64,
    pub risk_per_trade: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            indicators: IndicatorParams::default(),
            thresholds: Thresholds::default(),
            atr_multiplier: 1.5,
            risk_per_trade: 0.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    params: StrategyParams,
    sizer: PositionSizer,
}

impl Strategy {
    pub fn new(params: StrategyParams) -> Result<Self, SigtraderError> {
        params.indicators.validate()?;
        params.thresholds.validate()?;
        let sizer = PositionSizer::new(params.risk_per_trade, params.atr_multiplier)?;
        Ok(Self { params, sizer })
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    pub fn minimum_bars(&self) -> usize {
        self.params.indicators.minimum_bars()
    }

    pub fn evaluate(&self, series: &Series) -> Result<StrategyRun, SigtraderError> {
        let frame = indicator::calculate(series, &self.params.indicators)?;
        let signals = signal::generate(&frame, &self.params.thresholds);
        let sizing = self.sizer.size_all(&frame, &signals);
        let states = position::fold_states(&signals);
        let realized = position::realize(&states);

        Ok(StrategyRun {
            frame,
            signals,
            sizing,
            states,
            realized,
        })
    }
}

/// Everything derived from one series before simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyRun {
    pub frame: IndicatorFrame,
    pub signals: Vec<Signal>,
    pub sizing: Vec<SizingDecision>,
    /// State after each bar's own signal.
    pub states: Vec<PositionState>,
    /// `states` shifted one bar; what returns are attributed to.
    pub realized: Vec<PositionState>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StrategySummary {
    pub buy_signals: usize,
    pub sell_signals: usize,
    pub bars_invested: usize,
    pub total_bars: usize,
    pub average_atr: f64,
    pub average_atr_pct: f64,
}

impl StrategyRun {
    pub fn latest_signal(&self) -> Option<Signal> {
        self.signals.last().copied()
    }

    pub fn latest_position(&self) -> Option<PositionState> {
        self.realized.last().copied()
    }

    pub fn summary(&self) -> StrategySummary {
        let buy_signals = self.signals.iter().filter(|s| **s == Signal::Buy).count();
        let sell_signals = self.signals.iter().filter(|s| **s == Signal::Sell).count();
        let bars_invested = self.realized.iter().filter(|p| p.is_long()).count();

        let atrs: Vec<f64> = (0..self.frame.len())
            .filter_map(|i| self.frame.atr.value_at(i))
            .collect();
        let average_atr = if atrs.is_empty() {
            0.0
        } else {
            atrs.iter().sum::<f64>() / atrs.len() as f64
        };
        let average_close = if self.frame.is_empty() {
            0.0
        } else {
            self.frame.closes.iter().sum::<f64>() / self.frame.len() as f64
        };
        let average_atr_pct = if average_close > 0.0 {
            average_atr / average_close
        } else {
            0.0
        };

        StrategySummary {
            buy_signals,
            sell_signals,
            bars_invested,
            total_bars: self.frame.len(),
            average_atr,
            average_atr_pct,
        }
    }
}
