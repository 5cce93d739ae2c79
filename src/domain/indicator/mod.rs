//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorType`: Enum for indicator identity + parameters
//! - `IndicatorSeries`: A time series of indicator values
//! - `IndicatorFrame`: The four series a strategy needs, aligned with its input

pub mod atr;
pub mod ema;
pub mod rsi;

use chrono::NaiveDate;
use std::fmt;

use crate::domain::error::SigtraderError;
use crate::domain::series::Series;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Ema(usize),
    Rsi(usize),
    Atr(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// The value at bar `i`, or `None` inside the warm-up window.
    pub fn value_at(&self, i: usize) -> Option<f64> {
        self.values
            .get(i)
            .filter(|p| p.valid)
            .map(|p| p.value)
    }

    /// Number of leading invalid points.
    pub fn warmup_len(&self) -> usize {
        self.values.iter().take_while(|p| !p.valid).count()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
        }
    }
}

/// Periods for the four indicators the strategy reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IndicatorParams {
    pub ma_fast_span: usize,
    pub ma_slow_span: usize,
    pub rsi_period: usize,
    pub atr_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        IndicatorParams {
            ma_fast_span: 20,
            ma_slow_span: 50,
            rsi_period: 14,
            atr_period: 14,
        }
    }
}

impl IndicatorParams {
    pub fn validate(&self) -> Result<(), SigtraderError> {
        let periods = [
            ("ma_fast", self.ma_fast_span),
            ("ma_slow", self.ma_slow_span),
            ("rsi_period", self.rsi_period),
            ("atr_period", self.atr_period),
        ];
        for (key, value) in periods {
            if value == 0 {
                return Err(SigtraderError::invalid(
                    "strategy",
                    key,
                    format!("{key} must be at least 1"),
                ));
            }
        }
        Ok(())
    }

    /// Fewest bars a series needs before indicators can be calculated.
    pub fn minimum_bars(&self) -> usize {
        self.ma_fast_span
            .max(self.ma_slow_span)
            .max(self.rsi_period)
            .max(self.atr_period)
            + 1
    }
}

/// One bar's worth of indicator values, present only once every indicator
/// has left its warm-up window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorRow {
    pub ma_fast: f64,
    pub ma_slow: f64,
    pub rsi: f64,
    pub atr: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFrame {
    pub closes: Vec<f64>,
    pub ma_fast: IndicatorSeries,
    pub ma_slow: IndicatorSeries,
    pub rsi: IndicatorSeries,
    pub atr: IndicatorSeries,
}

impl IndicatorFrame {
    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn close(&self, i: usize) -> Option<f64> {
        self.closes.get(i).copied()
    }

    pub fn date(&self, i: usize) -> Option<NaiveDate> {
        self.ma_fast.values.get(i).map(|p| p.date)
    }

    pub fn row(&self, i: usize) -> Option<IndicatorRow> {
        Some(IndicatorRow {
            ma_fast: self.ma_fast.value_at(i)?,
            ma_slow: self.ma_slow.value_at(i)?,
            rsi: self.rsi.value_at(i)?,
            atr: self.atr.value_at(i)?,
        })
    }
}

/// Computes the full indicator frame for `series`.
///
/// Fails with `InsufficientData` when the series is shorter than
/// `params.minimum_bars()`.
pub fn calculate(
    series: &Series,
    params: &IndicatorParams,
) -> Result<IndicatorFrame, SigtraderError> {
    params.validate()?;
    let minimum = params.minimum_bars();
    if series.len() < minimum {
        return Err(SigtraderError::InsufficientData {
            bars: series.len(),
            minimum,
        });
    }

    let bars = series.bars();
    let frame = IndicatorFrame {
        closes: series.closes(),
        ma_fast: ema::calculate_ema(bars, params.ma_fast_span),
        ma_slow: ema::calculate_ema(bars, params.ma_slow_span),
        rsi: rsi::calculate_rsi(bars, params.rsi_period),
        atr: atr::calculate_atr(bars, params.atr_period),
    };

    tracing::debug!(
        bars = frame.len(),
        ma_fast = %frame.ma_fast.indicator_type,
        ma_slow = %frame.ma_slow.indicator_type,
        rsi = %frame.rsi.indicator_type,
        atr = %frame.atr.indicator_type,
        "indicators calculated"
    );

    Ok(frame)
}
