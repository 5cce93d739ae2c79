//! ATR-based position sizing and stop placement.
//!
//! The stop sits `atr * atr_multiplier` below the close, and the position is
//! sized so that hitting the stop loses `risk_per_trade` of capital, capped
//! at full allocation.

use crate::domain::error::SigtraderError;
use crate::domain::indicator::IndicatorFrame;
use crate::domain::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SizingDecision {
    pub position_fraction: f64,
    pub stop_loss_price: f64,
}

impl SizingDecision {
    pub fn is_sized(&self) -> bool {
        self.position_fraction > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSizer {
    risk_per_trade: f64,
    atr_multiplier: f64,
}

impl PositionSizer {
    pub fn new(risk_per_trade: f64, atr_multiplier: f64) -> Result<Self, SigtraderError> {
        if !(risk_per_trade > 0.0 && risk_per_trade <= 1.0) {
            return Err(SigtraderError::invalid(
                "strategy",
                "risk_per_trade",
                "risk_per_trade must be in (0, 1]",
            ));
        }
        if !(atr_multiplier > 0.0 && atr_multiplier.is_finite()) {
            return Err(SigtraderError::invalid(
                "strategy",
                "atr_multiplier",
                "atr_multiplier must be positive",
            ));
        }
        Ok(Self {
            risk_per_trade,
            atr_multiplier,
        })
    }

    pub fn risk_per_trade(&self) -> f64 {
        self.risk_per_trade
    }

    pub fn atr_multiplier(&self) -> f64 {
        self.atr_multiplier
    }

    /// Sizes from a raw ATR and close.
    pub fn size_at(&self, atr: f64, close: f64) -> SizingDecision {
        if !(atr > 0.0) || !(close > 0.0) {
            return SizingDecision::default();
        }
        let risk_distance = atr * self.atr_multiplier;
        let risk_distance_pct = risk_distance / close;
        SizingDecision {
            position_fraction: (self.risk_per_trade / risk_distance_pct).min(1.0),
            stop_loss_price: close - risk_distance,
        }
    }

    /// Sizing for `bar_index`; zeros unless the bar is a Buy with a positive ATR.
    pub fn size(
        &self,
        frame: &IndicatorFrame,
        signals: &[Signal],
        bar_index: usize,
    ) -> SizingDecision {
        if signals.get(bar_index) != Some(&Signal::Buy) {
            return SizingDecision::default();
        }
        match (frame.atr.value_at(bar_index), frame.close(bar_index)) {
            (Some(atr), Some(close)) => self.size_at(atr, close),
            _ => SizingDecision::default(),
        }
    }

    pub fn size_all(&self, frame: &IndicatorFrame, signals: &[Signal]) -> Vec<SizingDecision> {
        (0..frame.len())
            .map(|i| self.size(frame, signals, i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn flat_series(kind: IndicatorType, values: &[Option<f64>]) -> IndicatorSeries {
        IndicatorSeries {
            indicator_type: kind,
            values: values
                .iter()
                .enumerate()
                .map(|(i, v)| IndicatorPoint {
                    date: NaiveDate::from_ymd_opt(2024, 1, 1 + i as u32).unwrap(),
                    valid: v.is_some(),
                    value: v.unwrap_or(0.0),
                })
                .collect(),
        }
    }

    fn frame_with_atr(closes: &[f64], atr: &[Option<f64>]) -> IndicatorFrame {
        let ones: Vec<Option<f64>> = closes.iter().map(|_| Some(1.0)).collect();
        IndicatorFrame {
            closes: closes.to_vec(),
            ma_fast: flat_series(IndicatorType::Ema(2), &ones),
            ma_slow: flat_series(IndicatorType::Ema(3), &ones),
            rsi: flat_series(IndicatorType::Rsi(3), &ones),
            atr: flat_series(IndicatorType::Atr(3), atr),
        }
    }

    #[test]
    fn worked_example() {
        let sizer = PositionSizer::new(0.02, 1.5).unwrap();
        let frame = frame_with_atr(&[100.0], &[Some(2.0)]);
        let decision = sizer.size(&frame, &[Signal::Buy], 0);

        // risk distance 3.0 → 3% of price
        assert_relative_eq!(decision.position_fraction, 0.02 / 0.03, epsilon = 1e-12);
        assert_relative_eq!(decision.stop_loss_price, 97.0, epsilon = 1e-12);
    }

    #[test]
    fn fraction_capped_at_full_allocation() {
        let sizer = PositionSizer::new(0.5, 1.0).unwrap();
        let decision = sizer.size_at(1.0, 100.0);
        assert_relative_eq!(decision.position_fraction, 1.0);
        assert_relative_eq!(decision.stop_loss_price, 99.0);
    }

    #[test]
    fn non_buy_bars_are_zero() {
        let sizer = PositionSizer::new(0.02, 1.5).unwrap();
        let frame = frame_with_atr(&[100.0, 100.0], &[Some(2.0), Some(2.0)]);
        let signals = [Signal::Sell, Signal::Hold];
        assert_eq!(sizer.size(&frame, &signals, 0), SizingDecision::default());
        assert_eq!(sizer.size(&frame, &signals, 1), SizingDecision::default());
    }

    #[test]
    fn zero_or_missing_atr_is_zero() {
        let sizer = PositionSizer::new(0.02, 1.5).unwrap();
        let frame = frame_with_atr(&[100.0, 100.0], &[None, Some(0.0)]);
        let signals = [Signal::Buy, Signal::Buy];
        let sized = sizer.size_all(&frame, &signals);
        assert!(sized.iter().all(|d| !d.is_sized()));
        assert_eq!(sized[1].stop_loss_price, 0.0);
    }

    #[test]
    fn out_of_range_index_is_zero() {
        let sizer = PositionSizer::new(0.02, 1.5).unwrap();
        let frame = frame_with_atr(&[100.0], &[Some(2.0)]);
        assert_eq!(sizer.size(&frame, &[Signal::Buy], 3), SizingDecision::default());
    }

    #[test]
    fn rejects_non_positive_risk() {
        let err = PositionSizer::new(0.0, 1.5).unwrap_err();
        assert!(matches!(
            err,
            SigtraderError::ConfigInvalid { ref key, .. } if key == "risk_per_trade"
        ));
        assert!(PositionSizer::new(1.5, 1.5).is_err());
    }

    #[test]
    fn rejects_non_positive_multiplier() {
        let err = PositionSizer::new(0.02, 0.0).unwrap_err();
        assert!(matches!(
            err,
            SigtraderError::ConfigInvalid { ref key, .. } if key == "atr_multiplier"
        ));
        assert!(PositionSizer::new(0.02, -1.0).is_err());
    }
}
