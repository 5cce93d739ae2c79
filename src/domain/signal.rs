//! Threshold rules turning an indicator frame into per-bar signals.

use crate::domain::error::SigtraderError;
use crate::domain::indicator::{IndicatorFrame, IndicatorRow};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}

/// RSI band: buys need RSI strictly inside (oversold, overbought),
/// RSI above overbought forces a sell.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Thresholds {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            rsi_oversold: 40.0,
            rsi_overbought: 85.0,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), SigtraderError> {
        for (key, value) in [
            ("rsi_oversold", self.rsi_oversold),
            ("rsi_overbought", self.rsi_overbought),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(SigtraderError::invalid(
                    "strategy",
                    key,
                    format!("{key} must be between 0 and 100"),
                ));
            }
        }
        if self.rsi_oversold >= self.rsi_overbought {
            return Err(SigtraderError::invalid(
                "strategy",
                "rsi_oversold",
                "rsi_oversold must be below rsi_overbought",
            ));
        }
        Ok(())
    }

    pub fn is_buy(&self, row: &IndicatorRow) -> bool {
        row.ma_fast > row.ma_slow
            && row.rsi > self.rsi_oversold
            && row.rsi < self.rsi_overbought
    }

    pub fn is_sell(&self, row: &IndicatorRow) -> bool {
        row.ma_fast < row.ma_slow || row.rsi > self.rsi_overbought
    }

    /// Classifies one bar. Sell wins when both conditions hold.
    pub fn classify(&self, row: &IndicatorRow) -> Signal {
        if self.is_sell(row) {
            Signal::Sell
        } else if self.is_buy(row) {
            Signal::Buy
        } else {
            Signal::Hold
        }
    }
}

/// One signal per bar. Bars where any indicator is still warming up are `Hold`.
pub fn generate(frame: &IndicatorFrame, thresholds: &Thresholds) -> Vec<Signal> {
    (0..frame.len())
        .map(|i| match frame.row(i) {
            Some(row) => thresholds.classify(&row),
            None => Signal::Hold,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(ma_fast: f64, ma_slow: f64, rsi: f64) -> IndicatorRow {
        IndicatorRow {
            ma_fast,
            ma_slow,
            rsi,
            atr: 1.0,
        }
    }

    #[test]
    fn buy_when_trend_up_and_rsi_in_band() {
        let t = Thresholds::default();
        assert_eq!(t.classify(&row(101.0, 100.0, 60.0)), Signal::Buy);
    }

    #[test]
    fn rsi_band_is_exclusive() {
        let t = Thresholds::default();
        assert_eq!(t.classify(&row(101.0, 100.0, 40.0)), Signal::Hold);
        assert_eq!(t.classify(&row(101.0, 100.0, 85.0)), Signal::Hold);
    }

    #[test]
    fn sell_on_downtrend() {
        let t = Thresholds::default();
        assert_eq!(t.classify(&row(99.0, 100.0, 60.0)), Signal::Sell);
    }

    #[test]
    fn sell_on_overbought_even_in_uptrend() {
        let t = Thresholds::default();
        assert_eq!(t.classify(&row(101.0, 100.0, 90.0)), Signal::Sell);
    }

    #[test]
    fn classify_never_reports_buy_on_a_sell_bar() {
        let t = Thresholds {
            rsi_oversold: 10.0,
            rsi_overbought: 50.0,
        };
        for fast in [99.0, 100.0, 101.0] {
            for rsi in [5.0, 10.0, 30.0, 49.0, 50.0, 51.0, 95.0] {
                let r = row(fast, 100.0, rsi);
                let signal = t.classify(&r);
                if t.is_sell(&r) {
                    assert_eq!(signal, Signal::Sell);
                } else if t.is_buy(&r) {
                    assert_eq!(signal, Signal::Buy);
                } else {
                    assert_eq!(signal, Signal::Hold);
                }
            }
        }
    }

    #[test]
    fn equal_averages_low_rsi_is_hold() {
        let t = Thresholds::default();
        assert_eq!(t.classify(&row(100.0, 100.0, 30.0)), Signal::Hold);
    }

    #[test]
    fn thresholds_out_of_range() {
        let t = Thresholds {
            rsi_oversold: -1.0,
            rsi_overbought: 85.0,
        };
        assert!(matches!(
            t.validate().unwrap_err(),
            SigtraderError::ConfigInvalid { ref key, .. } if key == "rsi_oversold"
        ));

        let t = Thresholds {
            rsi_oversold: 40.0,
            rsi_overbought: 101.0,
        };
        assert!(matches!(
            t.validate().unwrap_err(),
            SigtraderError::ConfigInvalid { ref key, .. } if key == "rsi_overbought"
        ));
    }

    #[test]
    fn thresholds_must_be_ordered() {
        let t = Thresholds {
            rsi_oversold: 70.0,
            rsi_overbought: 30.0,
        };
        assert!(t.validate().unwrap_err().is_config_error());
    }

    #[test]
    fn signal_display() {
        assert_eq!(Signal::Buy.to_string(), "BUY");
        assert_eq!(Signal::Sell.to_string(), "SELL");
        assert_eq!(Signal::Hold.to_string(), "HOLD");
    }
}
