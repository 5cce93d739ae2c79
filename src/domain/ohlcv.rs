//! OHLCV bar representation.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl PriceBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// Checks the per-bar invariants, returning a reason on failure.
    pub fn check(&self) -> Result<(), String> {
        let prices = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        for (name, value) in prices {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{name} must be positive, got {value}"));
            }
        }
        if self.volume < 0 {
            return Err(format!("volume must be non-negative, got {}", self.volume));
        }
        if self.high < self.open.max(self.close).max(self.low) {
            return Err(format!(
                "high {} below open/close/low",
                self.high
            ));
        }
        if self.low > self.open.min(self.close).min(self.high) {
            return Err(format!("low {} above open/close/high", self.low));
        }
        Ok(())
    }
}
