//! Validated, immutable price series.

use std::ops::Range;

use super::error::SigtraderError;
use super::ohlcv::PriceBar;

/// An ordered sequence of bars with strictly increasing dates.
///
/// Construction validates every bar, so downstream code can index freely.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    bars: Vec<PriceBar>,
}

impl Series {
    pub fn new(bars: Vec<PriceBar>) -> Result<Self, SigtraderError> {
        for (index, bar) in bars.iter().enumerate() {
            bar.check()
                .map_err(|reason| SigtraderError::InvalidBar { index, reason })?;
        }
        for (i, pair) in bars.windows(2).enumerate() {
            if pair[1].date <= pair[0].date {
                return Err(SigtraderError::NonMonotonicTimestamps {
                    index: i + 1,
                    previous: pair[0].date,
                    current: pair[1].date,
                });
            }
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Owned sub-series over `range`, clamped to the series bounds.
    pub fn slice(&self, range: Range<usize>) -> Series {
        let end = range.end.min(self.bars.len());
        let start = range.start.min(end);
        Series {
            bars: self.bars[start..end].to_vec(),
        }
    }

    /// close[i] / close[i-1] - 1; `None` at bar 0.
    pub fn returns(&self) -> Vec<Option<f64>> {
        let mut out = Vec::with_capacity(self.bars.len());
        for (i, bar) in self.bars.iter().enumerate() {
            if i == 0 {
                out.push(None);
            } else {
                out.push(Some(bar.close / self.bars[i - 1].close - 1.0));
            }
        }
        out
    }
}
