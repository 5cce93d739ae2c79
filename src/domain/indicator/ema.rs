//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed EMA[0] = C[0], then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! The recurrence runs over the whole series; the first (n-1) points are
//! flagged invalid but still carry the running value.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;

/// Smoothing factor for a span.
pub fn smoothing_factor(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// Applies the EMA recurrence to `values`, seeded with the first value.
pub fn ema_recurrence(values: &[f64], span: usize) -> Vec<f64> {
    let k = smoothing_factor(span);
    let mut out = Vec::with_capacity(values.len());
    let mut iter = values.iter();
    let Some(&first) = iter.next() else {
        return out;
    };
    let mut ema = first;
    out.push(ema);
    for &v in iter {
        ema = v * k + ema * (1.0 - k);
        out.push(ema);
    }
    out
}

pub fn calculate_ema(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries {
            indicator_type: IndicatorType::Ema(period),
            values: Vec::new(),
        };
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let values = ema_recurrence(&closes, period)
        .into_iter()
        .zip(bars)
        .enumerate()
        .map(|(i, (ema, bar))| IndicatorPoint {
            date: bar.date,
            valid: i + 1 >= period,
            value: ema,
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}
