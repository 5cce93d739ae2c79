//! Average True Range as a simple rolling mean of true range.
//!
//! TR[0] = H[0] - L[0]; TR[i] = max(H-L, |H-C[i-1]|, |L-C[i-1]|).
//! ATR[i] = mean(TR[i-n+1..=i]); the first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;

pub fn true_ranges(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect()
}

pub fn calculate_atr(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries {
            indicator_type: IndicatorType::Atr(period),
            values: vec![],
        };
    }

    let tr_values = true_ranges(bars);
    let mut results: Vec<IndicatorPoint> = Vec::with_capacity(bars.len());
    let mut window_sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        window_sum += tr_values[i];
        if i >= period {
            window_sum -= tr_values[i - period];
        }

        if i + 1 < period {
            results.push(IndicatorPoint {
                date: bar.date,
                valid: false,
                value: 0.0,
            });
        } else {
            results.push(IndicatorPoint {
                date: bar.date,
                valid: true,
                value: window_sum / period as f64,
            });
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values: results,
    }
}
