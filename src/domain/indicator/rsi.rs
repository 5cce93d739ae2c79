//! RSI (Relative Strength Index) indicator implementation.
//!
//! gain[i] = max(C[i] - C[i-1], 0), loss[i] = max(C[i-1] - C[i], 0) for i >= 1.
//! Average gain/loss are the EMA(n) of those sequences, seeded at bar 1.
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: bar 0 and the first (n-1) bars are invalid.

use crate::domain::indicator::ema::ema_recurrence;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

pub fn calculate_rsi(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.len() < 2 {
        let values: Vec<IndicatorPoint> = bars
            .iter()
            .map(|b| IndicatorPoint {
                date: b.date,
                valid: false,
                value: 0.0,
            })
            .collect();

        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values,
        };
    }

    let mut gains: Vec<f64> = Vec::with_capacity(bars.len() - 1);
    let mut losses: Vec<f64> = Vec::with_capacity(bars.len() - 1);

    for pair in bars.windows(2) {
        let change = pair[1].close - pair[0].close;
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let avg_gains = ema_recurrence(&gains, period);
    let avg_losses = ema_recurrence(&losses, period);
    let first_valid = (period - 1).max(1);

    let mut values = Vec::with_capacity(bars.len());
    values.push(IndicatorPoint {
        date: bars[0].date,
        valid: false,
        value: 0.0,
    });

    for (i, bar) in bars.iter().enumerate().skip(1) {
        values.push(IndicatorPoint {
            date: bar.date,
            valid: i >= first_valid,
            value: rsi_from_averages(avg_gains[i - 1], avg_losses[i - 1]),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}
