//! Performance metrics over an equity curve and its matched trades.

use super::backtest::EquityPoint;
use super::position::Trade;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Metrics {
    pub total_return_strategy: f64,
    pub total_return_market: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    /// Deepest decline from the running peak; zero or negative.
    pub max_drawdown: f64,
    /// Longest run of bars spent below the running peak.
    pub max_drawdown_duration: usize,
    pub num_trades: usize,
    /// Gross: commission is not subtracted when deciding a win.
    pub win_rate: f64,
    pub profit_factor: f64,
    pub average_trade_return: f64,
    pub total_commission: f64,
    pub final_portfolio_value: f64,
    /// Fraction of bars spent Long.
    pub exposure: f64,
    pub has_open_trade: bool,
}

impl Metrics {
    pub fn compute(curve: &[EquityPoint], trades: &[Trade], initial_capital: f64) -> Self {
        let (total_return_strategy, total_return_market, final_portfolio_value, has_open_trade) =
            match curve.last() {
                Some(last) => (
                    last.cumulative_strategy - 1.0,
                    last.cumulative_market - 1.0,
                    last.portfolio_value,
                    last.position.is_long(),
                ),
                None => (0.0, 0.0, initial_capital, false),
            };

        // bar 0 has no return
        let returns: Vec<f64> = curve.iter().skip(1).map(|p| p.strategy_return).collect();

        let years = returns.len() as f64 / TRADING_DAYS_PER_YEAR;
        let growth = 1.0 + total_return_strategy;
        let annualized_return = if years > 0.0 && growth > 0.0 && growth.is_finite() {
            growth.powf(1.0 / years) - 1.0
        } else if growth <= 0.0 {
            -1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(curve);
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(&returns);

        let num_trades = trades.len();
        let wins = trades.iter().filter(|t| t.is_win()).count();
        let win_rate = if num_trades > 0 {
            wins as f64 / num_trades as f64
        } else {
            0.0
        };

        let mut total_gains = 0.0_f64;
        let mut total_losses = 0.0_f64;
        for trade in trades {
            let r = trade.gross_return();
            if r > 0.0 {
                total_gains += r;
            } else {
                total_losses += r.abs();
            }
        }
        let profit_factor = if total_losses > 0.0 {
            total_gains / total_losses
        } else if total_gains > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };
        let average_trade_return = if num_trades > 0 {
            trades.iter().map(Trade::gross_return).sum::<f64>() / num_trades as f64
        } else {
            0.0
        };

        let total_commission =
            initial_capital * curve.iter().map(|p| p.commission.abs()).sum::<f64>();

        let exposure = if curve.is_empty() {
            0.0
        } else {
            curve.iter().filter(|p| p.position.is_long()).count() as f64 / curve.len() as f64
        };

        Metrics {
            total_return_strategy,
            total_return_market,
            annualized_return,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            num_trades,
            win_rate,
            profit_factor,
            average_trade_return,
            total_commission,
            final_portfolio_value,
            exposure,
            has_open_trade,
        }
    }
}

/// Returns (max_drawdown, longest underwater run in bars).
pub fn compute_drawdown(curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.cumulative_strategy;
    let mut max_dd = 0.0_f64;
    let mut duration = 0usize;
    let mut max_duration = 0usize;

    for point in curve {
        let value = point.cumulative_strategy;
        if value >= peak {
            peak = value;
            duration = 0;
        } else if peak > 0.0 {
            let dd = (value - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
            duration += 1;
            max_duration = max_duration.max(duration);
        }
    }

    (max_dd, max_duration)
}

/// Annualized (sharpe, sortino) with a zero risk-free rate.
///
/// Sharpe uses the sample standard deviation. Both are 0 with fewer than two
/// observations or zero dispersion.
pub fn compute_risk_adjusted(returns: &[f64]) -> (f64, f64) {
    if returns.len() < 2 {
        return (0.0, 0.0);
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    let sharpe = if stddev > 0.0 {
        (mean / stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let downside = returns
        .iter()
        .filter(|&&r| r < 0.0)
        .map(|r| r.powi(2))
        .sum::<f64>()
        / n;
    let downside_stddev = downside.sqrt();

    let sortino = if downside_stddev > 0.0 {
        (mean / downside_stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    (sharpe, sortino)
}
