//! Walk-forward evaluation: rolling train/test windows over one series.
//!
//! Window k trains on `[s, s + train)` and tests on `[s + train, s + train + test)`
//! with `s = k * test`. Train windows overlap; test windows never do.

use chrono::NaiveDate;
use rayon::prelude::*;

use super::backtest::{BacktestConfig, run_backtest};
use super::error::SigtraderError;
use super::metrics::Metrics;
use super::series::Series;
use super::strategy::{Strategy, StrategyParams};
use crate::ports::optimizer_port::OptimizerPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct WalkForwardConfig {
    pub train_months: usize,
    pub test_months: usize,
    /// Trading bars per month.
    pub month_length_bars: usize,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            train_months: 24,
            test_months: 6,
            month_length_bars: 21,
        }
    }
}

impl WalkForwardConfig {
    pub fn validate(&self) -> Result<(), SigtraderError> {
        for (key, value) in [
            ("train_months", self.train_months),
            ("test_months", self.test_months),
            ("month_length_bars", self.month_length_bars),
        ] {
            if value == 0 {
                return Err(SigtraderError::invalid(
                    "walkforward",
                    key,
                    format!("{key} must be at least 1"),
                ));
            }
        }

        let train = self.train_months.checked_mul(self.month_length_bars);
        let test = self.test_months.checked_mul(self.month_length_bars);
        let Some(train) = train else {
            return Err(SigtraderError::invalid(
                "walkforward",
                "train_months",
                "train window length overflows",
            ));
        };
        if test.and_then(|test| test.checked_add(train)).is_none() {
            return Err(SigtraderError::invalid(
                "walkforward",
                "test_months",
                "test window length overflows",
            ));
        }
        Ok(())
    }

    /// Saturates instead of overflowing; `validate` rejects configs where
    /// that would matter.
    pub fn train_bars(&self) -> usize {
        self.train_months.saturating_mul(self.month_length_bars)
    }

    pub fn test_bars(&self) -> usize {
        self.test_months.saturating_mul(self.month_length_bars)
    }

    /// Bar index ranges for every window that fits in `total_bars`.
    pub fn windows(&self, total_bars: usize) -> impl Iterator<Item = WindowSpec> + use<> {
        let train = self.train_bars();
        let test = self.test_bars();
        (0..)
            .map(move |index: usize| {
                let train_start = index.checked_mul(test)?;
                let train_end = train_start.checked_add(train)?;
                Some(WindowSpec {
                    index,
                    train_start,
                    train_end,
                    test_start: train_end,
                    test_end: train_end.checked_add(test)?,
                })
            })
            .take_while(move |spec| {
                test > 0 && matches!(spec, Some(s) if s.test_end <= total_bars)
            })
            .flatten()
    }
}

/// Bar index ranges of one window; ends are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct WindowSpec {
    pub index: usize,
    pub train_start: usize,
    pub train_end: usize,
    pub test_start: usize,
    pub test_end: usize,
}

impl WindowSpec {
    pub fn test_len(&self) -> usize {
        self.test_end - self.test_start
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct WindowResult {
    pub spec: WindowSpec,
    pub test_start_date: NaiveDate,
    pub test_end_date: NaiveDate,
    pub params: StrategyParams,
    /// Out-of-sample metrics over the test slice only.
    pub metrics: Metrics,
}

pub struct WalkForwardHarness<'a, O: OptimizerPort + ?Sized> {
    config: WalkForwardConfig,
    backtest: BacktestConfig,
    optimizer: &'a O,
}

impl<'a, O: OptimizerPort + ?Sized> WalkForwardHarness<'a, O> {
    pub fn new(
        config: WalkForwardConfig,
        backtest: BacktestConfig,
        optimizer: &'a O,
    ) -> Result<Self, SigtraderError> {
        config.validate()?;
        backtest.validate()?;
        Ok(Self {
            config,
            backtest,
            optimizer,
        })
    }

    pub fn config(&self) -> &WalkForwardConfig {
        &self.config
    }

    pub fn windows(&self, total_bars: usize) -> impl Iterator<Item = WindowSpec> + '_ {
        self.config.windows(total_bars)
    }

    /// Lazily evaluates each window in order. Calling `run` again restarts
    /// from the first window.
    pub fn run<'s>(
        &'s self,
        series: &'s Series,
    ) -> impl Iterator<Item = Result<WindowResult, SigtraderError>> + 's {
        self.config
            .windows(series.len())
            .map(move |spec| self.run_window(series, spec))
    }

    pub fn run_window(
        &self,
        series: &Series,
        spec: WindowSpec,
    ) -> Result<WindowResult, SigtraderError> {
        let train = series.slice(spec.train_start..spec.train_end);
        let test = series.slice(spec.test_start..spec.test_end);

        let params = self.optimizer.optimize(&train)?;
        let strategy = Strategy::new(params)?;
        let result = run_backtest(&test, &strategy, &self.backtest)?;

        let (test_start_date, test_end_date) = match (test.bars().first(), test.last()) {
            (Some(first), Some(last)) => (first.date, last.date),
            _ => {
                return Err(SigtraderError::InsufficientData {
                    bars: 0,
                    minimum: spec.test_len(),
                });
            }
        };

        tracing::info!(
            window = spec.index,
            train = ?(spec.train_start..spec.train_end),
            test = ?(spec.test_start..spec.test_end),
            sharpe = result.metrics.sharpe_ratio,
            total_return = result.metrics.total_return_strategy,
            "walk-forward window evaluated"
        );

        Ok(WindowResult {
            spec,
            test_start_date,
            test_end_date,
            params,
            metrics: result.metrics,
        })
    }
}

impl<O: OptimizerPort + Sync + ?Sized> WalkForwardHarness<'_, O> {
    /// Evaluates every window on the rayon pool. Results are ordered by
    /// window index; the first failing window's error is returned.
    pub fn run_parallel(&self, series: &Series) -> Result<Vec<WindowResult>, SigtraderError> {
        let specs: Vec<WindowSpec> = self.config.windows(series.len()).collect();
        tracing::debug!(windows = specs.len(), "evaluating walk-forward windows in parallel");
        specs
            .into_par_iter()
            .map(|spec| self.run_window(series, spec))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct WalkForwardSummary {
    pub windows: usize,
    pub mean_oos_sharpe: f64,
    pub median_oos_sharpe: f64,
    pub mean_total_return: f64,
    /// Product of (1 + window return) - 1 across windows.
    pub compounded_return: f64,
    pub profitable_fraction: f64,
    pub total_trades: usize,
}

impl WalkForwardSummary {
    pub fn from_windows(results: &[WindowResult]) -> Self {
        let n = results.len();
        if n == 0 {
            return Self {
                windows: 0,
                mean_oos_sharpe: 0.0,
                median_oos_sharpe: 0.0,
                mean_total_return: 0.0,
                compounded_return: 0.0,
                profitable_fraction: 0.0,
                total_trades: 0,
            };
        }

        let mut sharpes: Vec<f64> = results.iter().map(|r| r.metrics.sharpe_ratio).collect();
        let mean_oos_sharpe = sharpes.iter().sum::<f64>() / n as f64;
        sharpes.sort_by(f64::total_cmp);
        let median_oos_sharpe = if n % 2 == 1 {
            sharpes[n / 2]
        } else {
            (sharpes[n / 2 - 1] + sharpes[n / 2]) / 2.0
        };

        let returns = results.iter().map(|r| r.metrics.total_return_strategy);
        let mean_total_return = returns.clone().sum::<f64>() / n as f64;
        let compounded_return = returns.clone().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;
        let profitable_fraction = returns.filter(|r| *r > 0.0).count() as f64 / n as f64;

        Self {
            windows: n,
            mean_oos_sharpe,
            median_oos_sharpe,
            mean_total_return,
            compounded_return,
            profitable_fraction,
            total_trades: results.iter().map(|r| r.metrics.num_trades).sum(),
        }
    }
}
