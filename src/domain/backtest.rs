//! Backtest simulation over a realized position timeline.
//!
//! Returns are attributed close-to-close: the position realized at bar i
//! earns close[i]/close[i-1] - 1. Commission is charged as a flat return
//! deduction on every bar where the realized position changes.

use chrono::NaiveDate;

use super::error::SigtraderError;
use super::metrics::Metrics;
use super::position::{self, OpenTrade, PositionState, Trade, Transition};
use super::series::Series;
use super::sizing::SizingDecision;
use super::strategy::{Strategy, StrategyRun};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Fraction of capital deducted per entry or exit.
    pub commission_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 10_000.0,
            commission_rate: 0.001,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), SigtraderError> {
        if !(self.initial_capital > 0.0 && self.initial_capital.is_finite()) {
            return Err(SigtraderError::invalid(
                "backtest",
                "initial_capital",
                "initial_capital must be positive",
            ));
        }
        if !(0.0..1.0).contains(&self.commission_rate) {
            return Err(SigtraderError::invalid(
                "backtest",
                "commission",
                "commission must be in [0, 1)",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub position: PositionState,
    /// `None` at bar 0.
    pub market_return: Option<f64>,
    pub strategy_return: f64,
    /// Commission deducted on this bar, as a fraction of capital.
    pub commission: f64,
    pub cumulative_strategy: f64,
    pub cumulative_market: f64,
    pub portfolio_value: f64,
}

/// Output of one simulation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    pub curve: Vec<EquityPoint>,
    pub trades: Vec<Trade>,
    pub open_trade: Option<OpenTrade>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSimulator {
    config: BacktestConfig,
}

impl BacktestSimulator {
    pub fn new(config: BacktestConfig) -> Result<Self, SigtraderError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Replays `realized` against `series`.
    ///
    /// `sizing` is indexed by bar; the decision on the bar before an entry
    /// is attached to the resulting trade. Missing entries count as unsized.
    pub fn run(
        &self,
        series: &Series,
        realized: &[PositionState],
        sizing: &[SizingDecision],
    ) -> Result<Simulation, SigtraderError> {
        if series.len() < 2 {
            return Err(SigtraderError::InsufficientData {
                bars: series.len(),
                minimum: 2,
            });
        }
        if realized.len() != series.len() {
            return Err(SigtraderError::LengthMismatch {
                positions: realized.len(),
                bars: series.len(),
            });
        }

        let bars = series.bars();
        let market_returns = series.returns();
        let rate = self.config.commission_rate;

        let mut curve = Vec::with_capacity(bars.len());
        let mut trades = Vec::new();
        let mut pending: Option<OpenTrade> = None;
        let mut cumulative_strategy = 1.0;
        let mut cumulative_market = 1.0;

        for (i, bar) in bars.iter().enumerate() {
            let market_return = market_returns[i];
            let raw = realized[i].exposure() * market_return.unwrap_or(0.0);

            let transition = position::transition_at(realized, i);
            let commission = if transition.is_some() { rate } else { 0.0 };

            match transition {
                Some(Transition::Entry) => {
                    let decision = i
                        .checked_sub(1)
                        .and_then(|signal_bar| sizing.get(signal_bar))
                        .copied()
                        .unwrap_or_default();
                    pending = Some(OpenTrade {
                        entry_index: i,
                        entry_date: bar.date,
                        entry_price: bar.close,
                        size_fraction: decision.position_fraction,
                        stop_loss_price: decision.stop_loss_price,
                    });
                }
                Some(Transition::Exit) => {
                    if let Some(open) = pending.take() {
                        trades.push(Trade {
                            entry_index: open.entry_index,
                            exit_index: i,
                            entry_date: open.entry_date,
                            exit_date: bar.date,
                            entry_price: open.entry_price,
                            exit_price: bar.close,
                            size_fraction: open.size_fraction,
                            stop_loss_price: open.stop_loss_price,
                        });
                    }
                }
                None => {}
            }

            let strategy_return = raw - commission;
            cumulative_strategy *= 1.0 + strategy_return;
            cumulative_market *= 1.0 + market_return.unwrap_or(0.0);

            curve.push(EquityPoint {
                date: bar.date,
                position: realized[i],
                market_return,
                strategy_return,
                commission,
                cumulative_strategy,
                cumulative_market,
                portfolio_value: self.config.initial_capital * cumulative_strategy,
            });
        }

        Ok(Simulation {
            curve,
            trades,
            open_trade: pending,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub run: StrategyRun,
    pub curve: Vec<EquityPoint>,
    pub trades: Vec<Trade>,
    pub open_trade: Option<OpenTrade>,
    pub metrics: Metrics,
}

/// Evaluates `strategy` on `series`, simulates it, and computes metrics.
pub fn run_backtest(
    series: &Series,
    strategy: &Strategy,
    config: &BacktestConfig,
) -> Result<BacktestResult, SigtraderError> {
    let simulator = BacktestSimulator::new(*config)?;
    let run = strategy.evaluate(series)?;
    let simulation = simulator.run(series, &run.realized, &run.sizing)?;
    let metrics = Metrics::compute(&simulation.curve, &simulation.trades, config.initial_capital);

    tracing::info!(
        bars = series.len(),
        trades = metrics.num_trades,
        open_trade = metrics.has_open_trade,
        total_return = metrics.total_return_strategy,
        sharpe = metrics.sharpe_ratio,
        "backtest complete"
    );

    Ok(BacktestResult {
        run,
        curve: simulation.curve,
        trades: simulation.trades,
        open_trade: simulation.open_trade,
        metrics,
    })
}
