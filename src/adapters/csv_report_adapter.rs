//! CSV report adapter implementing ReportPort.
//!
//! Given an output stem, writes `<stem>_equity.csv`, `<stem>_trades.csv`
//! and, for walk-forward runs, `<stem>_walkforward.csv`.

use std::path::{Path, PathBuf};

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SigtraderError;
use crate::domain::position::PositionState;
use crate::domain::walk_forward::{WalkForwardSummary, WindowResult};
use crate::ports::report_port::ReportPort;

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    fn path_with_suffix(stem: &str, suffix: &str) -> PathBuf {
        let stem = stem.strip_suffix(".csv").unwrap_or(stem);
        PathBuf::from(format!("{stem}_{suffix}.csv"))
    }

    fn writer(path: &Path) -> Result<csv::Writer<std::fs::File>, SigtraderError> {
        csv::Writer::from_path(path).map_err(|e| csv_error(path, e))
    }
}

fn csv_error(path: &Path, e: csv::Error) -> SigtraderError {
    SigtraderError::Io(std::io::Error::other(format!(
        "failed to write {}: {}",
        path.display(),
        e
    )))
}

fn position_label(position: PositionState) -> &'static str {
    match position {
        PositionState::Flat => "FLAT",
        PositionState::Long => "LONG",
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), SigtraderError> {
        let equity_path = Self::path_with_suffix(output_path, "equity");
        let mut wtr = Self::writer(&equity_path)?;
        wtr.write_record([
            "date",
            "signal",
            "position",
            "market_return",
            "strategy_return",
            "commission",
            "cumulative_market",
            "cumulative_strategy",
            "portfolio_value",
        ])
        .map_err(|e| csv_error(&equity_path, e))?;

        for (i, point) in result.curve.iter().enumerate() {
            let signal = result
                .run
                .signals
                .get(i)
                .map(ToString::to_string)
                .unwrap_or_default();
            wtr.write_record([
                point.date.to_string(),
                signal,
                position_label(point.position).to_string(),
                point.market_return.map(|r| format!("{r:.6}")).unwrap_or_default(),
                format!("{:.6}", point.strategy_return),
                format!("{:.6}", point.commission),
                format!("{:.6}", point.cumulative_market),
                format!("{:.6}", point.cumulative_strategy),
                format!("{:.2}", point.portfolio_value),
            ])
            .map_err(|e| csv_error(&equity_path, e))?;
        }
        wtr.flush()?;

        let trades_path = Self::path_with_suffix(output_path, "trades");
        let mut wtr = Self::writer(&trades_path)?;
        wtr.write_record([
            "entry_date",
            "exit_date",
            "entry_price",
            "exit_price",
            "gross_return",
            "bars_held",
            "size_fraction",
            "stop_loss_price",
        ])
        .map_err(|e| csv_error(&trades_path, e))?;

        for trade in &result.trades {
            wtr.write_record([
                trade.entry_date.to_string(),
                trade.exit_date.to_string(),
                format!("{:.4}", trade.entry_price),
                format!("{:.4}", trade.exit_price),
                format!("{:.6}", trade.gross_return()),
                trade.bars_held().to_string(),
                format!("{:.4}", trade.size_fraction),
                format!("{:.4}", trade.stop_loss_price),
            ])
            .map_err(|e| csv_error(&trades_path, e))?;
        }
        wtr.flush()?;

        tracing::info!(
            equity = %equity_path.display(),
            trades = %trades_path.display(),
            "report written"
        );
        Ok(())
    }

    fn write_walk_forward(
        &self,
        windows: &[WindowResult],
        summary: &WalkForwardSummary,
        output_path: &str,
    ) -> Result<(), SigtraderError> {
        let path = Self::path_with_suffix(output_path, "walkforward");
        let mut wtr = Self::writer(&path)?;
        wtr.write_record([
            "window",
            "test_start",
            "test_end",
            "total_return",
            "sharpe_ratio",
            "max_drawdown",
            "num_trades",
            "win_rate",
        ])
        .map_err(|e| csv_error(&path, e))?;

        for w in windows {
            wtr.write_record([
                w.spec.index.to_string(),
                w.test_start_date.to_string(),
                w.test_end_date.to_string(),
                format!("{:.6}", w.metrics.total_return_strategy),
                format!("{:.4}", w.metrics.sharpe_ratio),
                format!("{:.6}", w.metrics.max_drawdown),
                w.metrics.num_trades.to_string(),
                format!("{:.4}", w.metrics.win_rate),
            ])
            .map_err(|e| csv_error(&path, e))?;
        }
        wtr.flush()?;

        tracing::info!(
            path = %path.display(),
            windows = summary.windows,
            "walk-forward report written"
        );
        Ok(())
    }
}
