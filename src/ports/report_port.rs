//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SigtraderError;
use crate::domain::walk_forward::{WalkForwardSummary, WindowResult};

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), SigtraderError>;

    /// Writes one row per walk-forward window. The default writes nothing.
    fn write_walk_forward(
        &self,
        _windows: &[WindowResult],
        _summary: &WalkForwardSummary,
        _output_path: &str,
    ) -> Result<(), SigtraderError> {
        Ok(())
    }
}
