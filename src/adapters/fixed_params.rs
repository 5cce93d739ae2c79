//! Optimizer adapter that always returns one parameter set.

use crate::domain::error::SigtraderError;
use crate::domain::series::Series;
use crate::domain::strategy::StrategyParams;
use crate::ports::optimizer_port::OptimizerPort;

/// Walk-forward with a fixed parameter set: every window is tested with
/// `params`, regardless of its training slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedParams {
    params: StrategyParams,
}

impl FixedParams {
    pub fn new(params: StrategyParams) -> Self {
        Self { params }
    }
}

impl OptimizerPort for FixedParams {
    fn optimize(&self, train: &Series) -> Result<StrategyParams, SigtraderError> {
        tracing::trace!(train_bars = train.len(), "fixed parameters selected");
        Ok(self.params)
    }
}
