//! Parameter optimizer port trait.

use crate::domain::error::SigtraderError;
use crate::domain::series::Series;
use crate::domain::strategy::StrategyParams;

/// Chooses strategy parameters from an in-sample slice.
///
/// The walk-forward harness calls this once per window with the training
/// bars only; the returned set is then evaluated on the following test bars.
pub trait OptimizerPort {
    fn optimize(&self, train: &Series) -> Result<StrategyParams, SigtraderError>;
}
