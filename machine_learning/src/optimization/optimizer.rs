use ndarray::Array1;

use crate::{GlobalUpdate, Result};

/// How the last step was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Gradient,
    Newton,
    /// The Hessian was singular and its pseudo-inverse was used instead.
    PseudoInverse,
}

/// Defines the strategy for updating the model from the aggregated statistics of a round.
///
/// The `Optimizer` trait is responsible for the mathematical transition of weights from round `t`
/// to `t+1`.
pub trait Optimizer {
    /// Whether the participants must send their local Hessian alongside the gradient.
    fn needs_hessian(&self) -> bool;

    /// Updates the weights in place using the round's global statistics.
    ///
    /// # Arguments
    /// * `update` - The aggregated statistics for the current `weights`.
    /// * `weights` - The model, modified in place.
    fn update_weights(&mut self, update: &GlobalUpdate, weights: &mut Array1<f64>)
    -> Result<StepKind>;
}
