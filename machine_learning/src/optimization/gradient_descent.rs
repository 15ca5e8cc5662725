use ndarray::Array1;

use super::{Optimizer, StepKind};
use crate::{GlobalUpdate, MlErr, Result};

/// Gradient descent optimization algorithm.
#[derive(Debug, Clone)]
pub struct GradientDescent {
    learning_rate: f64,
}

impl GradientDescent {
    /// Returns a new `GradientDescent`.
    ///
    /// # Arguments
    /// * `learning_rate` - The *length* of the steps taken on `update_weights`.
    pub fn new(learning_rate: f64) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for GradientDescent {
    fn needs_hessian(&self) -> bool {
        false
    }

    /// Makes a step in the opposite direction of the summed gradient, scaled by `learning_rate`.
    fn update_weights(
        &mut self,
        update: &GlobalUpdate,
        weights: &mut Array1<f64>,
    ) -> Result<StepKind> {
        if update.gradient.len() != weights.len() {
            return Err(MlErr::DimensionMismatch {
                a: "gradient",
                b: "model",
                got: update.gradient.len(),
                expected: weights.len(),
            });
        }

        weights.scaled_add(-self.learning_rate, &update.gradient);
        Ok(StepKind::Gradient)
    }
}
