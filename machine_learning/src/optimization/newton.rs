use log::warn;
use ndarray::Array1;

use super::{Optimizer, StepKind};
use crate::{GlobalUpdate, MlErr, Result, linalg};

/// Newton-Raphson optimization, `w ← w − H⁻¹·g` with the aggregated Hessian.
///
/// When the Hessian is singular, e.g. on perfectly separable or collinear data, the step falls
/// back to its pseudo-inverse so the model stays finite.
#[derive(Debug, Clone, Default)]
pub struct Newton;

impl Newton {
    pub fn new() -> Self {
        Self
    }
}

impl Optimizer for Newton {
    fn needs_hessian(&self) -> bool {
        true
    }

    fn update_weights(
        &mut self,
        update: &GlobalUpdate,
        weights: &mut Array1<f64>,
    ) -> Result<StepKind> {
        let dim = weights.len();

        let Some(hessian) = &update.hessian else {
            return Err(MlErr::Shape("a newton step needs the aggregated hessian"));
        };

        if update.gradient.len() != dim {
            return Err(MlErr::DimensionMismatch {
                a: "gradient",
                b: "model",
                got: update.gradient.len(),
                expected: dim,
            });
        }

        if hessian.dim() != (dim, dim) {
            return Err(MlErr::DimensionMismatch {
                a: "hessian",
                b: "model",
                got: hessian.nrows(),
                expected: dim,
            });
        }

        let (step, kind) = match linalg::solve(hessian.view(), update.gradient.view()) {
            Some(step) => (step, StepKind::Newton),
            None => {
                warn!("singular hessian, stepping with its pseudo-inverse");
                let inverse = linalg::pseudo_inverse_symmetric(hessian.view());
                (inverse.dot(&update.gradient), StepKind::PseudoInverse)
            }
        };

        *weights -= &step;
        Ok(kind)
    }
}
