use comms::msg::Update;
use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::{MlErr, Result, Shard};

/// Inputs to the exponential are clamped to this magnitude, `e^709` is the last finite `f64`.
pub const SIGMOID_CLAMP: f64 = 500.;

/// The logistic function, clamped so that large inputs saturate instead of overflowing.
pub fn sigmoid(z: f64) -> f64 {
    let z = z.clamp(-SIGMOID_CLAMP, SIGMOID_CLAMP);
    1. / (1. + (-z).exp())
}

/// Computes `ln(1 + e^z)` without overflowing for large `z`.
fn softplus(z: f64) -> f64 {
    if z > 0. {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

/// The statistics a participant contributes to a round.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalUpdate {
    /// `Xᵗ·(σ(Xw) − y)`.
    pub gradient: Array1<f64>,
    /// `Xᵗ·diag(p·(1−p))·X`, only present in second-order mode.
    pub hessian: Option<Array2<f64>>,
    /// The amount of rows these statistics were summed over.
    pub rows: usize,
    /// The negative log-likelihood of the shard.
    pub loss: f64,
}

impl LocalUpdate {
    /// Converts this update into its wire representation for the given round.
    pub fn into_msg(self, round: u64) -> Update {
        Update {
            round,
            rows: self.rows as u64,
            loss: self.loss,
            gradient: self.gradient.to_vec(),
            hessian: self.hessian.map(|h| h.iter().copied().collect()),
        }
    }

    /// Rebuilds an update received from the wire, checking it against the model dimension.
    ///
    /// # Arguments
    /// * `update` - The wire representation.
    /// * `dimension` - The length of the model the update must match.
    pub fn from_msg(update: Update, dimension: usize) -> Result<Self> {
        let Update {
            rows,
            loss,
            gradient,
            hessian,
            ..
        } = update;

        if gradient.len() != dimension {
            return Err(MlErr::DimensionMismatch {
                a: "gradient",
                b: "model",
                got: gradient.len(),
                expected: dimension,
            });
        }

        let hessian = hessian
            .map(|h| {
                let len = h.len();
                Array2::from_shape_vec((dimension, dimension), h).map_err(|_| {
                    MlErr::DimensionMismatch {
                        a: "hessian",
                        b: "model squared",
                        got: len,
                        expected: dimension * dimension,
                    }
                })
            })
            .transpose()?;

        Ok(Self {
            gradient: Array1::from(gradient),
            hessian,
            rows: rows as usize,
            loss,
        })
    }
}

/// Computes a shard's contribution to the global gradient and, optionally, Hessian.
///
/// This is a pure function of its inputs.
///
/// # Arguments
/// * `shard` - The participant's private rows.
/// * `weights` - The current model.
/// * `with_hessian` - Whether to also compute the Hessian for a second-order update.
///
/// # Errors
/// `MlErr::Shape` for an empty shard and `MlErr::DimensionMismatch` when the shard's columns
/// don't match the length of `weights`.
pub fn compute_update(
    shard: &Shard,
    weights: ArrayView1<f64>,
    with_hessian: bool,
) -> Result<LocalUpdate> {
    let x = shard.x();
    let y = shard.y();

    if shard.rows() == 0 {
        return Err(MlErr::Shape("cannot compute an update over an empty shard"));
    }

    if x.ncols() != weights.len() {
        return Err(MlErr::DimensionMismatch {
            a: "shard columns",
            b: "model",
            got: x.ncols(),
            expected: weights.len(),
        });
    }

    let z = x.dot(&weights);
    let p = z.mapv(sigmoid);

    let loss: f64 = z
        .iter()
        .zip(y)
        .map(|(&z, &y)| softplus(z) - y * z)
        .sum();

    let gradient = x.t().dot(&(&p - &y));

    let hessian = with_hessian.then(|| {
        let curvature = p.mapv(|p| p * (1. - p));
        let weighted = &x * &curvature.insert_axis(Axis(1));
        x.t().dot(&weighted)
    });

    Ok(LocalUpdate {
        gradient,
        hessian,
        rows: shard.rows(),
        loss,
    })
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    #[test]
    fn sigmoid_saturates() {
        assert_close(sigmoid(0.), 0.5);
        assert_eq!(sigmoid(1e6), 1.);
        assert_eq!(sigmoid(-1e6), sigmoid(-SIGMOID_CLAMP));
        assert!(sigmoid(-1e6) > 0.);
    }

    #[test]
    fn zero_model_statistics() {
        let shard = Shard::new(array![[2.], [4.]], array![1., 0.], true).unwrap();
        let update = compute_update(&shard, array![0., 0.].view(), true).unwrap();

        // p = 0.5 everywhere: gradient = Xᵗ(0.5 - y), hessian = 0.25·XᵗX.
        assert_close(update.gradient[0], 0.);
        assert_close(update.gradient[1], -1. + 2.);
        let hessian = update.hessian.unwrap();
        assert_eq!(hessian, array![[0.5, 1.5], [1.5, 5.]]);
        assert_close(update.loss, 2. * 2f64.ln());
        assert_eq!(update.rows, 2);
    }

    #[test]
    fn hessian_is_optional() {
        let shard = Shard::new(array![[1.]], array![1.], false).unwrap();
        let update = compute_update(&shard, array![0.].view(), false).unwrap();
        assert!(update.hessian.is_none());
    }

    #[test]
    fn dimension_mismatch() {
        let shard = Shard::new(array![[1., 2.]], array![1.], true).unwrap();
        let err = compute_update(&shard, array![0., 0.].view(), false).unwrap_err();
        assert!(matches!(err, MlErr::DimensionMismatch { got: 3, expected: 2, .. }));
    }

    #[test]
    fn extreme_margins_stay_finite() {
        let shard = Shard::new(array![[1e4], [-1e4]], array![0., 1.], false).unwrap();
        let update = compute_update(&shard, array![10.].view(), true).unwrap();

        assert!(update.gradient.iter().all(|g| g.is_finite()));
        assert!(update.loss.is_finite());
        assert!(update.hessian.unwrap().iter().all(|h| h.is_finite()));
    }

    #[test]
    fn wire_conversion_checks_dimension() {
        let update = LocalUpdate {
            gradient: array![1., 2.],
            hessian: Some(array![[1., 0.], [0., 1.]]),
            rows: 4,
            loss: 0.5,
        };

        let msg = update.clone().into_msg(9);
        assert_eq!(msg.round, 9);
        assert_eq!(LocalUpdate::from_msg(msg.clone(), 2).unwrap(), update);
        assert!(LocalUpdate::from_msg(msg, 3).is_err());
    }
}
