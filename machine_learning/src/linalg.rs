//! Dense solvers for the small symmetric systems of a Newton step.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Pivots and eigenvalues below this fraction of the matrix's largest magnitude count as zero.
pub const SINGULAR_TOLERANCE: f64 = 1e-10;

const MAX_SWEEPS: usize = 64;

fn max_abs<'a>(values: impl IntoIterator<Item = &'a f64>) -> f64 {
    values.into_iter().fold(0., |max, v| max.max(v.abs()))
}

/// Solves `a·x = b` by Gaussian elimination with partial pivoting.
///
/// # Returns
/// `None` if `a` is not square with the length of `b`, or if it's numerically singular.
pub fn solve(a: ArrayView2<f64>, b: ArrayView1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    if a.dim() != (n, n) {
        return None;
    }

    if n == 0 {
        return Some(Array1::zeros(0));
    }

    let scale = max_abs(a.iter());
    if scale == 0. || !scale.is_finite() {
        return None;
    }

    let mut m = a.to_owned();
    let mut x = b.to_owned();

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| m[[i, col]].abs().total_cmp(&m[[j, col]].abs()))?;
        if m[[pivot, col]].abs() <= SINGULAR_TOLERANCE * scale {
            return None;
        }

        if pivot != col {
            for k in 0..n {
                m.swap([col, k], [pivot, k]);
            }
            x.swap(col, pivot);
        }

        for row in col + 1..n {
            let factor = m[[row, col]] / m[[col, col]];
            if factor == 0. {
                continue;
            }

            for k in col..n {
                let above = m[[col, k]];
                m[[row, k]] -= factor * above;
            }

            let above = x[col];
            x[row] -= factor * above;
        }
    }

    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| m[[row, k]] * x[k]).sum();
        x[row] = (x[row] - tail) / m[[row, row]];
    }

    x.iter().all(|v| v.is_finite()).then_some(x)
}

/// Diagonalizes a symmetric matrix with cyclic Jacobi rotations.
///
/// # Returns
/// The eigenvalues and a matrix whose columns are the matching unit eigenvectors.
pub fn symmetric_eigen(a: ArrayView2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = a.nrows();
    let mut v = Array2::eye(n);

    // Work on a copy scaled to unit magnitude so tiny curvatures don't underflow below.
    let scale = max_abs(a.iter());
    if scale == 0. || !scale.is_finite() {
        return (Array1::zeros(n), v);
    }
    let mut a = a.mapv(|x| x / scale);

    let total: f64 = a.iter().map(|x| x * x).sum();

    for _ in 0..MAX_SWEEPS {
        let off: f64 = a
            .indexed_iter()
            .filter(|((i, j), _)| i != j)
            .map(|(_, x)| x * x)
            .sum();

        if off <= f64::EPSILON * f64::EPSILON * total {
            break;
        }

        for p in 0..n {
            for q in p + 1..n {
                let apq = a[[p, q]];
                if apq == 0. {
                    continue;
                }

                let theta = (a[[q, q]] - a[[p, p]]) / (2. * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.).sqrt());
                let c = 1. / (t * t + 1.).sqrt();
                let s = t * c;

                for k in 0..n {
                    let (kp, kq) = (a[[k, p]], a[[k, q]]);
                    a[[k, p]] = c * kp - s * kq;
                    a[[k, q]] = s * kp + c * kq;
                }

                for k in 0..n {
                    let (pk, qk) = (a[[p, k]], a[[q, k]]);
                    a[[p, k]] = c * pk - s * qk;
                    a[[q, k]] = s * pk + c * qk;
                }

                for k in 0..n {
                    let (kp, kq) = (v[[k, p]], v[[k, q]]);
                    v[[k, p]] = c * kp - s * kq;
                    v[[k, q]] = s * kp + c * kq;
                }
            }
        }
    }

    (a.diag().mapv(|l| l * scale), v)
}

/// The Moore-Penrose pseudo-inverse of a symmetric matrix.
///
/// Eigenvalues within `SINGULAR_TOLERANCE` of zero, relative to the largest one, are dropped.
pub fn pseudo_inverse_symmetric(a: ArrayView2<f64>) -> Array2<f64> {
    let (values, vectors) = symmetric_eigen(a);
    let cutoff = SINGULAR_TOLERANCE * max_abs(values.iter());

    let inverted = values.mapv(|l| if l.abs() > cutoff { 1. / l } else { 0. });

    // V·diag(1/λ)·Vᵗ
    let scaled = &vectors * &inverted;
    scaled.dot(&vectors.t())
}
