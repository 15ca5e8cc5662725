use ndarray::{Array1, Array2, ArrayView1, ArrayView2, s};

use super::RowSet;
use crate::{MlErr, Result};

/// One participant's private rows, laid out as a design matrix and a label vector.
///
/// When the intercept is enabled the first column of the design matrix is a constant 1.
#[derive(Debug, Clone)]
pub struct Shard {
    x: Array2<f64>,
    y: Array1<f64>,
}

impl Shard {
    /// Creates a new `Shard`.
    ///
    /// # Arguments
    /// * `features` - The feature values, one row per sample.
    /// * `labels` - The binary label of every row.
    /// * `intercept` - Whether to prefix the design matrix with a column of ones.
    ///
    /// # Errors
    /// `MlErr::Shape` if there are no rows or no columns, `MlErr::DimensionMismatch` if `labels`
    /// doesn't have a value per row and `MlErr::InvalidLabel` for labels other than 0 or 1.
    pub fn new(features: Array2<f64>, labels: Array1<f64>, intercept: bool) -> Result<Self> {
        let (rows, cols) = features.dim();

        if rows == 0 {
            return Err(MlErr::Shape("a shard must hold at least one row"));
        }

        if cols == 0 && !intercept {
            return Err(MlErr::Shape("a shard must hold at least one column"));
        }

        if labels.len() != rows {
            return Err(MlErr::DimensionMismatch {
                a: "labels",
                b: "feature rows",
                got: labels.len(),
                expected: rows,
            });
        }

        if let Some((row, &value)) = labels
            .iter()
            .enumerate()
            .find(|&(_, &value)| value != 0. && value != 1.)
        {
            return Err(MlErr::InvalidLabel { row, value });
        }

        if features.iter().any(|v| !v.is_finite()) {
            return Err(MlErr::Shape("features must be finite numbers"));
        }

        let x = if intercept {
            let mut x = Array2::ones((rows, cols + 1));
            x.slice_mut(s![.., 1..]).assign(&features);
            x
        } else {
            features
        };

        Ok(Self { x, y: labels })
    }

    /// Builds a shard out of the rows returned by a `DataSource`, checking that they carry
    /// exactly the configured feature columns in the configured order.
    ///
    /// # Arguments
    /// * `set` - The fetched rows.
    /// * `shard` - The shard identifier, used for error reporting.
    /// * `columns` - The configured feature columns.
    /// * `intercept` - Whether to prefix the design matrix with a column of ones.
    pub fn from_row_set(set: RowSet, shard: &str, columns: &[String], intercept: bool) -> Result<Self> {
        if let Some(column) = columns.iter().find(|c| !set.columns.contains(c)) {
            return Err(MlErr::MissingColumn {
                shard: shard.to_string(),
                column: column.clone(),
            });
        }

        if set.columns.len() != columns.len() || set.features.ncols() != columns.len() {
            return Err(MlErr::DimensionMismatch {
                a: "shard columns",
                b: "configured columns",
                got: set.features.ncols(),
                expected: columns.len(),
            });
        }

        if set.columns != columns {
            return Err(MlErr::Shape("shard columns are not in the configured order"));
        }

        Self::new(set.features, set.labels, intercept)
    }

    /// The amount of samples in this shard.
    pub fn rows(&self) -> usize {
        self.x.nrows()
    }

    /// The amount of weights a model for this shard must have.
    pub fn dimension(&self) -> usize {
        self.x.ncols()
    }

    pub fn x(&self) -> ArrayView2<'_, f64> {
        self.x.view()
    }

    pub fn y(&self) -> ArrayView1<'_, f64> {
        self.y.view()
    }
}
