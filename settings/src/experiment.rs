use std::num::NonZeroUsize;

use crate::LearningRate;

/// The hyperparameters and data schema shared by every party.
#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    pub(crate) data_columns: Vec<String>,
    pub(crate) target_column: String,
    pub(crate) intercept: bool,
    pub(crate) n_epochs: NonZeroUsize,
    pub(crate) learning_rate: LearningRate,
    pub(crate) initial_model: Option<Vec<f64>>,
}

impl Experiment {
    pub fn data_columns(&self) -> &[String] {
        &self.data_columns
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    pub fn intercept(&self) -> bool {
        self.intercept
    }

    pub fn n_epochs(&self) -> NonZeroUsize {
        self.n_epochs
    }

    pub fn learning_rate(&self) -> LearningRate {
        self.learning_rate
    }

    /// The length of the model vector, one weight per feature plus the intercept if enabled.
    pub fn dimension(&self) -> usize {
        self.data_columns.len() + self.intercept as usize
    }

    /// The model used at round 0, zeros unless `initial_model` was configured.
    pub fn initial_model(&self) -> Vec<f64> {
        self.initial_model
            .clone()
            .unwrap_or_else(|| vec![0.; self.dimension()])
    }
}
