//! The aggregating party of a training run.

mod coordinator;
mod error;

pub use coordinator::Coordinator;
pub use error::{CoordinatorErr, Result};
