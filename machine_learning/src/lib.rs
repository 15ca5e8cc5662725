pub mod aggregation;
pub mod dataset;
pub mod error;
pub mod linalg;
pub mod local_update;
pub mod optimization;

pub use aggregation::{GlobalUpdate, aggregate};
pub use dataset::{CsvSource, DataSource, InMemorySource, RowSet, Shard};
pub use error::{MlErr, Result};
pub use local_update::{LocalUpdate, compute_update, sigmoid};
