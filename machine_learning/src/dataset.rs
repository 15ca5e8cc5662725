//! Private training shards and the accessors that load them.

mod shard;
mod source;

pub use shard::Shard;
pub use source::{CsvSource, DataSource, InMemorySource, RowSet};
