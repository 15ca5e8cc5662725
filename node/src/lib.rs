//! Process entry helpers: wiring a role to its TCP connections.

pub mod net;
mod roles;

pub use roles::{coordinate, participate, shard_source};
