//! Loading and validation of the training configuration.
//!
//! A configuration is parsed once at startup and handed to every role as an immutable `&Settings`.

mod error;
mod experiment;
mod learning_rate;
mod party;
mod raw;
mod role;
mod settings;

pub use error::{ConfigErr, Result};
pub use experiment::Experiment;
pub use learning_rate::LearningRate;
pub use party::{Address, Party};
pub use role::Role;
pub use settings::{NetworkSettings, Settings};
