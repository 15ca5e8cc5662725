pub mod error;
pub mod participant;

pub use error::{ParticipantErr, Result};
pub use participant::Participant;
