use std::{error::Error, fmt, io};

use machine_learning::MlErr;

/// The coordinator module's result type.
pub type Result<T> = std::result::Result<T, CoordinatorErr>;

/// Coordinator runtime failures, every one of them is fatal to the run.
#[derive(Debug)]
pub enum CoordinatorErr {
    Io(io::Error),
    Ml(MlErr),
    Connection {
        party: String,
        source: io::Error,
    },
    UnexpectedMessage {
        party: String,
        round: u64,
        got: &'static str,
    },
    ProtocolViolation {
        party: String,
        detail: String,
    },
    ParticipantFailed {
        party: String,
        detail: String,
    },
    /// A connection was handed over for a name that's not in the roster.
    UnknownParticipant(String),
    /// A roster participant has no connection.
    Unbound(String),
    RoundTimeout {
        round: u64,
        missing: Vec<String>,
    },
}

impl fmt::Display for CoordinatorErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Ml(e) => write!(f, "{e}"),
            Self::Connection { party, source } => {
                write!(f, "connection with '{party}' failed: {source}")
            }
            Self::UnexpectedMessage { party, round, got } => {
                write!(f, "unexpected message from '{party}' at round {round}: got {got}")
            }
            Self::ProtocolViolation { party, detail } => {
                write!(f, "'{party}' violated the protocol: {detail}")
            }
            Self::ParticipantFailed { party, detail } => write!(f, "'{party}' failed: {detail}"),
            Self::UnknownParticipant(party) => {
                write!(f, "'{party}' is not a participant of this run")
            }
            Self::Unbound(party) => write!(f, "participant '{party}' has no connection"),
            Self::RoundTimeout { round, missing } => {
                write!(f, "round {round} timed out waiting for {missing:?}")
            }
        }
    }
}

impl Error for CoordinatorErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) | Self::Connection { source: e, .. } => Some(e),
            Self::Ml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CoordinatorErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<MlErr> for CoordinatorErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}
