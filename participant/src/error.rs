use std::{error::Error, fmt, io};

use machine_learning::MlErr;
use settings::ConfigErr;

/// The participant module's result type.
pub type Result<T> = std::result::Result<T, ParticipantErr>;

/// Participant runtime failures.
#[derive(Debug)]
pub enum ParticipantErr {
    Io(io::Error),
    Ml(MlErr),
    Config(ConfigErr),
    UnexpectedMessage {
        round: Option<u64>,
        got: &'static str,
    },
    ProtocolViolation(String),
    CoordinatorFailed(String),
}

impl fmt::Display for ParticipantErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticipantErr::Io(e) => write!(f, "io error: {e}"),
            ParticipantErr::Ml(e) => write!(f, "{e}"),
            ParticipantErr::Config(e) => write!(f, "{e}"),
            ParticipantErr::UnexpectedMessage {
                round: Some(round),
                got,
            } => write!(f, "unexpected message after round {round}: got {got}"),
            ParticipantErr::UnexpectedMessage { round: None, got } => {
                write!(f, "unexpected message before the first round: got {got}")
            }
            ParticipantErr::ProtocolViolation(detail) => {
                write!(f, "the coordinator violated the protocol: {detail}")
            }
            ParticipantErr::CoordinatorFailed(detail) => {
                write!(f, "the coordinator failed: {detail}")
            }
        }
    }
}

impl Error for ParticipantErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParticipantErr::Io(e) => Some(e),
            ParticipantErr::Ml(e) => Some(e),
            ParticipantErr::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ParticipantErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<MlErr> for ParticipantErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}

impl From<ConfigErr> for ParticipantErr {
    fn from(value: ConfigErr) -> Self {
        Self::Config(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<ParticipantErr> for io::Error {
    fn from(value: ParticipantErr) -> Self {
        match value {
            ParticipantErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
