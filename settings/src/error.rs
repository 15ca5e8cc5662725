use std::{error::Error, fmt, io, path::PathBuf};

/// The settings module's result type.
pub type Result<T> = std::result::Result<T, ConfigErr>;

/// All the ways a configuration can be rejected.
#[derive(Debug)]
pub enum ConfigErr {
    Read {
        path: PathBuf,
        source: io::Error,
    },
    Parse(toml::de::Error),
    NoParticipants,
    DuplicateParty(String),
    MissingAddress(String),
    UnknownParty(String),
    SharedAddress {
        party: String,
        address: String,
    },
    InvalidLearningRate(String),
    InvalidEpochs(i64),
    EmptyColumns,
    DuplicateColumn(String),
    TargetIsFeature(String),
    InitialModelLength {
        got: usize,
        expected: usize,
    },
    NonFiniteInitialModel,
    InvalidNetwork(&'static str),
    UnknownRole(String),
}

impl fmt::Display for ConfigErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "cannot read configuration '{}': {source}", path.display())
            }
            Self::Parse(e) => write!(f, "malformed configuration: {e}"),
            Self::NoParticipants => f.write_str("the roster must name at least one participant"),
            Self::DuplicateParty(name) => write!(f, "party '{name}' is declared more than once"),
            Self::MissingAddress(name) => write!(f, "party '{name}' has no address entry"),
            Self::UnknownParty(name) => {
                write!(f, "address entry '{name}' does not belong to any roster party")
            }
            Self::SharedAddress { party, address } => write!(
                f,
                "participant '{party}' shares the coordinator's address {address}"
            ),
            Self::InvalidLearningRate(got) => write!(
                f,
                "learning_rate must be a positive number or \"second_order\", got {got}"
            ),
            Self::InvalidEpochs(got) => write!(f, "n_epochs must be a positive integer, got {got}"),
            Self::EmptyColumns => f.write_str("data_columns must name at least one column"),
            Self::DuplicateColumn(name) => write!(f, "column '{name}' is listed more than once"),
            Self::TargetIsFeature(name) => {
                write!(f, "target column '{name}' is also listed as a feature")
            }
            Self::InitialModelLength { got, expected } => write!(
                f,
                "initial_model has {got} weights, the model dimension is {expected}"
            ),
            Self::NonFiniteInitialModel => f.write_str("initial_model contains non-finite values"),
            Self::InvalidNetwork(msg) => write!(f, "invalid network section: {msg}"),
            Self::UnknownRole(role) => write!(
                f,
                "'{role}' is neither \"coordinator\" nor a party in the roster"
            ),
        }
    }
}

impl Error for ConfigErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for ConfigErr {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}
