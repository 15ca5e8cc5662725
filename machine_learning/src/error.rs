use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    /// The data can't form a valid design matrix, e.g. it has no rows.
    Shape(&'static str),
    DimensionMismatch {
        a: &'static str,
        b: &'static str,
        got: usize,
        expected: usize,
    },
    InvalidLabel {
        row: usize,
        value: f64,
    },
    MissingColumn {
        shard: String,
        column: String,
    },
    MalformedRow {
        shard: String,
        line: usize,
        reason: String,
    },
    UnknownShard(String),
    /// The contributions handed to the aggregator don't map one to one to the roster.
    IncompleteRound {
        missing: Vec<String>,
        duplicated: Vec<String>,
        unknown: Vec<String>,
    },
    Io {
        shard: String,
        source: io::Error,
    },
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::Shape(reason) => write!(f, "Shape error: {reason}"),
            MlErr::DimensionMismatch {
                a,
                b,
                got,
                expected,
            } => write!(
                f,
                "There's a dimension mismatch between {a} and {b}, got {got} and expected {expected}"
            ),
            MlErr::InvalidLabel { row, value } => {
                write!(f, "Row {row} has label {value}, labels must be 0 or 1")
            }
            MlErr::MissingColumn { shard, column } => {
                write!(f, "Shard '{shard}' has no column named '{column}'")
            }
            MlErr::MalformedRow {
                shard,
                line,
                reason,
            } => write!(f, "Shard '{shard}' line {line}: {reason}"),
            MlErr::UnknownShard(shard) => write!(f, "There's no shard named '{shard}'"),
            MlErr::IncompleteRound {
                missing,
                duplicated,
                unknown,
            } => write!(
                f,
                "Incomplete round: missing {missing:?}, duplicated {duplicated:?}, unknown {unknown:?}"
            ),
            MlErr::Io { shard, source } => write!(f, "Failed to read shard '{shard}': {source}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
