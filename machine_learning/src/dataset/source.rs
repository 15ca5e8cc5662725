use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use log::debug;
use ndarray::{Array1, Array2};

use crate::{MlErr, Result};

/// Rows restricted to the requested feature and target columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSet {
    /// The feature column names, in the same order as the columns of `features`.
    pub columns: Vec<String>,
    pub features: Array2<f64>,
    pub labels: Array1<f64>,
}

/// An accessor for participant shards, decoupling training from the storage format.
pub trait DataSource {
    /// Fetches a shard restricted to the given columns.
    ///
    /// # Arguments
    /// * `shard_id` - Identifies the shard within this source.
    /// * `features` - The feature columns to select, in order.
    /// * `target` - The label column.
    ///
    /// # Returns
    /// The selected rows or an error if the shard can't be found or read.
    fn fetch(&self, shard_id: &str, features: &[String], target: &str) -> Result<RowSet>;
}

/// Finds the position of every requested column in a header.
fn column_indices<S: AsRef<str>>(
    shard: &str,
    header: &[S],
    features: &[String],
    target: &str,
) -> Result<(Vec<usize>, usize)> {
    let position = |column: &str| {
        header
            .iter()
            .position(|h| h.as_ref() == column)
            .ok_or_else(|| MlErr::MissingColumn {
                shard: shard.to_string(),
                column: column.to_string(),
            })
    };

    let features = features
        .iter()
        .map(|column| position(column.as_str()))
        .collect::<Result<Vec<_>>>()?;

    Ok((features, position(target)?))
}

fn into_row_set(features: &[String], values: Vec<f64>, labels: Vec<f64>) -> Result<RowSet> {
    let rows = labels.len();
    let features_array = Array2::from_shape_vec((rows, features.len()), values)
        .map_err(|_| MlErr::Shape("feature values don't fill a rows x columns matrix"))?;

    Ok(RowSet {
        columns: features.to_vec(),
        features: features_array,
        labels: Array1::from(labels),
    })
}

/// Reads shards from comma separated files with a header row.
///
/// The shard identifier is a file path, relative paths are resolved against the base directory
/// when one is set.
#[derive(Debug, Clone, Default)]
pub struct CsvSource {
    base_dir: Option<PathBuf>,
}

impl CsvSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `CsvSource` resolving relative shard paths against `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn resolve(&self, shard_id: &str) -> PathBuf {
        let path = Path::new(shard_id);

        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Parses the contents of a CSV shard.
    ///
    /// Only the selected columns are parsed, the rest may hold anything.
    pub fn parse(shard: &str, content: &str, features: &[String], target: &str) -> Result<RowSet> {
        let malformed = |line: usize, reason: String| MlErr::MalformedRow {
            shard: shard.to_string(),
            line,
            reason,
        };

        let mut lines = content
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());

        let Some((_, header)) = lines.next() else {
            return Err(malformed(1, "missing header row".into()));
        };

        let header: Vec<&str> = header.split(',').map(unquote).collect();
        let (feature_idx, target_idx) = column_indices(shard, &header, features, target)?;

        let mut values = Vec::new();
        let mut labels = Vec::new();

        for (line, row) in lines {
            let fields: Vec<&str> = row.split(',').map(unquote).collect();
            if fields.len() != header.len() {
                return Err(malformed(
                    line,
                    format!("expected {} fields, got {}", header.len(), fields.len()),
                ));
            }

            let parse = |idx: usize| {
                fields[idx].parse::<f64>().map_err(|_| {
                    malformed(
                        line,
                        format!("cannot parse '{}' as a number for column '{}'", fields[idx], header[idx]),
                    )
                })
            };

            for &idx in &feature_idx {
                values.push(parse(idx)?);
            }

            labels.push(parse(target_idx)?);
        }

        into_row_set(features, values, labels)
    }
}

fn unquote(field: &str) -> &str {
    let field = field.trim();
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .unwrap_or(field)
}

impl DataSource for CsvSource {
    fn fetch(&self, shard_id: &str, features: &[String], target: &str) -> Result<RowSet> {
        let path = self.resolve(shard_id);
        debug!("reading shard {shard_id} from {}", path.display());

        let content = fs::read_to_string(&path).map_err(|source| MlErr::Io {
            shard: shard_id.to_string(),
            source,
        })?;

        Self::parse(shard_id, &content, features, target)
    }
}

#[derive(Debug, Clone)]
struct Table {
    header: Vec<String>,
    rows: Vec<Vec<f64>>,
}

/// Serves shards that are already in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    tables: HashMap<String, Table>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a shard.
    ///
    /// # Arguments
    /// * `shard_id` - The identifier to serve it under.
    /// * `header` - The name of every column in `rows`.
    /// * `rows` - The numeric rows of the shard.
    pub fn insert<I, S>(&mut self, shard_id: impl Into<String>, header: I, rows: Vec<Vec<f64>>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let header = header.into_iter().map(Into::into).collect();
        self.tables.insert(shard_id.into(), Table { header, rows });
    }
}

impl DataSource for InMemorySource {
    fn fetch(&self, shard_id: &str, features: &[String], target: &str) -> Result<RowSet> {
        let table = self
            .tables
            .get(shard_id)
            .ok_or_else(|| MlErr::UnknownShard(shard_id.to_string()))?;

        let (feature_idx, target_idx) = column_indices(shard_id, &table.header, features, target)?;

        let mut values = Vec::with_capacity(table.rows.len() * features.len());
        let mut labels = Vec::with_capacity(table.rows.len());

        for (i, row) in table.rows.iter().enumerate() {
            if row.len() != table.header.len() {
                return Err(MlErr::MalformedRow {
                    shard: shard_id.to_string(),
                    line: i + 1,
                    reason: format!("expected {} fields, got {}", table.header.len(), row.len()),
                });
            }

            values.extend(feature_idx.iter().map(|&idx| row[idx]));
            labels.push(row[target_idx]);
        }

        into_row_set(features, values, labels)
    }
}
