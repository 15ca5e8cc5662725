//! The configuration file as written on disk, before any validation.

use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawSettings {
    pub roster: RawRoster,
    #[serde(default)]
    pub parties: BTreeMap<String, RawParty>,
    pub experiment: RawExperiment,
    #[serde(default)]
    pub network: RawNetwork,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawRoster {
    pub coordinator: String,
    pub participants: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawParty {
    pub host: String,
    pub port: u16,
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawExperiment {
    pub data_columns: Vec<String>,
    pub target_column: String,
    #[serde(default)]
    pub intercept: bool,
    pub n_epochs: i64,
    pub learning_rate: RawLearningRate,
    pub initial_model: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawLearningRate {
    Number(f64),
    Marker(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawNetwork {
    pub connect_attempts: Option<usize>,
    pub connect_backoff_ms: Option<u64>,
    pub round_timeout_secs: Option<u64>,
}
