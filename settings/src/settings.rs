use std::{
    collections::{BTreeMap, HashSet},
    fs,
    num::NonZeroUsize,
    path::Path,
    str::FromStr,
    time::Duration,
};

use log::debug;

use crate::{
    Address, ConfigErr, Experiment, LearningRate, Party, Result,
    raw::{RawExperiment, RawNetwork, RawParty, RawSettings},
};

const DEFAULT_CONNECT_ATTEMPTS: usize = 20;
const DEFAULT_CONNECT_BACKOFF_MS: u64 = 250;

/// Connection setup knobs, none of them affect the training protocol itself.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSettings {
    pub connect_attempts: NonZeroUsize,
    pub connect_backoff: Duration,
    /// `None` means the round barrier waits forever.
    pub round_timeout: Option<Duration>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            // SAFETY: The constant is not zero.
            connect_attempts: NonZeroUsize::new(DEFAULT_CONNECT_ATTEMPTS).unwrap(),
            connect_backoff: Duration::from_millis(DEFAULT_CONNECT_BACKOFF_MS),
            round_timeout: None,
        }
    }
}

/// The validated, immutable training configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    coordinator: Party,
    participants: Vec<Party>,
    experiment: Experiment,
    network: NetworkSettings,
}

impl Settings {
    /// Loads and validates the settings from a TOML file.
    ///
    /// # Arguments
    /// * `path` - The configuration file.
    ///
    /// # Errors
    /// Fails when the file can't be read, parsed or doesn't pass validation.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("loading configuration from {}", path.display());

        let content = fs::read_to_string(path).map_err(|source| ConfigErr::Read {
            path: path.to_path_buf(),
            source,
        })?;

        content.parse()
    }

    pub fn coordinator(&self) -> &Party {
        &self.coordinator
    }

    /// The participants, in roster order.
    pub fn participants(&self) -> &[Party] {
        &self.participants
    }

    /// The names of the participants, in roster order.
    pub fn participant_names(&self) -> Vec<String> {
        self.participants
            .iter()
            .map(|party| party.name().to_string())
            .collect()
    }

    /// Looks up a participant by name.
    pub fn participant(&self, name: &str) -> Option<&Party> {
        self.participants.iter().find(|party| party.name() == name)
    }

    pub fn experiment(&self) -> &Experiment {
        &self.experiment
    }

    pub fn network(&self) -> &NetworkSettings {
        &self.network
    }

    fn validate(raw: RawSettings) -> Result<Self> {
        let RawSettings {
            roster,
            mut parties,
            experiment,
            network,
        } = raw;

        if roster.participants.is_empty() {
            return Err(ConfigErr::NoParticipants);
        }

        let mut seen = HashSet::new();
        for name in std::iter::once(&roster.coordinator).chain(&roster.participants) {
            if !seen.insert(name.as_str()) {
                return Err(ConfigErr::DuplicateParty(name.clone()));
            }
        }

        let coordinator = Self::take_party(&mut parties, &roster.coordinator)?;
        let participants = roster
            .participants
            .iter()
            .map(|name| Self::take_party(&mut parties, name))
            .collect::<Result<Vec<_>>>()?;

        if let Some(name) = parties.into_keys().next() {
            return Err(ConfigErr::UnknownParty(name));
        }

        for party in &participants {
            if party.address().same_endpoint(coordinator.address()) {
                return Err(ConfigErr::SharedAddress {
                    party: party.name().to_string(),
                    address: coordinator.address().to_string(),
                });
            }
        }

        Ok(Self {
            coordinator,
            participants,
            experiment: Self::validate_experiment(experiment)?,
            network: Self::validate_network(network)?,
        })
    }

    fn take_party(parties: &mut BTreeMap<String, RawParty>, name: &str) -> Result<Party> {
        let RawParty { host, port, data } = parties
            .remove(name)
            .ok_or_else(|| ConfigErr::MissingAddress(name.to_string()))?;

        Ok(Party::new(name.to_string(), Address { host, port }, data))
    }

    fn validate_experiment(raw: RawExperiment) -> Result<Experiment> {
        let RawExperiment {
            data_columns,
            target_column,
            intercept,
            n_epochs,
            learning_rate,
            initial_model,
        } = raw;

        if data_columns.is_empty() {
            return Err(ConfigErr::EmptyColumns);
        }

        let mut seen = HashSet::new();
        for column in &data_columns {
            if !seen.insert(column.as_str()) {
                return Err(ConfigErr::DuplicateColumn(column.clone()));
            }
        }

        if seen.contains(target_column.as_str()) {
            return Err(ConfigErr::TargetIsFeature(target_column));
        }

        let n_epochs = usize::try_from(n_epochs)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or(ConfigErr::InvalidEpochs(n_epochs))?;

        let learning_rate = LearningRate::try_from(learning_rate)?;

        let experiment = Experiment {
            data_columns,
            target_column,
            intercept,
            n_epochs,
            learning_rate,
            initial_model,
        };

        if let Some(initial) = &experiment.initial_model {
            let expected = experiment.dimension();
            if initial.len() != expected {
                return Err(ConfigErr::InitialModelLength {
                    got: initial.len(),
                    expected,
                });
            }

            if initial.iter().any(|w| !w.is_finite()) {
                return Err(ConfigErr::NonFiniteInitialModel);
            }
        }

        Ok(experiment)
    }

    fn validate_network(raw: RawNetwork) -> Result<NetworkSettings> {
        let defaults = NetworkSettings::default();

        let connect_attempts = match raw.connect_attempts {
            Some(attempts) => NonZeroUsize::new(attempts)
                .ok_or(ConfigErr::InvalidNetwork("connect_attempts must be positive"))?,
            None => defaults.connect_attempts,
        };

        let round_timeout = match raw.round_timeout_secs {
            Some(0) => {
                return Err(ConfigErr::InvalidNetwork(
                    "round_timeout_secs must be positive",
                ));
            }
            timeout => timeout.map(Duration::from_secs),
        };

        Ok(NetworkSettings {
            connect_attempts,
            connect_backoff: raw
                .connect_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.connect_backoff),
            round_timeout,
        })
    }
}

impl FromStr for Settings {
    type Err = ConfigErr;

    fn from_str(s: &str) -> Result<Self> {
        let raw: RawSettings = toml::from_str(s)?;
        Self::validate(raw)
    }
}
