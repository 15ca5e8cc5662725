use std::path::Path;

use anyhow::Context;
use coordinator::Coordinator;
use machine_learning::{CsvSource, DataSource};
use ndarray::Array1;
use participant::Participant;
use settings::Settings;

use crate::net;

/// The data accessor for shards named in the configuration file at `config`.
///
/// Relative shard paths are resolved against the directory holding the configuration.
pub fn shard_source(config: &Path) -> CsvSource {
    match config.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => CsvSource::with_base_dir(dir),
        _ => CsvSource::new(),
    }
}

/// Dials every participant and runs the coordinator protocol to completion.
pub async fn coordinate(settings: &Settings) -> anyhow::Result<Array1<f64>> {
    let mut coordinator = Coordinator::from_settings(settings);

    for party in settings.participants() {
        let stream = net::connect(party.address(), settings.network())
            .await
            .with_context(|| format!("cannot reach participant '{}'", party.name()))?;

        let (rx, tx) = stream.into_split();
        let (rx, tx) = comms::channel(rx, tx);
        coordinator.spawn(party.name(), rx, tx)?;
    }

    Ok(coordinator.run().await?)
}

/// Loads the shard of participant `name`, then waits for the coordinator and trains.
///
/// The shard is validated before the socket is opened, a bad shard never reaches the network.
pub async fn participate(
    settings: &Settings,
    name: &str,
    source: &dyn DataSource,
) -> anyhow::Result<Array1<f64>> {
    let participant = Participant::from_settings(settings, name, source)
        .with_context(|| format!("cannot load the shard of '{name}'"))?;

    let party = settings
        .participant(name)
        .with_context(|| format!("'{name}' is not a participant"))?;

    let stream = net::accept(party.address())
        .await
        .with_context(|| format!("cannot listen at {}", party.address()))?;

    let (rx, tx) = stream.into_split();
    let (rx, tx) = comms::channel(rx, tx);

    Ok(participant.run(rx, tx).await?)
}
