use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg},
};
use log::{debug, info, warn};
use machine_learning::{DataSource, MlErr, Shard, compute_update};
use ndarray::{Array1, ArrayView1};
use settings::{ConfigErr, Settings};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{ParticipantErr, Result};

/// A data holding party, it turns every broadcast model into its shard's statistics.
#[derive(Debug)]
pub struct Participant {
    name: String,
    shard: Shard,
}

impl Participant {
    /// Creates a new `Participant`.
    ///
    /// # Arguments
    /// * `name` - The name this party is known by in the roster.
    /// * `shard` - The private rows, loaded once and reused for every round.
    pub fn new(name: impl Into<String>, shard: Shard) -> Self {
        Self {
            name: name.into(),
            shard,
        }
    }

    /// Loads the shard of participant `name` as described by `settings`.
    ///
    /// # Arguments
    /// * `settings` - The run's configuration.
    /// * `name` - A participant in the roster.
    /// * `source` - Where the shard is fetched from.
    ///
    /// # Errors
    /// Fails if `name` isn't a participant or its shard doesn't match the configured columns.
    pub fn from_settings(settings: &Settings, name: &str, source: &dyn DataSource) -> Result<Self> {
        let party = settings
            .participant(name)
            .ok_or_else(|| ConfigErr::UnknownRole(name.to_string()))?;

        let experiment = settings.experiment();
        let columns = experiment.data_columns();
        let shard_id = party.shard_id();

        let set = source.fetch(shard_id, columns, experiment.target_column())?;
        let shard = Shard::from_row_set(set, shard_id, columns, experiment.intercept())?;

        info!(party = name, rows = shard.rows(); "shard loaded");
        Ok(Self::new(name, shard))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the participant's side of the protocol until the coordinator terminates the run.
    ///
    /// # Arguments
    /// * `rx` - The receiving end of the coordinator channel.
    /// * `tx` - The sending end of the coordinator channel.
    ///
    /// # Returns
    /// The final model broadcast by the coordinator.
    ///
    /// # Errors
    /// Returns `ParticipantErr` on I/O failures, protocol violations or when the update can't be
    /// computed. Unless the channel itself failed, the coordinator is told about it first.
    pub async fn run<R, W>(&self, mut rx: OnoReceiver<R>, mut tx: OnoSender<W>) -> Result<Array1<f64>>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let err = match self.train(&mut rx, &mut tx).await {
            Ok(weights) => return Ok(weights),
            Err(err) => err,
        };

        if !matches!(err, ParticipantErr::Io(_) | ParticipantErr::CoordinatorFailed(_)) {
            let msg = Msg::Err(err.to_string());
            if let Err(e) = tx.send(&msg).await {
                warn!(party = self.name.as_str(); "could not report the failure: {e}");
            }
        }

        Err(err)
    }

    async fn train<R, W>(
        &self,
        rx: &mut OnoReceiver<R>,
        tx: &mut OnoSender<W>,
    ) -> Result<Array1<f64>>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let name = self.name.as_str();
        self.await_join(rx).await?;

        let mut last_round: Option<u64> = None;

        loop {
            match rx.recv::<Msg>().await? {
                Msg::Model {
                    round,
                    with_hessian,
                    weights,
                } => {
                    if let Some(last) = last_round.filter(|&last| round <= last) {
                        return Err(ParticipantErr::ProtocolViolation(format!(
                            "round {round} was broadcast after round {last}"
                        )));
                    }

                    debug!(party = name, round = round; "model received");
                    let update = compute_update(&self.shard, ArrayView1::from(&weights), with_hessian)?;

                    tx.send(&Msg::Update(update.into_msg(round))).await?;
                    last_round = Some(round);
                }
                Msg::Terminate { round, weights } => {
                    if weights.len() != self.shard.dimension() {
                        return Err(MlErr::DimensionMismatch {
                            a: "final model",
                            b: "shard columns",
                            got: weights.len(),
                            expected: self.shard.dimension(),
                        }
                        .into());
                    }

                    info!(party = name, round = round; "training terminated");
                    return Ok(Array1::from(weights));
                }
                Msg::Err(detail) => return Err(ParticipantErr::CoordinatorFailed(detail)),
                msg => {
                    return Err(ParticipantErr::UnexpectedMessage {
                        round: last_round,
                        got: msg.kind(),
                    });
                }
            }
        }
    }

    /// Waits for the coordinator's introduction, it must be addressed to this participant.
    async fn await_join<R>(&self, rx: &mut OnoReceiver<R>) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        match rx.recv::<Msg>().await? {
            Msg::Control(Command::Join {
                coordinator,
                participant,
            }) if participant == self.name => {
                info!(party = self.name.as_str(), coordinator = coordinator.as_str(); "joined");
                Ok(())
            }
            Msg::Control(Command::Join { participant, .. }) => Err(
                ParticipantErr::ProtocolViolation(format!("received a join meant for '{participant}'")),
            ),
            Msg::Err(detail) => Err(ParticipantErr::CoordinatorFailed(detail)),
            msg => Err(ParticipantErr::UnexpectedMessage {
                round: None,
                got: msg.kind(),
            }),
        }
    }
}
