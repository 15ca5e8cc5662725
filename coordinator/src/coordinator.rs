use std::{collections::HashMap, io, num::NonZeroUsize, time::Duration};

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg},
};
use futures::future::try_join_all;
use log::{debug, info, warn};
use machine_learning::{
    LocalUpdate, aggregate,
    optimization::{GradientDescent, Newton, Optimizer},
};
use ndarray::Array1;
use settings::{LearningRate, Settings};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
    task::JoinSet,
    time::{self, Instant},
};

use crate::{CoordinatorErr, Result};

const INBOX_CAPACITY: usize = 64;

/// A message received from a participant, tagged with the participant's name.
type Inbound = (String, io::Result<Msg>);

/// Drives the training rounds: it broadcasts the model, waits for every participant's update,
/// aggregates them and steps the model.
pub struct Coordinator<W>
where
    W: AsyncWrite + Unpin,
{
    name: String,
    participants: Vec<String>,
    optimizer: Box<dyn Optimizer + Send>,
    weights: Array1<f64>,
    n_epochs: NonZeroUsize,
    round_timeout: Option<Duration>,
    senders: HashMap<String, OnoSender<W>>,
    readers: JoinSet<()>,
    inbox_tx: mpsc::Sender<Inbound>,
    inbox_rx: mpsc::Receiver<Inbound>,
}

impl<W> Coordinator<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Creates a new `Coordinator`.
    ///
    /// # Arguments
    /// * `name` - This party's name, sent to the participants when joining.
    /// * `participants` - The roster, its order is the aggregation order.
    /// * `optimizer` - The model update rule.
    /// * `initial` - The model of the first round, its length is the model dimension.
    /// * `n_epochs` - The amount of rounds to run.
    pub fn new(
        name: impl Into<String>,
        participants: Vec<String>,
        optimizer: Box<dyn Optimizer + Send>,
        initial: Array1<f64>,
        n_epochs: NonZeroUsize,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::channel(INBOX_CAPACITY);

        Self {
            name: name.into(),
            participants,
            optimizer,
            weights: initial,
            n_epochs,
            round_timeout: None,
            senders: HashMap::new(),
            readers: JoinSet::new(),
            inbox_tx,
            inbox_rx,
        }
    }

    /// Creates a `Coordinator` for the run described by `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        let experiment = settings.experiment();

        let learning_rate = experiment.learning_rate();
        info!("training with learning rate {learning_rate}");

        let optimizer: Box<dyn Optimizer + Send> = match learning_rate {
            LearningRate::Fixed(lr) => Box::new(GradientDescent::new(lr)),
            LearningRate::SecondOrder => Box::new(Newton::new()),
        };

        Self::new(
            settings.coordinator().name(),
            settings.participant_names(),
            optimizer,
            Array1::from(experiment.initial_model()),
            experiment.n_epochs(),
        )
        .with_round_timeout(settings.network().round_timeout)
    }

    /// Bounds how long a round waits for its updates, `None` waits forever.
    pub fn with_round_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.round_timeout = timeout;
        self
    }

    /// Binds a participant's connection to this coordinator and spawns its reading task.
    ///
    /// # Arguments
    /// * `party` - The participant's name.
    /// * `rx` - The receiving end of the communication.
    /// * `tx` - The sending end of the communication.
    ///
    /// # Errors
    /// `CoordinatorErr::UnknownParticipant` if `party` is not in the roster.
    pub fn spawn<R>(&mut self, party: &str, mut rx: OnoReceiver<R>, tx: OnoSender<W>) -> Result<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        if !self.participants.iter().any(|p| p == party) {
            return Err(CoordinatorErr::UnknownParticipant(party.to_string()));
        }

        if self.senders.insert(party.to_string(), tx).is_some() {
            warn!(party = party; "replacing an existing connection");
        }

        let inbox = self.inbox_tx.clone();
        let party = party.to_string();

        self.readers.spawn(async move {
            loop {
                let received = rx.recv::<Msg>().await;
                let failed = received.is_err();

                if inbox.send((party.clone(), received)).await.is_err() || failed {
                    break;
                }
            }
        });

        Ok(())
    }

    /// Runs every training round and returns the final model.
    ///
    /// # Errors
    /// Any connection failure, protocol violation or participant failure aborts the run.
    pub async fn run(mut self) -> Result<Array1<f64>> {
        if let Some(party) = self
            .participants
            .iter()
            .find(|p| !self.senders.contains_key(p.as_str()))
        {
            return Err(CoordinatorErr::Unbound(party.clone()));
        }

        self.join().await?;

        let n_epochs = self.n_epochs.get() as u64;
        let with_hessian = self.optimizer.needs_hessian();
        let mut round = 0;

        loop {
            info!(round = round; "starting round");

            let msg = Msg::Model {
                round,
                with_hessian,
                weights: self.weights.to_vec(),
            };
            self.broadcast(&msg).await?;

            let updates = self.await_updates(round).await?;
            let global = aggregate(
                &self.participants,
                updates.iter().map(|(party, update)| (party.as_str(), update)),
            )?;

            let gradient_norm = global.gradient.dot(&global.gradient).sqrt();
            info!(
                round = round,
                loss = global.loss,
                gradient_norm = gradient_norm,
                rows = global.rows;
                "aggregated round"
            );

            let step = self.optimizer.update_weights(&global, &mut self.weights)?;
            debug!(round = round; "model stepped with {step:?}");

            if round + 1 >= n_epochs {
                break;
            }

            round += 1;
        }

        let msg = Msg::Terminate {
            round,
            weights: self.weights.to_vec(),
        };
        self.broadcast(&msg).await?;
        info!("training finished after {} rounds", round + 1);

        for (party, tx) in &mut self.senders {
            if let Err(e) = tx.shutdown().await {
                warn!(party = party.as_str(); "could not close the connection: {e}");
            }
        }

        self.readers.abort_all();
        Ok(self.weights)
    }

    /// Introduces this coordinator to every participant.
    async fn join(&mut self) -> Result<()> {
        let coordinator = self.name.as_str();

        let joins = self.senders.iter_mut().map(|(party, tx)| async move {
            let msg = Msg::Control(Command::Join {
                coordinator: coordinator.to_string(),
                participant: party.clone(),
            });

            tx.send(&msg)
                .await
                .map_err(|source| CoordinatorErr::Connection {
                    party: party.clone(),
                    source,
                })
        });

        try_join_all(joins).await?;
        Ok(())
    }

    /// Sends `msg` to every participant concurrently.
    async fn broadcast(&mut self, msg: &Msg) -> Result<()> {
        let sends = self.senders.iter_mut().map(|(party, tx)| async move {
            tx.send(msg)
                .await
                .map_err(|source| CoordinatorErr::Connection {
                    party: party.clone(),
                    source,
                })
        });

        try_join_all(sends).await?;
        Ok(())
    }

    /// The round barrier, it returns once every participant sent exactly one update for `round`.
    ///
    /// Updates for earlier rounds are discarded, so are repeated updates for this one.
    async fn await_updates(&mut self, round: u64) -> Result<HashMap<String, LocalUpdate>> {
        let deadline = self.round_timeout.map(|timeout| Instant::now() + timeout);
        let dimension = self.weights.len();
        let mut updates = HashMap::with_capacity(self.participants.len());

        while updates.len() < self.participants.len() {
            let next = self.inbox_rx.recv();

            let received = match deadline {
                Some(deadline) => match time::timeout_at(deadline, next).await {
                    Ok(received) => received,
                    Err(_) => {
                        let missing = self
                            .participants
                            .iter()
                            .filter(|p| !updates.contains_key(p.as_str()))
                            .cloned()
                            .collect();

                        return Err(CoordinatorErr::RoundTimeout { round, missing });
                    }
                },
                None => next.await,
            };

            // The inbox's sender lives in `self`, the channel can't close while the run is alive.
            let Some((party, received)) = received else {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe).into());
            };

            let msg = received.map_err(|source| CoordinatorErr::Connection {
                party: party.clone(),
                source,
            })?;

            match msg {
                Msg::Update(update) if update.round == round => {
                    if updates.contains_key(&party) {
                        warn!(party = party.as_str(), round = round; "discarding duplicate update");
                        continue;
                    }

                    debug!(party = party.as_str(), round = round; "update received");
                    let update = LocalUpdate::from_msg(update, dimension)?;
                    updates.insert(party, update);
                }
                Msg::Update(update) if update.round < round => {
                    warn!(
                        party = party.as_str(),
                        round = round,
                        stale = update.round;
                        "discarding stale update"
                    );
                }
                Msg::Update(update) => {
                    return Err(CoordinatorErr::ProtocolViolation {
                        detail: format!("sent an update for round {} during round {round}", update.round),
                        party,
                    });
                }
                Msg::Err(detail) => return Err(CoordinatorErr::ParticipantFailed { party, detail }),
                msg => {
                    return Err(CoordinatorErr::UnexpectedMessage {
                        party,
                        round,
                        got: msg.kind(),
                    });
                }
            }
        }

        Ok(updates)
    }
}
