use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg},
};
use machine_learning::{InMemorySource, MlErr, Shard, compute_update};
use ndarray::array;
use participant::{Participant, ParticipantErr};
use settings::Settings;
use tokio::io::{self, DuplexStream, ReadHalf, WriteHalf};

type Chan = (
    OnoReceiver<ReadHalf<DuplexStream>>,
    OnoSender<WriteHalf<DuplexStream>>,
);

fn channel_pair() -> (Chan, Chan) {
    let (stream1, stream2) = io::duplex(4096);
    let (rx1, tx1) = io::split(stream1);
    let (rx2, tx2) = io::split(stream2);
    (comms::channel(rx1, tx1), comms::channel(rx2, tx2))
}

fn shard() -> Shard {
    Shard::new(array![[1., 0.], [0., 1.], [1., 1.]], array![1., 0., 1.], true).unwrap()
}

fn join(participant: &str) -> Msg {
    Msg::Control(Command::Join {
        coordinator: "central".into(),
        participant: participant.into(),
    })
}

fn model(round: u64, weights: Vec<f64>) -> Msg {
    Msg::Model {
        round,
        with_hessian: true,
        weights,
    }
}

#[tokio::test]
async fn answers_every_round_until_terminated() {
    let participant = Participant::new("alice", shard());
    let ((rx, tx), (mut coord_rx, mut coord_tx)) = channel_pair();

    let coordinator = async {
        coord_tx.send(&join("alice")).await?;

        let mut updates = Vec::new();
        for (round, weights) in [vec![0., 0., 0.], vec![0.5, -0.5, 1.]].into_iter().enumerate() {
            coord_tx.send(&model(round as u64, weights)).await?;

            let Msg::Update(update) = coord_rx.recv::<Msg>().await? else {
                panic!("expected an update");
            };
            updates.push(update);
        }

        let msg = Msg::Terminate {
            round: 1,
            weights: vec![1., 2., 3.],
        };
        coord_tx.send(&msg).await?;
        io::Result::Ok(updates)
    };

    let (weights, updates) = tokio::join!(participant.run(rx, tx), coordinator);
    let updates = updates.unwrap();

    assert_eq!(weights.unwrap(), array![1., 2., 3.]);
    assert_eq!(updates.len(), 2);

    let expected = compute_update(&shard(), array![0.5, -0.5, 1.].view(), true).unwrap();
    assert_eq!(updates[1], expected.into_msg(1));
    assert_eq!(updates[0].round, 0);
    assert_eq!(updates[0].rows, 3);
    assert_eq!(updates[0].hessian.as_ref().map(Vec::len), Some(9));
}

#[tokio::test]
async fn rejects_a_join_for_someone_else() {
    let participant = Participant::new("alice", shard());
    let ((rx, tx), (mut coord_rx, mut coord_tx)) = channel_pair();

    let coordinator = async {
        coord_tx.send(&join("bob")).await?;
        coord_rx.recv::<Msg>().await
    };

    let (result, reported) = tokio::join!(participant.run(rx, tx), coordinator);

    assert!(matches!(result, Err(ParticipantErr::ProtocolViolation(_))));
    assert!(matches!(reported.unwrap(), Msg::Err(_)));
}

#[tokio::test]
async fn rounds_must_increase() {
    let participant = Participant::new("alice", shard());
    let ((rx, tx), (mut coord_rx, mut coord_tx)) = channel_pair();

    let coordinator = async {
        coord_tx.send(&join("alice")).await?;
        coord_tx.send(&model(3, vec![0.; 3])).await?;
        coord_rx.recv::<Msg>().await?;
        coord_tx.send(&model(3, vec![0.; 3])).await?;
        coord_rx.recv::<Msg>().await
    };

    let (result, reported) = tokio::join!(participant.run(rx, tx), coordinator);

    assert!(matches!(result, Err(ParticipantErr::ProtocolViolation(_))));
    assert!(matches!(reported.unwrap(), Msg::Err(_)));
}

#[tokio::test]
async fn reports_a_dimension_mismatch() {
    let participant = Participant::new("alice", shard());
    let ((rx, tx), (mut coord_rx, mut coord_tx)) = channel_pair();

    let coordinator = async {
        coord_tx.send(&join("alice")).await?;
        coord_tx.send(&model(0, vec![0.; 2])).await?;
        coord_rx.recv::<Msg>().await
    };

    let (result, reported) = tokio::join!(participant.run(rx, tx), coordinator);

    assert!(matches!(
        result,
        Err(ParticipantErr::Ml(MlErr::DimensionMismatch { .. }))
    ));
    let Msg::Err(detail) = reported.unwrap() else {
        panic!("expected the failure to be reported");
    };
    assert!(detail.contains("dimension mismatch"));
}

#[tokio::test]
async fn coordinator_failure_ends_the_run() {
    let participant = Participant::new("alice", shard());
    let ((rx, tx), (_coord_rx, mut coord_tx)) = channel_pair();

    let coordinator = async {
        coord_tx.send(&join("alice")).await?;
        coord_tx.send(&Msg::Err("round timed out".into())).await
    };

    let (result, sent) = tokio::join!(participant.run(rx, tx), coordinator);
    sent.unwrap();

    assert!(matches!(
        result,
        Err(ParticipantErr::CoordinatorFailed(detail)) if detail == "round timed out"
    ));
}

#[tokio::test]
async fn closed_channel_is_an_io_error() {
    let participant = Participant::new("alice", shard());
    let ((rx, tx), coord) = channel_pair();
    drop(coord);

    let result = participant.run(rx, tx).await;
    assert!(matches!(result, Err(ParticipantErr::Io(_))));
}

const SETTINGS: &str = r#"
    [roster]
    coordinator = "central"
    participants = ["alice", "bob"]

    [parties.central]
    host = "127.0.0.1"
    port = 7000

    [parties.alice]
    host = "127.0.0.1"
    port = 7001
    data = "alice-shard"

    [parties.bob]
    host = "127.0.0.1"
    port = 7002

    [experiment]
    data_columns = ["x2", "x1"]
    target_column = "label"
    intercept = true
    n_epochs = 3
    learning_rate = "second_order"
"#;

#[test]
fn loads_its_shard_from_settings() {
    let settings: Settings = SETTINGS.parse().unwrap();

    let mut source = InMemorySource::new();
    source.insert(
        "alice-shard",
        ["x1", "x2", "label"],
        vec![vec![1., 10., 0.], vec![2., 20., 1.]],
    );

    let participant = Participant::from_settings(&settings, "alice", &source).unwrap();
    assert_eq!(participant.name(), "alice");

    // bob's shard is looked up by name and the source doesn't have it.
    let err = Participant::from_settings(&settings, "bob", &source).unwrap_err();
    assert!(matches!(err, ParticipantErr::Ml(MlErr::UnknownShard(_))));

    let err = Participant::from_settings(&settings, "central", &source).unwrap_err();
    assert!(matches!(err, ParticipantErr::Config(_)));
}
