use std::{fs, net::TcpListener, num::NonZeroUsize, path::PathBuf};

use coordinator::Coordinator;
use machine_learning::{
    GlobalUpdate, Shard, compute_update,
    optimization::{Newton, Optimizer},
};
use ndarray::{Array1, Array2, array};
use participant::Participant;
use settings::Settings;
use tokio::io;

// The rows behind the published iris weights aren't shipped with this repository, so every run
// here is checked against centralized training on the pooled rows instead (see DESIGN.md).
const ALICE: &str = "\
sepal_length,sepal_width,label
5.1,3.5,0
4.9,3.0,0
6.3,2.5,1
5.8,2.7,1
5.0,3.4,1
";

const BOB: &str = "\
sepal_length,sepal_width,label
6.7,3.1,1
5.4,3.9,0
6.0,2.2,1
4.6,3.1,0
6.1,3.0,0
";

/// Ports the OS considers free, all listeners are held until every port is picked.
fn free_ports() -> [u16; 3] {
    let listeners = [(); 3].map(|_| TcpListener::bind("127.0.0.1:0").unwrap());
    listeners.map(|listener| listener.local_addr().unwrap().port())
}

fn workspace(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("node-e2e-{test}-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("alice.csv"), ALICE).unwrap();
    fs::write(dir.join("bob.csv"), BOB).unwrap();
    dir
}

fn settings(learning_rate: &str, n_epochs: usize) -> Settings {
    let [central, alice, bob] = free_ports();

    format!(
        r#"
        [roster]
        coordinator = "central"
        participants = ["alice", "bob"]

        [parties.central]
        host = "127.0.0.1"
        port = {central}

        [parties.alice]
        host = "127.0.0.1"
        port = {alice}
        data = "alice.csv"

        [parties.bob]
        host = "127.0.0.1"
        port = {bob}
        data = "bob.csv"

        [experiment]
        data_columns = ["sepal_length", "sepal_width"]
        target_column = "label"
        intercept = true
        n_epochs = {n_epochs}
        learning_rate = {learning_rate}

        [network]
        connect_attempts = 100
        connect_backoff_ms = 20
        round_timeout_secs = 30
        "#
    )
    .parse()
    .unwrap()
}

/// Parses both shards into a single one.
fn pooled() -> Shard {
    let rows: Vec<Vec<f64>> = ALICE
        .lines()
        .skip(1)
        .chain(BOB.lines().skip(1))
        .map(|line| line.split(',').map(|v| v.parse().unwrap()).collect())
        .collect();

    let x = Array2::from_shape_fn((rows.len(), 2), |(i, j)| rows[i][j]);
    let y = Array1::from_shape_fn(rows.len(), |i| rows[i][2]);
    Shard::new(x, y, true).unwrap()
}

fn centralized(mut optimizer: impl Optimizer, n_epochs: usize) -> Array1<f64> {
    let shard = pooled();
    let mut weights = Array1::zeros(3);

    for _ in 0..n_epochs {
        let local = compute_update(&shard, weights.view(), optimizer.needs_hessian()).unwrap();
        let global = GlobalUpdate {
            gradient: local.gradient,
            hessian: local.hessian,
            rows: local.rows,
            loss: local.loss,
        };
        optimizer.update_weights(&global, &mut weights).unwrap();
    }

    weights
}

fn assert_close(a: &Array1<f64>, b: &Array1<f64>, tol: f64) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        assert!((x - y).abs() <= tol * (1. + y.abs()), "{a} != {b}");
    }
}

/// Runs every party of `settings` in this process over real sockets.
async fn run_over_tcp(settings: &Settings, test: &str) -> [Array1<f64>; 3] {
    let dir = workspace(test);
    let source = node::shard_source(&dir.join("config.toml"));

    let (central, alice, bob) = tokio::join!(
        node::coordinate(settings),
        node::participate(settings, "alice", &source),
        node::participate(settings, "bob", &source),
    );

    fs::remove_dir_all(&dir).unwrap();
    [central.unwrap(), alice.unwrap(), bob.unwrap()]
}

#[tokio::test]
async fn second_order_training_matches_centralized_newton() {
    let settings = settings(r#""second_order""#, 10);
    let [central, alice, bob] = run_over_tcp(&settings, "newton").await;

    assert_eq!(central, alice);
    assert_eq!(central, bob);
    assert_eq!(central.len(), 3);
    assert_close(&central, &centralized(Newton::new(), 10), 1e-9);
}

#[tokio::test]
async fn fixed_rate_training_matches_centralized_descent() {
    use machine_learning::optimization::GradientDescent;

    let settings = settings("0.01", 20);
    let [central, alice, _] = run_over_tcp(&settings, "descent").await;

    assert_eq!(central, alice);
    assert_close(&central, &centralized(GradientDescent::new(0.01), 20), 1e-9);
}

/// Runs the protocol over in-memory streams, starting from `initial`.
async fn run_in_memory(initial: Array1<f64>, n_epochs: usize) -> Array1<f64> {
    let shard_of = |text: &str| {
        let set = machine_learning::CsvSource::parse(
            "shard",
            text,
            &["sepal_length".to_string(), "sepal_width".to_string()],
            "label",
        )
        .unwrap();
        Shard::new(set.features, set.labels, true).unwrap()
    };

    let mut coordinator = Coordinator::new(
        "central",
        vec!["alice".into(), "bob".into()],
        Box::new(Newton::new()),
        initial,
        NonZeroUsize::new(n_epochs).unwrap(),
    );

    let mut runs = Vec::new();
    for (name, text) in [("alice", ALICE), ("bob", BOB)] {
        let (one, two) = io::duplex(4096);
        let (rx, tx) = io::split(one);
        let (rx, tx) = comms::channel(rx, tx);
        coordinator.spawn(name, rx, tx).unwrap();

        let (rx, tx) = io::split(two);
        let (rx, tx) = comms::channel(rx, tx);
        runs.push((Participant::new(name, shard_of(text)), rx, tx));
    }

    let mut runs = runs.into_iter();
    let (alice, alice_rx, alice_tx) = runs.next().unwrap();
    let (bob, bob_rx, bob_tx) = runs.next().unwrap();

    let (central, _, _) = tokio::join!(
        coordinator.run(),
        alice.run(alice_rx, alice_tx),
        bob.run(bob_rx, bob_tx),
    );

    central.unwrap()
}

#[tokio::test]
async fn continuing_a_run_follows_the_same_trajectory() {
    let halfway = run_in_memory(Array1::zeros(3), 3).await;
    let continued = run_in_memory(halfway, 3).await;
    let straight = run_in_memory(Array1::zeros(3), 6).await;

    assert_eq!(continued, straight);
}

#[tokio::test]
async fn in_memory_and_tcp_runs_agree() {
    let settings = settings(r#""newton""#, 4);
    let [central, ..] = run_over_tcp(&settings, "agree").await;

    assert_eq!(central, run_in_memory(array![0., 0., 0.], 4).await);
}

#[test]
fn demo_configuration_loads_every_shard() {
    let config = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../demos/config.toml");
    let settings = Settings::from_path(&config).unwrap();
    let source = node::shard_source(&config);

    for name in settings.participant_names() {
        Participant::from_settings(&settings, &name, &source).unwrap();
    }
}
