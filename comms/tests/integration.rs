use comms::msg::{Msg, Update};
use tokio::io;

#[tokio::test]
async fn send_recv() {
    const SIZE: usize = 128;

    let msg = Msg::Model {
        round: 7,
        with_hessian: true,
        weights: vec![0.5; 40],
    };

    let (one, two) = io::duplex(SIZE);
    let (rx, tx) = io::split(one);
    let (_, mut tx) = comms::channel(rx, tx);

    let (peer_rx, peer_tx) = io::split(two);
    let (mut rx, _) = comms::channel(peer_rx, peer_tx);

    // The frame is bigger than the duplex buffer, both ends must run at once.
    let (sent, received) = tokio::join!(tx.send(&msg), rx.recv::<Msg>());
    sent.unwrap();

    assert_eq!(received.unwrap(), msg);
}

#[tokio::test]
async fn consecutive_frames_keep_their_boundaries() {
    let (one, two) = io::duplex(4096);
    let (rx, tx) = io::split(one);
    let (_, mut tx) = comms::channel(rx, tx);

    let (peer_rx, peer_tx) = io::split(two);
    let (mut rx, _) = comms::channel(peer_rx, peer_tx);

    let update = Msg::Update(Update {
        round: 0,
        rows: 3,
        loss: 1.25,
        gradient: vec![1.0, 2.0, 3.0],
        hessian: None,
    });
    let err = Msg::Err("shard is empty".into());

    tx.send(&update).await.unwrap();
    tx.send(&err).await.unwrap();

    assert_eq!(rx.recv::<Msg>().await.unwrap(), update);
    assert_eq!(rx.recv::<Msg>().await.unwrap(), err);
}

#[tokio::test]
async fn closed_peer_is_an_error() {
    let (one, two) = io::duplex(64);
    drop(one);

    let (rx, tx) = io::split(two);
    let (mut rx, _) = comms::channel(rx, tx);

    let err = rx.recv::<Msg>().await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
}

#[tokio::test]
async fn shutdown_ends_the_peer_stream() {
    let (one, two) = io::duplex(64);
    let (rx, tx) = io::split(one);
    let (_, mut tx) = comms::channel(rx, tx);

    let (peer_rx, peer_tx) = io::split(two);
    let (mut rx, _) = comms::channel(peer_rx, peer_tx);

    let msg = Msg::Err("done".into());
    tx.send(&msg).await.unwrap();
    tx.shutdown().await.unwrap();

    assert_eq!(rx.recv::<Msg>().await.unwrap(), msg);
    let err = rx.recv::<Msg>().await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
}
