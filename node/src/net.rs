use std::io;

use log::{debug, info};
use settings::{Address, NetworkSettings};
use tokio::{
    net::{TcpListener, TcpStream},
    time,
};

/// Dials `address`, retrying with a fixed backoff while the peer isn't listening yet.
///
/// # Arguments
/// * `address` - The peer's address.
/// * `network` - How many attempts to make and how long to wait between them.
///
/// # Errors
/// The last connection error once every attempt failed.
pub async fn connect(address: &Address, network: &NetworkSettings) -> io::Result<TcpStream> {
    let attempts = network.connect_attempts.get();
    let target = (address.host.as_str(), address.port);
    let mut attempt = 1;

    loop {
        match TcpStream::connect(target).await {
            Ok(stream) => {
                info!("connected to {address}");
                return Ok(stream);
            }
            Err(e) if attempt < attempts => {
                debug!(attempt = attempt; "cannot reach {address} yet: {e}");
                time::sleep(network.connect_backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Listens at `address` and waits for a single peer to connect.
pub async fn accept(address: &Address) -> io::Result<TcpStream> {
    let listener = TcpListener::bind((address.host.as_str(), address.port)).await?;
    info!("listening at {address}");

    let (stream, peer) = listener.accept().await?;
    info!("coordinator connected from {peer}");
    Ok(stream)
}
