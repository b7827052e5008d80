//! End-to-end test of the register wire protocol: simulator server on one
//! side, TCP client on the other.

use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;

use medlink_core::registers::{BLOCK_LEN, BLOCK_START};
use medlink_device::{simulator, RegisterSource, TcpRegisterClient};

#[tokio::test]
async fn client_reads_generated_block_from_simulator() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = tokio::spawn(simulator::serve(
        "Device-001".to_string(),
        listener,
        shutdown_rx,
    ));

    // Give the refresh tick a moment to populate the bank.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut client =
        TcpRegisterClient::new(&addr.ip().to_string(), addr.port(), Duration::from_secs(2));
    client.connect().await.unwrap();
    assert!(client.is_connected());

    let block = client.read_block(BLOCK_START, BLOCK_LEN).await.unwrap();
    assert_eq!(block.len(), usize::from(BLOCK_LEN));

    // Generated values sit inside the register-map ranges.
    assert!((200..=400).contains(&block[0]), "bloodFlow {}", block[0]);
    assert!((50..=200).contains(&block[2]), "arterialPressure {}", block[2]);
    assert!((50..=200).contains(&block[4]), "venousPressure {}", block[4]);
    assert!((3500..=3800).contains(&block[6]), "temperature {}", block[6]);
    assert!((1350..=1450).contains(&block[8]), "conductivity {}", block[8]);

    // A second read on the same connection works (connection is reused).
    let again = client.read_block(BLOCK_START, BLOCK_LEN).await.unwrap();
    assert_eq!(again.len(), usize::from(BLOCK_LEN));

    shutdown_tx.send(true).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn connect_times_out_against_dead_endpoint() {
    // RFC 5737 TEST-NET address, nothing listens there.
    let mut client = TcpRegisterClient::new("192.0.2.1", 8502, Duration::from_millis(200));
    assert!(client.connect().await.is_err());
    assert!(!client.is_connected());
}
