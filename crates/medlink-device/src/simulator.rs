//! TCP register server for simulated devices.
//!
//! Serves one device's register bank over the block-read wire protocol
//! while a background tick refreshes the bank from a
//! [`TelemetryGenerator`]. Used by the `medlink simulate` command and the
//! integration tests.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use crate::bank::RegisterBank;
use crate::error::DeviceError;
use crate::generator::TelemetryGenerator;

/// How often the simulated device refreshes its registers.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Run one simulated device until the shutdown signal flips.
///
/// Binds `listener`, spawns a refresh tick for the bank, and answers block
/// reads from any number of concurrent client connections. Per-connection
/// errors are logged and drop only that connection.
pub async fn serve(
    device_id: String,
    listener: TcpListener,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), DeviceError> {
    let bank = RegisterBank::shared();
    let addr = listener.local_addr()?;
    tracing::info!(%device_id, %addr, "device simulator listening");

    // Refresh tick: one generator per device, feeding the shared bank.
    let tick_bank = bank.clone();
    let mut tick_shutdown = shutdown.clone();
    let tick_id = device_id.clone();
    tokio::spawn(async move {
        let mut generator = TelemetryGenerator::new();
        let mut interval = tokio::time::interval(REFRESH_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    generator.refresh(&mut tick_bank.write());
                }
                _ = tick_shutdown.changed() => {
                    if *tick_shutdown.borrow() {
                        tracing::debug!(device_id = %tick_id, "simulator refresh stopped");
                        return;
                    }
                }
            }
        }
    });

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(%device_id, %peer, "client connected");
                        let bank = bank.clone();
                        let device_id = device_id.clone();
                        tokio::spawn(async move {
                            if let Err(err) = handle_connection(stream, bank).await {
                                tracing::debug!(%device_id, %err, "client connection closed");
                            }
                        });
                    }
                    Err(err) => {
                        tracing::warn!(%device_id, %err, "accept failed");
                        tokio::time::sleep(Duration::from_millis(500)).await;
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    tracing::info!(%device_id, "device simulator stopped");
                    return Ok(());
                }
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    bank: Arc<RwLock<RegisterBank>>,
) -> Result<(), DeviceError> {
    let mut request = [0u8; 4];
    loop {
        // Clean EOF between requests means the client went away.
        match stream.read_exact(&mut request).await {
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(err) => return Err(err.into()),
        }

        let start = u16::from_be_bytes([request[0], request[1]]);
        let count = u16::from_be_bytes([request[2], request[3]]);

        let block = bank.read().load_block(start, count)?;
        let mut payload = Vec::with_capacity(block.len() * 2);
        for value in block {
            payload.extend_from_slice(&value.to_be_bytes());
        }
        stream.write_all(&payload).await?;
    }
}
