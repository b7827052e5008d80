//! Register read access.
//!
//! The wire protocol is a minimal block-read exchange over TCP: the client
//! sends `[start: u16 BE, count: u16 BE]` and the device answers with
//! `count` big-endian u16 values. One request per round trip; the
//! connection stays open between polls.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::bank::RegisterBank;
use crate::error::DeviceError;

/// Read access to a device's register block.
///
/// The poller reads through this seam; production uses
/// [`TcpRegisterClient`], tests and in-process demos use [`BankSource`].
#[async_trait]
pub trait RegisterSource: Send {
    /// Establish the device link if it is not already live.
    ///
    /// In-process sources are always connected; the default is a no-op.
    async fn ensure_connected(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    /// Drop the device link so the next cycle reconnects.
    fn disconnect(&mut self) {}

    /// Read `count` contiguous registers starting at `start` in one call.
    async fn read_block(&mut self, start: u16, count: u16) -> Result<Vec<u16>, DeviceError>;
}

/// TCP client for the register wire protocol.
///
/// The connection is owned exclusively by the polling worker that created
/// the client. `read_block` fails with [`DeviceError::NotConnected`] until
/// [`connect`](Self::connect) succeeds; any wire error drops the
/// connection so the caller reconnects before the next read.
pub struct TcpRegisterClient {
    addr: String,
    connect_timeout: Duration,
    stream: Option<TcpStream>,
}

impl TcpRegisterClient {
    pub fn new(host: &str, port: u16, connect_timeout: Duration) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            connect_timeout,
            stream: None,
        }
    }

    /// Whether a connection is currently established.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Establish the TCP connection, honoring the connect timeout.
    pub async fn connect(&mut self) -> Result<(), DeviceError> {
        let connect = TcpStream::connect(&self.addr);
        let stream = tokio::time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| DeviceError::ConnectTimeout {
                addr: self.addr.clone(),
                timeout_ms: self.connect_timeout.as_millis() as u64,
            })??;
        stream.set_nodelay(true)?;
        self.stream = Some(stream);
        Ok(())
    }

    /// Drop the connection so the next cycle reconnects.
    pub fn disconnect(&mut self) {
        self.stream = None;
    }

    async fn exchange(&mut self, start: u16, count: u16) -> Result<Vec<u16>, DeviceError> {
        let stream = self.stream.as_mut().ok_or(DeviceError::NotConnected)?;

        let mut request = [0u8; 4];
        request[..2].copy_from_slice(&start.to_be_bytes());
        request[2..].copy_from_slice(&count.to_be_bytes());
        stream.write_all(&request).await?;

        let mut payload = vec![0u8; usize::from(count) * 2];
        stream.read_exact(&mut payload).await?;

        Ok(payload
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect())
    }
}

#[async_trait]
impl RegisterSource for TcpRegisterClient {
    async fn ensure_connected(&mut self) -> Result<(), DeviceError> {
        if self.stream.is_none() {
            self.connect().await?;
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        self.stream = None;
    }

    async fn read_block(&mut self, start: u16, count: u16) -> Result<Vec<u16>, DeviceError> {
        match self.exchange(start, count).await {
            Ok(block) => Ok(block),
            Err(err) => {
                // A failed exchange leaves the stream in an unknown state.
                self.disconnect();
                Err(err)
            }
        }
    }
}

/// In-process register source backed by a shared [`RegisterBank`].
#[derive(Clone)]
pub struct BankSource {
    bank: Arc<RwLock<RegisterBank>>,
}

impl BankSource {
    pub fn new(bank: Arc<RwLock<RegisterBank>>) -> Self {
        Self { bank }
    }
}

#[async_trait]
impl RegisterSource for BankSource {
    async fn read_block(&mut self, start: u16, count: u16) -> Result<Vec<u16>, DeviceError> {
        self.bank.read().load_block(start, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bank_source_reads_back_stored_values() {
        let bank = RegisterBank::shared();
        bank.write().store(0, 300);
        bank.write().store(2, 120);

        let mut source = BankSource::new(bank);
        let block = source.read_block(0, 12).await.unwrap();
        assert_eq!(block[0], 300);
        assert_eq!(block[2], 120);
    }

    #[tokio::test]
    async fn tcp_client_requires_connection() {
        let mut client = TcpRegisterClient::new("localhost", 1, Duration::from_millis(100));
        assert!(!client.is_connected());
        assert!(matches!(
            client.read_block(0, 12).await,
            Err(DeviceError::NotConnected)
        ));
    }
}
