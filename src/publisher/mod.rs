//! Publisher module for IPC communication
//!
//! Publishes dashboard frames to the presentation process.

use bytes::{BufMut, Bytes, BytesMut};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{AnalyticsError, Result};
use crate::pipeline::DashboardFrame;

/// Publisher for sending frames via Unix socket
pub struct Publisher {
    socket_path: String,
    stream: Mutex<Option<UnixStream>>,
}

impl Publisher {
    /// Create a new publisher
    pub async fn new(socket_path: &str) -> Result<Self> {
        let publisher = Self {
            socket_path: socket_path.to_string(),
            stream: Mutex::new(None),
        };

        // Try initial connection (the dashboard may not be up yet)
        if let Err(e) = publisher.connect().await {
            warn!(error = %e, "Initial IPC connection failed, will retry on publish");
        }

        Ok(publisher)
    }

    /// Connect to the Unix socket
    async fn connect(&self) -> Result<()> {
        let path = Path::new(&self.socket_path);

        if !path.exists() {
            return Err(AnalyticsError::IpcError(format!(
                "Socket path does not exist: {}",
                self.socket_path
            )));
        }

        let stream = UnixStream::connect(path).await.map_err(|e| {
            AnalyticsError::IpcError(format!("Failed to connect to {}: {}", self.socket_path, e))
        })?;

        let mut guard = self.stream.lock().await;
        *guard = Some(stream);

        info!(path = %self.socket_path, "Connected to IPC socket");
        Ok(())
    }

    /// Publish a frame. Delivery failures are logged, not returned.
    pub async fn publish(&self, frame: &DashboardFrame) -> Result<()> {
        let message = encode_frame(frame)?;

        let mut guard = self.stream.lock().await;

        // Check if we need to reconnect
        if guard.is_none() {
            drop(guard);
            if let Err(e) = self.connect().await {
                debug!(error = %e, "Failed to reconnect to IPC socket");
                return Ok(());
            }
            guard = self.stream.lock().await;
        }

        if let Some(stream) = guard.as_mut() {
            match stream.write_all(&message).await {
                Ok(_) => {
                    debug!(
                        symbol = %frame.symbol,
                        epoch = frame.epoch,
                        tick = frame.tick,
                        "Published dashboard frame"
                    );
                }
                Err(e) => {
                    warn!(error = %e, "Failed to write to IPC socket");
                    *guard = None; // Mark as disconnected
                }
            }
        }

        Ok(())
    }
}

/// MessagePack body behind a big-endian u32 length prefix
pub fn encode_frame(frame: &DashboardFrame) -> Result<Bytes> {
    let data = rmp_serde::to_vec_named(frame)?;

    let len = u32::try_from(data.len()).map_err(|_| {
        AnalyticsError::SerializationError(format!("Frame too large: {} bytes", data.len()))
    })?;

    let mut message = BytesMut::with_capacity(4 + data.len());
    message.put_u32(len);
    message.extend_from_slice(&data);
    Ok(message.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::UnixListener;

    fn frame() -> DashboardFrame {
        DashboardFrame {
            epoch: 3,
            tick: 9,
            symbol: "BTCUSDT".to_string(),
            timestamp: 1_700_000_000_000,
            analysis: Default::default(),
            events: Vec::new(),
        }
    }

    #[test]
    fn test_length_prefix() {
        let encoded = encode_frame(&frame()).unwrap();
        let len = u32::from_be_bytes([encoded[0], encoded[1], encoded[2], encoded[3]]) as usize;
        assert_eq!(len, encoded.len() - 4);
    }

    #[tokio::test]
    async fn test_publish_without_listener_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.sock");

        let publisher = Publisher::new(path.to_str().unwrap()).await.unwrap();

        assert!(publisher.publish(&frame()).await.is_ok());
    }

    #[tokio::test]
    async fn test_publish_delivers_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let publisher = Publisher::new(path.to_str().unwrap()).await.unwrap();
        let (mut conn, _) = listener.accept().await.unwrap();
        publisher.publish(&frame()).await.unwrap();

        let expected = encode_frame(&frame()).unwrap();
        let mut received = vec![0u8; expected.len()];
        conn.read_exact(&mut received).await.unwrap();
        assert_eq!(received, expected.to_vec());
    }
}
