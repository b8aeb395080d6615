use super::protocol::{CameraCodec, CameraCommand};
use crate::error::CameraError;
use async_trait::async_trait;
use bytes::BytesMut;
use futures::SinkExt;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{Decoder, FramedWrite};
use tracing::{debug, info, trace, warn};

/// Quiet period after which buffered bytes without a terminator are taken as a complete result
pub const IDLE_FLUSH: Duration = Duration::from_millis(50);

const READ_BUFFER_LEN: usize = 4096;

/// Inbound notifications from a camera connection.
///
/// `connection` identifies which `open` call produced the event so that a
/// late close notification from a replaced connection can be ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A complete result frame arrived
    DataReceived { connection: u64, frame: Vec<u8> },
    /// The peer closed the connection or the read side failed
    ConnectionClosed { connection: u64 },
}

/// Byte transport to the camera controller
#[async_trait]
pub trait CameraLink: Send {
    /// Establish the connection; inbound frames are delivered on `events`
    async fn open(
        &mut self,
        connection: u64,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Result<(), CameraError>;

    /// Write one command frame
    async fn send(&mut self, command: CameraCommand) -> Result<(), CameraError>;

    /// Drop the connection, if any
    fn close(&mut self);

    /// Peer description for logging
    fn peer(&self) -> String;
}

/// TCP connection to the camera's command port
pub struct TcpCameraLink {
    address: String,
    connect_timeout: Duration,
    writer: Option<FramedWrite<OwnedWriteHalf, CameraCodec>>,
    reader_task: Option<JoinHandle<()>>,
}

impl TcpCameraLink {
    pub fn new(address: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            connect_timeout,
            writer: None,
            reader_task: None,
        }
    }

    /// Forward result frames until the peer closes or the read side fails
    pub(crate) async fn read_loop<R>(
        connection: u64,
        mut reader: R,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) where
        R: AsyncRead + Unpin,
    {
        let mut codec = CameraCodec;
        let mut buf = BytesMut::with_capacity(READ_BUFFER_LEN);

        loop {
            let read = if buf.is_empty() {
                reader.read_buf(&mut buf).await
            } else {
                match tokio::time::timeout(IDLE_FLUSH, reader.read_buf(&mut buf)).await {
                    Ok(read) => read,
                    Err(_) => {
                        if let Some(frame) = codec.flush(&mut buf) {
                            if !forward(connection, frame, &events) {
                                return;
                            }
                        }
                        continue;
                    }
                }
            };

            match read {
                Ok(0) => {
                    if let Some(frame) = codec.flush(&mut buf) {
                        forward(connection, frame, &events);
                    }
                    break;
                }
                Ok(_) => loop {
                    match codec.decode(&mut buf) {
                        Ok(Some(frame)) => {
                            if !forward(connection, frame, &events) {
                                return;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            warn!("Camera connection {} framing error: {}", connection, e);
                            let _ = events.send(LinkEvent::ConnectionClosed { connection });
                            return;
                        }
                    }
                },
                Err(e) => {
                    warn!("Camera connection {} read error: {}", connection, e);
                    break;
                }
            }
        }

        debug!("Camera connection {} closed by peer", connection);
        let _ = events.send(LinkEvent::ConnectionClosed { connection });
    }
}

fn forward(connection: u64, frame: Vec<u8>, events: &mpsc::UnboundedSender<LinkEvent>) -> bool {
    trace!("Connection {} received {} bytes", connection, frame.len());
    if events
        .send(LinkEvent::DataReceived { connection, frame })
        .is_err()
    {
        debug!("Link event receiver dropped, stopping reader");
        return false;
    }
    true
}

#[async_trait]
impl CameraLink for TcpCameraLink {
    async fn open(
        &mut self,
        connection: u64,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Result<(), CameraError> {
        self.close();

        debug!("Connecting to camera at {}", self.address);
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.address))
            .await
            .map_err(|_| CameraError::ConnectTimeout {
                address: self.address.clone(),
                timeout_ms: self.connect_timeout.as_millis() as u64,
            })?
            .map_err(|e| CameraError::Connect {
                address: self.address.clone(),
                source: e,
            })?;

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY on camera link: {}", e);
        }

        let (read_half, write_half) = stream.into_split();
        self.reader_task = Some(tokio::spawn(Self::read_loop(connection, read_half, events)));
        self.writer = Some(FramedWrite::new(write_half, CameraCodec));

        info!("Connected to camera at {} (connection {})", self.address, connection);
        Ok(())
    }

    async fn send(&mut self, command: CameraCommand) -> Result<(), CameraError> {
        let writer = self.writer.as_mut().ok_or(CameraError::NotConnected)?;

        if let Err(e) = writer.send(command).await {
            // A failed write leaves the stream in an unknown state; reconnect next time
            self.close();
            return Err(CameraError::Send {
                command: command.to_string(),
                details: e.to_string(),
            });
        }

        Ok(())
    }

    fn close(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if self.writer.take().is_some() {
            debug!("Closed camera connection to {}", self.address);
        }
    }

    fn peer(&self) -> String {
        self.address.clone()
    }
}

impl Drop for TcpCameraLink {
    fn drop(&mut self) {
        self.close();
    }
}
