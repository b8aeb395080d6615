use super::link::{CameraLink, LinkEvent};
use super::protocol::CameraCommand;
use crate::error::CameraError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Camera link that records commands instead of talking to hardware
#[derive(Clone, Default)]
pub struct MockCameraLink {
    pub sent: Arc<Mutex<Vec<CameraCommand>>>,
    pub opens: Arc<AtomicU64>,
    pub refuse_connect: Arc<AtomicBool>,
    pub fail_send: Arc<AtomicBool>,
    events: Arc<Mutex<Option<(u64, mpsc::UnboundedSender<LinkEvent>)>>>,
    open: Arc<AtomicBool>,
}

impl MockCameraLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_commands(&self) -> Vec<CameraCommand> {
        self.sent.lock().clone()
    }

    pub fn count(&self, command: CameraCommand) -> usize {
        self.sent.lock().iter().filter(|c| **c == command).count()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Deliver a frame as if the camera had sent it on the current connection
    pub fn deliver(&self, frame: &[u8]) {
        if let Some((connection, events)) = self.events.lock().as_ref() {
            let _ = events.send(LinkEvent::DataReceived {
                connection: *connection,
                frame: frame.to_vec(),
            });
        }
    }

    /// Simulate the camera hanging up
    pub fn hang_up(&self) {
        if let Some((connection, events)) = self.events.lock().as_ref() {
            let _ = events.send(LinkEvent::ConnectionClosed {
                connection: *connection,
            });
        }
    }
}

#[async_trait]
impl CameraLink for MockCameraLink {
    async fn open(
        &mut self,
        connection: u64,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Result<(), CameraError> {
        if self.refuse_connect.load(Ordering::SeqCst) {
            return Err(CameraError::Connect {
                address: self.peer(),
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            });
        }

        self.opens.fetch_add(1, Ordering::SeqCst);
        *self.events.lock() = Some((connection, events));
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&mut self, command: CameraCommand) -> Result<(), CameraError> {
        if !self.is_open() {
            return Err(CameraError::NotConnected);
        }
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(CameraError::Send {
                command: command.to_string(),
                details: "broken pipe".to_string(),
            });
        }

        self.sent.lock().push(command);
        Ok(())
    }

    fn close(&mut self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn peer(&self) -> String {
        "mock-camera:23".to_string()
    }
}
