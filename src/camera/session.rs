use super::link::{CameraLink, LinkEvent};
use super::protocol::CameraCommand;
use crate::error::CameraError;
use crate::events::{EventBus, ScannerEvent};
use crate::parser::{ResultParser, ScanResult};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Externally visible session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Idle,
    AwaitingResult,
}

/// The single outstanding capture on a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    /// 1 for the original trigger, incremented on every watchdog retry
    pub attempt: u32,
    pub issued_at: Instant,
    pub deadline: Instant,
}

impl CaptureRequest {
    fn new(attempt: u32, timeout: Duration) -> Self {
        let issued_at = Instant::now();
        Self {
            attempt,
            issued_at,
            deadline: issued_at + timeout,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

/// Counters for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub connections: u64,
    pub commands_sent: u64,
    pub captures_triggered: u64,
    pub watchdog_retries: u64,
    pub results_received: u64,
    pub unsolicited_results: u64,
}

/// Persistent command session with one camera.
///
/// Guarantees at most one outstanding capture. Aim toggles are idempotent and
/// suppressed while a capture is pending. Inbound data and watchdog expiry are
/// fed in by the owner through `handle_link_event` and `on_watchdog_expired`.
pub struct CameraSession<L: CameraLink> {
    link: L,
    events: mpsc::UnboundedSender<LinkEvent>,
    parser: ResultParser,
    connected: bool,
    connection: u64,
    aim: bool,
    pending: Option<CaptureRequest>,
    capture_timeout: Duration,
    stats: SessionStats,
    event_bus: Option<EventBus>,
}

impl<L: CameraLink> CameraSession<L> {
    /// Create a session; the receiver yields inbound link events
    pub fn new(link: L, capture_timeout: Duration) -> (Self, mpsc::UnboundedReceiver<LinkEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let session = Self {
            link,
            events,
            parser: ResultParser::new(),
            connected: false,
            connection: 0,
            aim: false,
            pending: None,
            capture_timeout,
            stats: SessionStats::default(),
            event_bus: None,
        };
        (session, receiver)
    }

    /// Report commands, captures and connection changes on the event bus
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn state(&self) -> SessionState {
        if !self.connected {
            SessionState::Disconnected
        } else if self.pending.is_some() {
            SessionState::AwaitingResult
        } else {
            SessionState::Idle
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn aim_state(&self) -> bool {
        self.aim
    }

    pub fn pending_capture(&self) -> Option<&CaptureRequest> {
        self.pending.as_ref()
    }

    /// When the watchdog for the pending capture fires, if one is armed
    pub fn watchdog_deadline(&self) -> Option<Instant> {
        self.pending.map(|request| request.deadline)
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Establish the connection. Failures are returned, not retried.
    pub async fn connect(&mut self) -> Result<(), CameraError> {
        if self.connected {
            return Ok(());
        }

        let connection = self.connection + 1;
        self.link.open(connection, self.events.clone()).await?;

        self.connection = connection;
        self.connected = true;
        self.stats.connections += 1;
        self.emit(ScannerEvent::CameraStatusChanged {
            connected: true,
            timestamp: SystemTime::now(),
        });
        Ok(())
    }

    /// Switch the aim indicator; returns whether a command was sent
    pub async fn set_aim_indicator(&mut self, enabled: bool) -> Result<bool, CameraError> {
        if self.aim == enabled {
            return Ok(false);
        }
        if self.pending.is_some() {
            debug!("Capture pending, leaving aim indicator {}", on_off(self.aim));
            return Ok(false);
        }

        self.send(CameraCommand::aim(enabled)).await?;
        self.aim = enabled;
        debug!("Aim indicator {}", on_off(enabled));
        Ok(true)
    }

    /// Request a capture; returns false when one is already in flight
    pub async fn trigger_capture(&mut self) -> Result<bool, CameraError> {
        if let Some(pending) = &self.pending {
            debug!(
                "Capture attempt {} still pending, not re-triggering",
                pending.attempt
            );
            return Ok(false);
        }

        self.issue_capture(1).await?;
        Ok(true)
    }

    /// Re-send an unanswered capture.
    ///
    /// Does nothing unless the pending request has actually reached its deadline.
    /// The request is re-armed even when the resend fails, so retrying continues
    /// until a result arrives.
    pub async fn on_watchdog_expired(&mut self) -> Result<Option<u32>, CameraError> {
        let Some(expired) = self.pending else {
            return Ok(None);
        };
        if !expired.is_expired(Instant::now()) {
            return Ok(None);
        }

        self.pending = None;
        self.stats.watchdog_retries += 1;
        let attempt = expired.attempt + 1;
        warn!(
            "No result {:?} after capture attempt {}, re-triggering (attempt {})",
            self.capture_timeout, expired.attempt, attempt
        );
        self.emit(ScannerEvent::WatchdogExpired {
            attempt: expired.attempt,
        });

        if let Err(e) = self.issue_capture(attempt).await {
            self.pending = Some(CaptureRequest::new(attempt, self.capture_timeout));
            return Err(e);
        }
        Ok(Some(attempt))
    }

    /// Apply an inbound link event; data frames are decoded into a scan result
    pub async fn handle_link_event(&mut self, event: LinkEvent) -> Option<ScanResult> {
        match event {
            LinkEvent::DataReceived { frame, .. } => Some(self.on_data_received(frame).await),
            LinkEvent::ConnectionClosed { connection } => {
                self.on_connection_closed(connection);
                None
            }
        }
    }

    /// Handle a result frame: cancel the watchdog, decode, then turn the aimer off
    pub async fn on_data_received(&mut self, frame: Vec<u8>) -> ScanResult {
        match self.pending.take() {
            Some(request) => debug!(
                "Result for capture attempt {} after {:?}",
                request.attempt,
                request.issued_at.elapsed()
            ),
            None => {
                self.stats.unsolicited_results += 1;
                debug!("Result received with no capture pending");
            }
        }
        self.stats.results_received += 1;

        let result = self.parser.parse(&frame);

        if let Err(e) = self.set_aim_indicator(false).await {
            warn!("Failed to switch aim indicator off after result: {}", e);
        }

        result
    }

    /// Mark the connection as gone; a pending capture stays armed
    pub fn on_connection_closed(&mut self, connection: u64) {
        if connection != self.connection || !self.connected {
            debug!("Ignoring close of stale camera connection {}", connection);
            return;
        }

        self.connected = false;
        self.link.close();
        self.emit(ScannerEvent::CameraStatusChanged {
            connected: false,
            timestamp: SystemTime::now(),
        });
        match &self.pending {
            Some(request) => warn!(
                "Camera connection to {} closed with capture attempt {} pending",
                self.link.peer(),
                request.attempt
            ),
            None => warn!("Camera connection to {} closed", self.link.peer()),
        }
    }

    /// Drop the connection without touching capture state
    pub fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            self.link.close();
            info!("Disconnected from camera at {}", self.link.peer());
        }
    }

    async fn issue_capture(&mut self, attempt: u32) -> Result<(), CameraError> {
        self.send(CameraCommand::Trigger).await?;
        self.pending = Some(CaptureRequest::new(attempt, self.capture_timeout));
        self.stats.captures_triggered += 1;
        info!("Capture triggered (attempt {})", attempt);
        self.emit(ScannerEvent::CaptureTriggered {
            attempt,
            timestamp: SystemTime::now(),
        });
        Ok(())
    }

    async fn send(&mut self, command: CameraCommand) -> Result<(), CameraError> {
        self.connect().await?;

        if let Err(e) = self.link.send(command).await {
            self.connected = false;
            self.link.close();
            return Err(e);
        }

        self.stats.commands_sent += 1;
        debug!("Sent {} to {}", command, self.link.peer());
        self.emit(ScannerEvent::CommandSent {
            command: command.to_string(),
        });
        Ok(())
    }

    fn emit(&self, event: ScannerEvent) {
        if let Some(event_bus) = &self.event_bus {
            event_bus.emit(event);
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
