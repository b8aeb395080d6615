use crate::error::EventBusError;
use crate::parser::{ScanFields, ScanOutcome};
use crate::trigger::TriggerDecision;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Events that can occur in the scanner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScannerEvent {
    /// A distance reading arrived from the sensor
    SampleArrived {
        distance_mm: f64,
        timestamp: SystemTime,
    },
    /// The trigger controller evaluated a full measurement window
    DecisionMade {
        decision: TriggerDecision,
        mean_mm: f64,
        std_dev_mm: f64,
    },
    /// A command frame was written to the camera
    CommandSent { command: String },
    /// A capture request was issued (attempt 1 is the original, later ones are retries)
    CaptureTriggered { attempt: u32, timestamp: SystemTime },
    /// No result arrived before the capture deadline
    WatchdogExpired { attempt: u32 },
    /// Camera connection status changed
    CameraStatusChanged {
        connected: bool,
        timestamp: SystemTime,
    },
    /// A result frame was received and decoded
    ScanCompleted {
        event_id: String,
        outcome: ScanOutcome,
        fields: ScanFields,
        timestamp: SystemTime,
    },
    /// A component reported an error
    SystemError { component: String, error: String },
    /// Shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl ScannerEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            ScannerEvent::SampleArrived { distance_mm, .. } => {
                format!("Sample {:.1}mm", distance_mm)
            }
            ScannerEvent::DecisionMade {
                decision,
                mean_mm,
                std_dev_mm,
            } => format!(
                "Decision {:?} (mean {:.2}mm, stddev {:.2}mm)",
                decision, mean_mm, std_dev_mm
            ),
            ScannerEvent::CommandSent { command } => format!("Command sent: {}", command),
            ScannerEvent::CaptureTriggered { attempt, .. } => {
                format!("Capture triggered (attempt {})", attempt)
            }
            ScannerEvent::WatchdogExpired { attempt } => {
                format!("Capture watchdog expired (attempt {})", attempt)
            }
            ScannerEvent::CameraStatusChanged { connected, .. } => format!(
                "Camera {}",
                if *connected {
                    "connected"
                } else {
                    "disconnected"
                }
            ),
            ScannerEvent::ScanCompleted {
                event_id, outcome, ..
            } => format!("Scan {} completed: {:?}", event_id, outcome),
            ScannerEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
            ScannerEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            ScannerEvent::SampleArrived { .. } => "sample_arrived",
            ScannerEvent::DecisionMade { .. } => "decision_made",
            ScannerEvent::CommandSent { .. } => "command_sent",
            ScannerEvent::CaptureTriggered { .. } => "capture_triggered",
            ScannerEvent::WatchdogExpired { .. } => "watchdog_expired",
            ScannerEvent::CameraStatusChanged { .. } => "camera_status_changed",
            ScannerEvent::ScanCompleted { .. } => "scan_completed",
            ScannerEvent::SystemError { .. } => "system_error",
            ScannerEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Async event bus for component coordination using broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<ScannerEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<ScannerEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: ScannerEvent) -> Result<usize, EventBusError> {
        log_event(&event);

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Log and publish without caring whether anyone is listening
    pub fn emit(&self, event: ScannerEvent) {
        log_event(&event);

        if self.has_subscribers() {
            let _ = self.sender.send(event);
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

fn log_event(event: &ScannerEvent) {
    match event {
        ScannerEvent::ScanCompleted {
            event_id, outcome, ..
        } => {
            info!("Scan {} completed: {:?}", event_id, outcome);
        }
        ScannerEvent::SystemError { component, error } => {
            error!("System error in {}: {}", component, error);
        }
        ScannerEvent::CameraStatusChanged { connected, .. } => {
            if *connected {
                info!("Camera connected");
            } else {
                warn!("Camera disconnected");
            }
        }
        ScannerEvent::ShutdownRequested { reason, .. } => {
            info!("Shutdown requested: {}", reason);
        }
        _ => {
            debug!("Event: {}", event.description());
        }
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}
