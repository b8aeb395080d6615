use serde::Serialize;
use std::fmt;

/// Why the event loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The shutdown token was cancelled
    Requested,
    /// The sample stream ended
    InputClosed,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Requested => f.write_str("shutdown requested"),
            ShutdownReason::InputClosed => f.write_str("sensor input closed"),
        }
    }
}

/// Counters accumulated by the event loop
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub samples: u64,
    pub decisions: u64,
    pub command_failures: u64,
    pub scans_identified: u64,
    pub scans_partial: u64,
    pub scans_failed: u64,
    pub images_fetched: u64,
    pub image_fetch_failures: u64,
}

impl RunSummary {
    pub fn scans(&self) -> u64 {
        self.scans_identified + self.scans_partial + self.scans_failed
    }
}
