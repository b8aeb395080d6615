use crate::parser::ScanOutcome;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Operator cue emitted once per scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackSignal {
    Identified,
    Partial,
    Failed,
}

impl From<ScanOutcome> for FeedbackSignal {
    fn from(outcome: ScanOutcome) -> Self {
        match outcome {
            ScanOutcome::Identified => FeedbackSignal::Identified,
            ScanOutcome::Partial => FeedbackSignal::Partial,
            ScanOutcome::Failed => FeedbackSignal::Failed,
        }
    }
}

/// Audible or visual acknowledgement of a scan
#[async_trait]
pub trait Feedback: Send + Sync {
    async fn signal(&self, signal: FeedbackSignal);
}

/// Feedback that only writes to the log
#[derive(Debug, Clone, Default)]
pub struct LogFeedback;

#[async_trait]
impl Feedback for LogFeedback {
    async fn signal(&self, signal: FeedbackSignal) {
        match signal {
            FeedbackSignal::Identified => info!("Scan feedback: part identified"),
            FeedbackSignal::Partial => warn!("Scan feedback: label partially decoded"),
            FeedbackSignal::Failed => warn!("Scan feedback: no label read"),
        }
    }
}
