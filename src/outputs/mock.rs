use super::{Feedback, FeedbackSignal, ImageSource, PartNotifier};
use crate::error::ImageFetchError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// Records feedback signals for assertions
#[derive(Clone, Default)]
pub struct RecordingFeedback {
    pub signals: Arc<Mutex<Vec<FeedbackSignal>>>,
}

#[async_trait]
impl Feedback for RecordingFeedback {
    async fn signal(&self, signal: FeedbackSignal) {
        self.signals.lock().push(signal);
    }
}

/// Records notified part numbers for assertions
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub parts: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl PartNotifier for RecordingNotifier {
    async fn notify(&self, part_number: &str) {
        self.parts.lock().push(part_number.to_string());
    }
}

/// Serves a fixed image, or a fixed HTTP status when `status` is set
#[derive(Clone, Default)]
pub struct MockImageSource {
    pub image: Vec<u8>,
    pub status: Option<u16>,
    pub requests: Arc<Mutex<Vec<u32>>>,
}

#[async_trait]
impl ImageSource for MockImageSource {
    async fn fetch(&self, decimation: u32) -> Result<Vec<u8>, ImageFetchError> {
        self.requests.lock().push(decimation);
        match self.status {
            Some(status) => Err(ImageFetchError::Status { status }),
            None => Ok(self.image.clone()),
        }
    }
}
