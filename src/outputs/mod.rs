//! Collaborators that consume scan results: operator feedback, part
//! notification, image retrieval and on-disk persistence.

mod feedback;
mod image;
#[cfg(test)]
pub(crate) mod mock;
mod notify;
mod storage;

pub use feedback::{Feedback, FeedbackSignal, LogFeedback};
pub use image::ImageSource;
pub use notify::{LogNotifier, PartNotifier};
pub use storage::{event_id_for, ScanStore, FIELDS_FILE, IMAGE_FILE, RAW_FILE};
