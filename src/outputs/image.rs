use crate::error::ImageFetchError;
use async_trait::async_trait;

/// Retrieves the image of the most recent capture from the camera.
///
/// `decimation` is the camera's downscale factor, 1 for full resolution.
/// A failed fetch is final; callers do not retry.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(&self, decimation: u32) -> Result<Vec<u8>, ImageFetchError>;
}
