use async_trait::async_trait;
use tracing::info;

/// Receives the part number of every identified scan
#[async_trait]
pub trait PartNotifier: Send + Sync {
    async fn notify(&self, part_number: &str);
}

#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl PartNotifier for LogNotifier {
    async fn notify(&self, part_number: &str) {
        info!("Part identified: {}", part_number);
    }
}
