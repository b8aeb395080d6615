use super::ScannerContext;
use crate::camera::CameraLink;
use crate::events::ScannerEvent;
use crate::outputs::{event_id_for, FeedbackSignal};
use crate::parser::{ScanOutcome, ScanResult};
use std::time::SystemTime;
use tracing::{info, warn};

impl<L: CameraLink> ScannerContext<L> {
    /// Fan a decoded result out to the bus, notifier, feedback, store and image source
    pub(super) async fn on_scan(&mut self, result: ScanResult) {
        let timestamp = SystemTime::now();
        let event_id = event_id_for(timestamp);
        let outcome = result.outcome();

        match outcome {
            ScanOutcome::Identified => self.summary.scans_identified += 1,
            ScanOutcome::Partial => self.summary.scans_partial += 1,
            ScanOutcome::Failed => self.summary.scans_failed += 1,
        }
        info!(
            "Scan {}: {:?} with {} fields",
            event_id,
            outcome,
            result.fields().len()
        );

        self.event_bus.emit(ScannerEvent::ScanCompleted {
            event_id: event_id.clone(),
            outcome,
            fields: result.fields().clone(),
            timestamp,
        });

        if let Some(part_number) = result.part_number() {
            self.notifier.notify(part_number).await;
        }
        self.feedback.signal(FeedbackSignal::from(outcome)).await;

        if let Some(store) = &self.store {
            if let Err(e) = store
                .save_scan(&event_id, result.raw(), result.fields())
                .await
            {
                warn!("Failed to persist scan {}: {}", event_id, e);
                self.report_error("scan_store", &e);
            }
        }

        if self.config.image.enabled {
            self.retrieve_image(&event_id).await;
        }
    }

    async fn retrieve_image(&mut self, event_id: &str) {
        let Some(source) = self.image_source.clone() else {
            return;
        };

        let image = match source.fetch(self.config.image.decimation).await {
            Ok(image) => image,
            Err(e) => {
                self.summary.image_fetch_failures += 1;
                warn!("Image fetch for scan {} failed: {}", event_id, e);
                self.report_error("image_source", &e);
                return;
            }
        };
        self.summary.images_fetched += 1;

        if let Some(store) = &self.store {
            if let Err(e) = store.save_image(event_id, &image).await {
                warn!("Failed to persist image for scan {}: {}", event_id, e);
                self.report_error("scan_store", &e);
            }
        }
    }
}
