use super::types::RunSummary;
use crate::camera::{CameraLink, CameraSession, LinkEvent, SessionStats};
use crate::config::ScannerConfig;
use crate::error::{Result, ScannerError};
use crate::events::EventBus;
use crate::measurement::MeasurementFilter;
use crate::outputs::{Feedback, ImageSource, LogFeedback, LogNotifier, PartNotifier, ScanStore};
use crate::trigger::{TriggerController, TriggerThresholds};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Everything one scanner station needs, built once at startup
pub struct ScannerContext<L: CameraLink> {
    pub(super) config: ScannerConfig,
    pub(super) event_bus: EventBus,
    pub(super) filter: MeasurementFilter,
    pub(super) controller: TriggerController,
    pub(super) session: CameraSession<L>,
    pub(super) link_events: Option<mpsc::UnboundedReceiver<LinkEvent>>,
    pub(super) feedback: Arc<dyn Feedback>,
    pub(super) notifier: Arc<dyn PartNotifier>,
    pub(super) image_source: Option<Arc<dyn ImageSource>>,
    pub(super) store: Option<ScanStore>,
    pub(super) summary: RunSummary,
}

impl<L: CameraLink> ScannerContext<L> {
    pub fn builder() -> ScannerContextBuilder<L> {
        ScannerContextBuilder::new()
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn session(&self) -> &CameraSession<L> {
        &self.session
    }

    pub fn session_stats(&self) -> &SessionStats {
        self.session.stats()
    }

    pub fn controller(&self) -> &TriggerController {
        &self.controller
    }

    pub fn filter(&self) -> &MeasurementFilter {
        &self.filter
    }

    pub fn store(&self) -> Option<&ScanStore> {
        self.store.as_ref()
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }
}

/// Builder for [`ScannerContext`]
pub struct ScannerContextBuilder<L: CameraLink> {
    config: Option<ScannerConfig>,
    link: Option<L>,
    event_bus: Option<EventBus>,
    feedback: Option<Arc<dyn Feedback>>,
    notifier: Option<Arc<dyn PartNotifier>>,
    image_source: Option<Arc<dyn ImageSource>>,
    store: Option<ScanStore>,
}

impl<L: CameraLink> ScannerContextBuilder<L> {
    pub fn new() -> Self {
        Self {
            config: None,
            link: None,
            event_bus: None,
            feedback: None,
            notifier: None,
            image_source: None,
            store: None,
        }
    }

    pub fn with_config(mut self, config: ScannerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Transport to the camera
    pub fn with_link(mut self, link: L) -> Self {
        self.link = Some(link);
        self
    }

    /// Share an existing event bus instead of creating one
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn with_feedback<F: Feedback + 'static>(mut self, feedback: F) -> Self {
        self.feedback = Some(Arc::new(feedback));
        self
    }

    pub fn with_notifier<N: PartNotifier + 'static>(mut self, notifier: N) -> Self {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    pub fn with_image_source<S: ImageSource + 'static>(mut self, source: S) -> Self {
        self.image_source = Some(Arc::new(source));
        self
    }

    /// Override the store derived from `storage.path`
    pub fn with_store(mut self, store: ScanStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<ScannerContext<L>> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let link = self
            .link
            .ok_or_else(|| ScannerError::component("scanner_context", "Camera link is required"))?;

        let event_bus = self
            .event_bus
            .unwrap_or_else(|| EventBus::new(config.system.event_bus_capacity));

        let (session, link_events) = CameraSession::new(link, config.camera.capture_timeout());
        let session = session.with_event_bus(event_bus.clone());

        let store = if config.storage.enabled {
            Some(
                self.store
                    .unwrap_or_else(|| ScanStore::new(&config.storage.path)),
            )
        } else {
            None
        };

        if config.image.enabled && self.image_source.is_none() {
            warn!("Image retrieval enabled but no image source configured");
        }

        let controller = TriggerController::new(TriggerThresholds::from(&config.trigger));
        info!(
            "Scanner context ready: camera {}, fire below {}mm with stddev under {}mm",
            config.camera.address(),
            config.trigger.threshold_distance_mm,
            config.trigger.threshold_max_deviation_mm
        );

        Ok(ScannerContext {
            event_bus,
            filter: MeasurementFilter::new(),
            controller,
            session,
            link_events: Some(link_events),
            feedback: self.feedback.unwrap_or_else(|| Arc::new(LogFeedback)),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(LogNotifier)),
            image_source: self.image_source,
            store,
            summary: RunSummary::default(),
            config,
        })
    }
}

impl<L: CameraLink> Default for ScannerContextBuilder<L> {
    fn default() -> Self {
        Self::new()
    }
}
