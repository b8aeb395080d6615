use super::{ScannerContext, ShutdownReason};
use crate::camera::{CameraLink, LinkEvent};
use crate::error::{Result, ScannerError};
use crate::events::ScannerEvent;
use std::time::SystemTime;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

impl<L: CameraLink> ScannerContext<L> {
    /// Drive the scanner until `shutdown` is cancelled or the sample stream ends.
    ///
    /// Inbound camera data is always handled before an expired watchdog, so a
    /// result that races its deadline is never followed by a spurious retry.
    pub async fn run(
        &mut self,
        mut samples: mpsc::Receiver<f64>,
        shutdown: CancellationToken,
    ) -> Result<ShutdownReason> {
        let mut link_events = self
            .link_events
            .take()
            .ok_or_else(|| ScannerError::system("Scanner event loop is already running"))?;

        info!("Scanner running, camera at {}", self.session.link().peer());
        if let Err(e) = self.session.connect().await {
            warn!("Initial camera connection failed, retrying on next command: {}", e);
            self.report_error("camera", &e);
        }

        let reason = loop {
            let deadline = self.session.watchdog_deadline();

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break ShutdownReason::Requested,

                Some(event) = link_events.recv() => self.on_link_event(event).await,

                _ = watchdog(deadline) => self.on_watchdog().await,

                sample = samples.recv() => match sample {
                    Some(sample_mm) => self.on_sample(sample_mm).await,
                    None => break ShutdownReason::InputClosed,
                },
            }
        };

        info!("Scanner stopping: {}", reason);
        self.link_events = Some(link_events);
        self.session.disconnect();
        self.event_bus.emit(ScannerEvent::ShutdownRequested {
            timestamp: SystemTime::now(),
            reason: reason.to_string(),
        });

        Ok(reason)
    }

    async fn on_sample(&mut self, sample_mm: f64) {
        self.summary.samples += 1;
        self.event_bus.emit(ScannerEvent::SampleArrived {
            distance_mm: sample_mm,
            timestamp: SystemTime::now(),
        });

        let Some(stats) = self.filter.ingest(sample_mm) else {
            return;
        };

        match self.controller.evaluate(&stats, &mut self.session).await {
            Ok((decision, _)) => {
                self.summary.decisions += 1;
                self.event_bus.emit(ScannerEvent::DecisionMade {
                    decision,
                    mean_mm: stats.mean,
                    std_dev_mm: stats.std_dev,
                });
            }
            Err(e) => {
                self.summary.command_failures += 1;
                warn!("Camera command failed: {}", e);
                self.report_error("camera", &e);
            }
        }
    }

    async fn on_link_event(&mut self, event: LinkEvent) {
        if let Some(result) = self.session.handle_link_event(event).await {
            self.on_scan(result).await;
        }
    }

    async fn on_watchdog(&mut self) {
        match self.session.on_watchdog_expired().await {
            Ok(Some(attempt)) => debug!("Capture re-issued as attempt {}", attempt),
            Ok(None) => {}
            Err(e) => {
                self.summary.command_failures += 1;
                warn!("Capture retry failed, will try again: {}", e);
                self.report_error("camera", &e);
            }
        }
    }

    pub(super) fn report_error(&self, component: &str, error: &dyn std::fmt::Display) {
        self.event_bus.emit(ScannerEvent::SystemError {
            component: component.to_string(),
            error: error.to_string(),
        });
    }
}

async fn watchdog(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Cancel `shutdown` on SIGINT or SIGTERM
pub fn spawn_signal_handlers(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    if sigterm.recv().await.is_some() {
                        info!("Received SIGTERM signal");
                        shutdown.cancel();
                    }
                }
                Err(e) => warn!("Failed to register SIGTERM handler: {}", e),
            }
        });
    }

    tokio::spawn(async move {
        if let Ok(()) = signal::ctrl_c().await {
            info!("Received SIGINT signal (Ctrl+C)");
            shutdown.cancel();
        }
    });
}
