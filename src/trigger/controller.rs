use crate::camera::{CameraLink, CameraSession};
use crate::config::TriggerConfig;
use crate::error::CameraError;
use crate::measurement::WindowStatistics;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Action derived from one window of distance statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerDecision {
    /// Close and stable: capture now
    Fire,
    /// Close or moving: light the aimer to guide positioning
    Arm,
    /// Far and stable: aimer off
    Disarm,
    /// Exactly on a threshold; whatever was last commanded stays in effect
    NoAction,
}

/// Distance and stability thresholds in millimetres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerThresholds {
    pub distance_mm: f64,
    pub max_deviation_mm: f64,
}

impl Default for TriggerThresholds {
    fn default() -> Self {
        Self {
            distance_mm: 50.0,
            max_deviation_mm: 1.0,
        }
    }
}

impl From<&TriggerConfig> for TriggerThresholds {
    fn from(config: &TriggerConfig) -> Self {
        Self {
            distance_mm: config.threshold_distance_mm,
            max_deviation_mm: config.threshold_max_deviation_mm,
        }
    }
}

/// Maps measurement statistics to camera actions
#[derive(Debug, Clone)]
pub struct TriggerController {
    thresholds: TriggerThresholds,
    last_effective: Option<TriggerDecision>,
}

impl TriggerController {
    pub fn new(thresholds: TriggerThresholds) -> Self {
        Self {
            thresholds,
            last_effective: None,
        }
    }

    pub fn thresholds(&self) -> TriggerThresholds {
        self.thresholds
    }

    /// Most recent decision other than `NoAction`
    pub fn last_effective(&self) -> Option<TriggerDecision> {
        self.last_effective
    }

    /// Evaluate the decision table; the first matching rule wins
    pub fn decide(&self, stats: &WindowStatistics) -> TriggerDecision {
        let TriggerThresholds {
            distance_mm,
            max_deviation_mm,
        } = self.thresholds;
        let (mean, std_dev) = (stats.mean, stats.std_dev);

        if mean < distance_mm && std_dev < max_deviation_mm {
            TriggerDecision::Fire
        } else if mean < distance_mm || std_dev > max_deviation_mm {
            TriggerDecision::Arm
        } else if mean > distance_mm && std_dev < max_deviation_mm {
            TriggerDecision::Disarm
        } else {
            TriggerDecision::NoAction
        }
    }

    /// Decide and forward the result to the camera session.
    ///
    /// Returns the decision and whether a command actually went out; pending
    /// captures and unchanged aim state turn the command into a no-op.
    pub async fn evaluate<L: CameraLink>(
        &mut self,
        stats: &WindowStatistics,
        session: &mut CameraSession<L>,
    ) -> Result<(TriggerDecision, bool), CameraError> {
        let decision = self.decide(stats);
        trace!(
            "mean={:.3}mm stddev={:.3}mm -> {:?}",
            stats.mean,
            stats.std_dev,
            decision
        );

        let sent = match decision {
            TriggerDecision::Fire => session.trigger_capture().await?,
            TriggerDecision::Arm => session.set_aim_indicator(true).await?,
            TriggerDecision::Disarm => session.set_aim_indicator(false).await?,
            TriggerDecision::NoAction => {
                debug!(
                    "Statistics on threshold boundary, keeping {:?}",
                    self.last_effective
                );
                false
            }
        };

        if decision != TriggerDecision::NoAction {
            self.last_effective = Some(decision);
        }

        Ok((decision, sent))
    }
}

impl Default for TriggerController {
    fn default() -> Self {
        Self::new(TriggerThresholds::default())
    }
}
