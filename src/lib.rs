pub mod app;
pub mod camera;
pub mod config;
pub mod error;
pub mod events;
pub mod measurement;
pub mod outputs;
pub mod parser;
pub mod sensor;
pub mod trigger;

pub use app::{spawn_signal_handlers, RunSummary, ScannerContext, ScannerContextBuilder, ShutdownReason};
pub use camera::{CameraCommand, CameraLink, CameraSession, LinkEvent, SessionState, TcpCameraLink};
pub use config::ScannerConfig;
pub use error::{CameraError, ImageFetchError, Result, ScannerError};
pub use events::{EventBus, ScannerEvent};
pub use measurement::{MeasurementFilter, WindowStatistics};
pub use outputs::{Feedback, FeedbackSignal, ImageSource, LogFeedback, LogNotifier, PartNotifier, ScanStore};
pub use parser::{FieldKey, ResultParser, ScanFields, ScanOutcome, ScanResult};
pub use sensor::SensorFeed;
pub use trigger::{TriggerController, TriggerDecision, TriggerThresholds};
