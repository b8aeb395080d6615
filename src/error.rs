use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScannerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Image fetch error: {0}")]
    ImageFetch(#[from] ImageFetchError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl ScannerError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Failures on the camera control connection
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to connect to camera at {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out after {timeout_ms}ms connecting to camera at {address}")]
    ConnectTimeout { address: String, timeout_ms: u64 },

    #[error("Failed to send {command} to camera: {details}")]
    Send { command: String, details: String },

    #[error("Camera link is not connected")]
    NotConnected,
}

/// Failures retrieving the capture image from the camera
#[derive(Error, Debug)]
pub enum ImageFetchError {
    #[error("Image request returned HTTP status {status}")]
    Status { status: u16 },

    #[error("Image transport error: {details}")]
    Transport { details: String },
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },
}

pub type Result<T> = std::result::Result<T, ScannerError>;
