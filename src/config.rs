use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ScannerConfig {
    pub camera: CameraConfig,
    pub trigger: TriggerConfig,
    pub image: ImageConfig,
    pub storage: StorageConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Camera controller host name or IP address
    #[serde(default = "default_camera_host")]
    pub host: String,

    /// Camera controller command port
    #[serde(default = "default_camera_port")]
    pub port: u16,

    /// Upper bound on establishing the control connection
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Watchdog period before an unanswered capture is re-sent
    #[serde(default = "default_capture_timeout_ms")]
    pub capture_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TriggerConfig {
    /// Objects closer than this (mm) are candidates for capture
    #[serde(default = "default_threshold_distance")]
    pub threshold_distance_mm: f64,

    /// Objects whose readings spread less than this (mm) are considered stable
    #[serde(default = "default_threshold_max_deviation")]
    pub threshold_max_deviation_mm: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ImageConfig {
    /// Fetch the capture image after each result
    #[serde(default = "default_image_enabled")]
    pub enabled: bool,

    /// Decimation factor requested from the camera (1 = full resolution)
    #[serde(default = "default_image_decimation")]
    pub decimation: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StorageConfig {
    /// Persist raw results, decoded fields and images
    #[serde(default = "default_storage_enabled")]
    pub enabled: bool,

    /// Base path for scan records
    #[serde(default = "default_storage_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl CameraConfig {
    /// `host:port` form used for connecting and logging
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }
}

impl ScannerConfig {
    /// Load defaults, then the file at `path` if it exists, then `SCANTRIGGER_*` environment variables
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.host", default_camera_host())?
            .set_default("camera.port", default_camera_port())?
            .set_default("camera.connect_timeout_ms", default_connect_timeout_ms())?
            .set_default("camera.capture_timeout_ms", default_capture_timeout_ms())?
            .set_default("trigger.threshold_distance_mm", default_threshold_distance())?
            .set_default(
                "trigger.threshold_max_deviation_mm",
                default_threshold_max_deviation(),
            )?
            .set_default("image.enabled", default_image_enabled())?
            .set_default("image.decimation", default_image_decimation())?
            .set_default("storage.enabled", default_storage_enabled())?
            .set_default("storage.path", default_storage_path())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .add_source(File::with_name(&path_str).required(false))
            // SCANTRIGGER_CAMERA__CAPTURE_TIMEOUT_MS -> camera.capture_timeout_ms
            .add_source(
                Environment::with_prefix("SCANTRIGGER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: ScannerConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.host.trim().is_empty() {
            return Err(ConfigError::Message(
                "Camera host must not be empty".to_string(),
            ));
        }

        if self.camera.port == 0 {
            return Err(ConfigError::Message(
                "Camera port must be greater than 0".to_string(),
            ));
        }

        if self.camera.connect_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Camera connect_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.camera.capture_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Camera capture_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if !(self.trigger.threshold_distance_mm > 0.0) {
            return Err(ConfigError::Message(
                "Trigger threshold_distance_mm must be greater than 0".to_string(),
            ));
        }

        if !(self.trigger.threshold_max_deviation_mm > 0.0) {
            return Err(ConfigError::Message(
                "Trigger threshold_max_deviation_mm must be greater than 0".to_string(),
            ));
        }

        if self.image.decimation == 0 {
            return Err(ConfigError::Message(
                "Image decimation must be at least 1".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                host: default_camera_host(),
                port: default_camera_port(),
                connect_timeout_ms: default_connect_timeout_ms(),
                capture_timeout_ms: default_capture_timeout_ms(),
            },
            trigger: TriggerConfig {
                threshold_distance_mm: default_threshold_distance(),
                threshold_max_deviation_mm: default_threshold_max_deviation(),
            },
            image: ImageConfig {
                enabled: default_image_enabled(),
                decimation: default_image_decimation(),
            },
            storage: StorageConfig {
                enabled: default_storage_enabled(),
                path: default_storage_path(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
            },
        }
    }
}

// Default value functions
fn default_camera_host() -> String {
    "192.168.0.10".to_string()
}
fn default_camera_port() -> u16 {
    23
}
fn default_connect_timeout_ms() -> u64 {
    3000
}
fn default_capture_timeout_ms() -> u64 {
    5000
}

fn default_threshold_distance() -> f64 {
    50.0
}
fn default_threshold_max_deviation() -> f64 {
    1.0
}

fn default_image_enabled() -> bool {
    false
}
fn default_image_decimation() -> u32 {
    1
}

fn default_storage_enabled() -> bool {
    true
}
fn default_storage_path() -> String {
    "./scans".to_string()
}

fn default_event_bus_capacity() -> usize {
    100
}
