use crate::error::{Result, ScannerError};
use crate::parser::ScanFields;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::debug;

pub const RAW_FILE: &str = "raw.bin";
pub const FIELDS_FILE: &str = "fields.json";
pub const IMAGE_FILE: &str = "image.bin";

/// Capture-event id for a timestamp, e.g. `20240115_143022_123`
pub fn event_id_for(timestamp: SystemTime) -> String {
    let datetime: DateTime<Utc> = timestamp.into();
    datetime.format("%Y%m%d_%H%M%S_%3f").to_string()
}

/// Persists scan artifacts in one directory per capture event
#[derive(Debug, Clone)]
pub struct ScanStore {
    root: PathBuf,
}

impl ScanStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn event_dir(&self, event_id: &str) -> PathBuf {
        self.root.join(event_id)
    }

    /// Write the raw frame and the decoded fields; returns the event directory
    pub async fn save_scan(&self, event_id: &str, raw: &[u8], fields: &ScanFields) -> Result<PathBuf> {
        let dir = self.create_event_dir(event_id).await?;

        let fields_json = serde_json::to_string_pretty(fields)?;
        write_file(&dir.join(RAW_FILE), raw).await?;
        write_file(&dir.join(FIELDS_FILE), fields_json.as_bytes()).await?;

        debug!("Saved scan {} to {}", event_id, dir.display());
        Ok(dir)
    }

    pub async fn save_image(&self, event_id: &str, image: &[u8]) -> Result<PathBuf> {
        let dir = self.create_event_dir(event_id).await?;
        let path = dir.join(IMAGE_FILE);
        write_file(&path, image).await?;

        debug!("Saved {} byte image for scan {}", image.len(), event_id);
        Ok(path)
    }

    pub async fn load_fields(&self, event_id: &str) -> Result<ScanFields> {
        let path = self.event_dir(event_id).join(FIELDS_FILE);
        let json = fs::read_to_string(&path).await.map_err(|e| {
            ScannerError::component(
                "scan_store",
                &format!("Failed to read {}: {}", path.display(), e),
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    async fn create_event_dir(&self, event_id: &str) -> Result<PathBuf> {
        let dir = self.event_dir(event_id);
        fs::create_dir_all(&dir).await.map_err(|e| {
            ScannerError::component(
                "scan_store",
                &format!("Failed to create event directory {}: {}", dir.display(), e),
            )
        })?;
        Ok(dir)
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents).await.map_err(|e| {
        ScannerError::component(
            "scan_store",
            &format!("Failed to write {}: {}", path.display(), e),
        )
    })
}
