use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Result returned when a diagnostic recording is saved.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub duration_secs: f64,
    pub metadata: RecordingMetadata,
    pub checksum: String,
}

/// Metadata written as a JSON sidecar next to a saved recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub duration_secs: f64,
    pub file_path: String,
    pub checksum: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
    pub sample_count: u64,
    pub created_at: String,
}

impl RecordingMetadata {
    /// Creates metadata for a mono 16-bit PCM recording.
    pub fn new_mono(sample_rate: u32, sample_count: u64, file_path: &str, checksum: &str) -> Self {
        let duration_secs = if sample_rate == 0 {
            0.0
        } else {
            sample_count as f64 / sample_rate as f64
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            duration_secs,
            file_path: file_path.to_string(),
            checksum: checksum.to_string(),
            sample_rate,
            channels: 1,
            bit_depth: 16,
            sample_count,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
