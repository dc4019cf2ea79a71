use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::LinkError;
use crate::models::recording_result::RecordingMetadata;

/// Sidecar location for a recording: `{stem}.metadata.json` next to it.
pub fn metadata_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

/// Write recording metadata as a JSON sidecar file.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<(), LinkError> {
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| LinkError::StorageError(format!("failed to serialize metadata: {}", e)))?;
    fs::write(metadata_path(recording_path), json)
        .map_err(|e| LinkError::StorageError(format!("failed to write metadata: {}", e)))?;
    Ok(())
}

/// Read recording metadata from a JSON sidecar file.
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, LinkError> {
    let json = fs::read_to_string(metadata_path(recording_path))
        .map_err(|e| LinkError::StorageError(format!("failed to read metadata: {}", e)))?;
    serde_json::from_str(&json).map_err(|e| LinkError::StorageError(format!("failed to parse metadata: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_sits_next_to_recording() {
        let path = Path::new("/tmp/out/recorded_audio_1.wav");
        assert_eq!(metadata_path(path), PathBuf::from("/tmp/out/recorded_audio_1.metadata.json"));
    }

    #[test]
    fn write_then_read_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let recording = dir.path().join("recorded_audio_2.wav");
        let metadata = RecordingMetadata::new_mono(48000, 96000, &recording.to_string_lossy(), "abc123");

        write_metadata(&metadata, &recording).unwrap();
        let loaded = read_metadata(&recording).unwrap();

        assert_eq!(loaded, metadata);
        assert!((loaded.duration_secs - 2.0).abs() < 1e-9);
    }

    #[test]
    fn missing_sidecar_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_metadata(&dir.path().join("nothing.wav")).unwrap_err();
        assert!(matches!(err, LinkError::StorageError(_)));
    }
}
