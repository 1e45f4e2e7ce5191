use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::recording_result::CaptureMetadata;

/// Sidecar path for a capture: `Capture-x.pcm` → `Capture-x.metadata.json`.
pub fn metadata_path(capture_path: &Path) -> PathBuf {
    capture_path.with_extension("metadata.json")
}

/// Write capture metadata as a JSON sidecar file next to the capture.
pub fn write_metadata(metadata: &CaptureMetadata, capture_path: &Path) -> Result<PathBuf, CaptureError> {
    let path = metadata_path(capture_path);
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| CaptureError::OutputUnavailable(format!("failed to serialize metadata: {}", e)))?;
    fs::write(&path, json)
        .map_err(|e| CaptureError::OutputUnavailable(format!("failed to write metadata: {}", e)))?;
    Ok(path)
}

/// Read capture metadata from a JSON sidecar file.
pub fn read_metadata(capture_path: &Path) -> Result<CaptureMetadata, CaptureError> {
    let path = metadata_path(capture_path);
    let json = fs::read_to_string(&path)
        .map_err(|e| CaptureError::OutputUnavailable(format!("failed to read metadata: {}", e)))?;
    serde_json::from_str(&json)
        .map_err(|e| CaptureError::OutputUnavailable(format!("failed to parse metadata: {}", e)))
}
