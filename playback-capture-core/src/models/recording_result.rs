use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::audio_models::{CaptureDiagnostics, StreamFormat};
use super::error::CaptureError;

/// Why the capture loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// `stop` was requested by the caller.
    StopRequested,
    /// A read from the input stream failed.
    StreamFailed(CaptureError),
    /// Appending to the output file failed.
    OutputFailed(CaptureError),
}

impl Termination {
    pub fn error(&self) -> Option<&CaptureError> {
        match self {
            Self::StopRequested => None,
            Self::StreamFailed(e) | Self::OutputFailed(e) => Some(e),
        }
    }
}

/// Result of a finished capture session, handed back by `stop` and to
/// `SessionHost::on_capture_finished`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureReport {
    pub session_id: Uuid,
    pub file_path: PathBuf,
    pub format: StreamFormat,
    pub bytes_written: u64,
    pub duration: Duration,
    /// SHA-256 of the output file, empty if the file could not be re-read.
    pub checksum: String,
    pub termination: Termination,
    pub diagnostics: CaptureDiagnostics,
}

/// JSON sidecar describing a headerless PCM capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureMetadata {
    pub id: String,
    pub file_path: String,
    pub encoding: String,
    pub sample_rate_hz: u32,
    pub channel_count: u16,
    pub bits_per_sample: u16,
    pub bytes: u64,
    pub duration_secs: f64,
    pub checksum: String,
    pub created_at: String,
    pub error: Option<String>,
}

impl CaptureMetadata {
    pub fn from_report(report: &CaptureReport) -> Self {
        Self {
            id: report.session_id.to_string(),
            file_path: report.file_path.to_string_lossy().to_string(),
            encoding: "s16le".to_string(),
            sample_rate_hz: report.format.sample_rate_hz,
            channel_count: report.format.channel_count,
            bits_per_sample: report.format.bits_per_sample,
            bytes: report.bytes_written,
            duration_secs: report.duration.as_secs_f64(),
            checksum: report.checksum.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
            error: report.termination.error().map(|e| e.to_string()),
        }
    }
}
