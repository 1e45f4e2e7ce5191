use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during playback capture operations.
///
/// Every variant is recoverable at the session boundary: none of them
/// leave a stream or file handle open behind the caller's back.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("a capture session is already running")]
    AlreadyCapturing,

    #[error("capture session is busy starting or stopping")]
    SessionBusy,

    #[error("no active capture session")]
    NoActiveCapture,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("output unavailable: {0}")]
    OutputUnavailable(String),

    #[error("capture stream error: {0}")]
    CaptureStreamError(String),

    #[error("capture worker did not shut down in time")]
    ShutdownTimeout,

    #[error("output file already exists: {}", .0.display())]
    PathCollision(PathBuf),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),
}
