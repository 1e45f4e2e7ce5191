//! # playback-capture-core
//!
//! Platform-agnostic playback capture core library.
//!
//! Provides the capture session controller, the blocking PCM capture loop,
//! timestamped output naming and raw PCM file output. Platform backends
//! implement the `CaptureProvider` trait; consent flows implement
//! `AuthorizationProvider`; UI or service layers implement `SessionHost`.
//!
//! ## Architecture
//!
//! ```text
//! playback-capture-core (this crate)
//! ├── traits/       ← CaptureProvider, AudioInputStream, AuthorizationProvider, SessionHost
//! ├── models/       ← CaptureError, CaptureState, CaptureConfiguration, AuthorizationToken, etc.
//! ├── processing/   ← s16le sample/byte conversion
//! ├── session/      ← CaptureController + capture thread loop
//! └── storage/      ← PcmFileWriter, file naming, metadata sidecar
//! ```
//!
//! Output files are headerless signed 16-bit little-endian PCM.

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioSource, CaptureDiagnostics, PlaybackUsage, StreamFormat, StreamRequest};
pub use models::authorization::AuthorizationToken;
pub use models::config::{CaptureConfiguration, CollisionPolicy};
pub use models::error::CaptureError;
pub use models::recording_result::{CaptureMetadata, CaptureReport, Termination};
pub use models::state::CaptureState;
pub use session::controller::{CaptureController, SessionInfo};
pub use storage::pcm_writer::PcmFileWriter;
pub use traits::authorization_provider::AuthorizationProvider;
pub use traits::capture_provider::{AudioInputStream, CaptureProvider};
pub use traits::session_host::SessionHost;
