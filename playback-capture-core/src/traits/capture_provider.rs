use crate::models::audio_models::{AudioSource, StreamRequest};
use crate::models::authorization::AuthorizationToken;
use crate::models::error::CaptureError;

/// A live, token-scoped audio input stream.
///
/// Owned exclusively by the capture thread once the session is running.
/// Dropping the stream releases the underlying device and the
/// authorization grant it was opened with.
pub trait AudioInputStream: Send {
    /// Blocking read of up to `buf.len()` interleaved samples.
    ///
    /// Returns the number of samples written to the front of `buf`.
    /// `Ok(0)` means no data was available yet; it is not end-of-stream.
    /// Implementations must block (up to roughly one block's duration)
    /// rather than return `Ok(0)` immediately in a loop.
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, CaptureError>;

    /// Stop the device. Called once by the capture thread before dropping.
    fn stop(&mut self) -> Result<(), CaptureError>;
}

/// Interface for platform-specific playback capture sources.
///
/// Implemented by:
/// - `ReplayProvider` (raw PCM file, desktop host)
/// - `CpalProvider` (default input or loopback device, desktop host)
pub trait CaptureProvider: Send + Sync {
    /// Whether this capture source is currently available.
    fn is_available(&self) -> bool;

    /// Open an input stream for `request`, consuming `token`.
    ///
    /// Expected failures: `DeviceUnavailable` when the device cannot be
    /// opened, `PermissionDenied` when the token belongs to another backend.
    fn open_stream(
        &self,
        token: AuthorizationToken,
        request: &StreamRequest,
    ) -> Result<Box<dyn AudioInputStream>, CaptureError>;

    /// Information about the source backing this provider.
    fn device_info(&self) -> AudioSource;
}

impl<T: CaptureProvider + ?Sized> CaptureProvider for Box<T> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn open_stream(
        &self,
        token: AuthorizationToken,
        request: &StreamRequest,
    ) -> Result<Box<dyn AudioInputStream>, CaptureError> {
        (**self).open_stream(token, request)
    }

    fn device_info(&self) -> AudioSource {
        (**self).device_info()
    }
}
