use crate::models::error::CaptureError;
use crate::models::recording_result::CaptureReport;
use crate::models::state::CaptureState;

/// Event sink for capture session notifications.
///
/// Methods may be called from the capture thread as well as from the thread
/// calling into the controller, never while the session lock is held.
/// Implementations should marshal to a UI thread if needed.
pub trait SessionHost: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: CaptureState);

    /// Called when capture ended because of an error.
    fn on_error(&self, error: &CaptureError);

    /// Called when the output file is closed.
    fn on_capture_finished(&self, report: &CaptureReport);
}
