use crossbeam_channel::{Receiver, Sender};

use playback_capture_core::{CaptureError, CaptureReport, CaptureState, SessionHost};

/// `SessionHost` that logs every event and forwards finished reports.
///
/// The receiver returned by `new` lets the caller notice a capture that
/// ended on its own (device lost, disk full) without polling.
pub struct LoggingHost {
    finished: Sender<CaptureReport>,
}

impl LoggingHost {
    pub fn new() -> (Self, Receiver<CaptureReport>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { finished: tx }, rx)
    }
}

impl SessionHost for LoggingHost {
    fn on_state_changed(&self, state: CaptureState) {
        log::info!("Capture session is {}", state);
    }

    fn on_error(&self, error: &CaptureError) {
        log::error!("Capture failed: {}", error);
    }

    fn on_capture_finished(&self, report: &CaptureReport) {
        log::info!(
            "Capture finished: {} ({} bytes, {:.2}s)",
            report.file_path.display(),
            report.bytes_written,
            report.duration.as_secs_f64()
        );
        let _ = self.finished.send(report.clone());
    }
}
