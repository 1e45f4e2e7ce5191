//! # playback-capture-desktop
//!
//! Desktop host for `playback-capture-core`.
//!
//! Provides:
//! - `ConsoleConsent`: terminal consent prompt issuing single-use tokens
//! - `ReplayProvider`: replays a raw PCM file as a live stream
//! - `CpalProvider`: loopback / default input capture via cpal (feature `cpal`)
//! - `LoggingHost`: session host that logs events and forwards reports
//! - `cli`: command line options for the `playback-capture` binary

pub mod cli;
pub mod consent;
pub mod host;
pub mod providers;

pub use consent::{ConsoleConsent, DesktopGrant};
pub use host::LoggingHost;
pub use providers::ReplayProvider;

#[cfg(feature = "cpal")]
pub use providers::CpalProvider;

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use std::sync::Arc;
    use std::time::Duration;

    use playback_capture_core::processing::pcm_format;
    use playback_capture_core::storage::metadata;
    use playback_capture_core::{CaptureConfiguration, CaptureController, CaptureState, Termination};

    #[test]
    fn replay_capture_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.pcm");
        let samples: Vec<i16> = (0..3000).map(|i| (i * 7 % 2000 - 1000) as i16).collect();
        fs::write(&source, pcm_format::encode_le(&samples)).unwrap();

        let config = CaptureConfiguration {
            output_directory: dir.path().join("out"),
            shutdown_timeout: Duration::from_secs(2),
            ..Default::default()
        };
        let (host, finished) = LoggingHost::new();
        let mut controller = CaptureController::new(ReplayProvider::new(&source).unpaced(), config).unwrap();
        controller.set_host(Arc::new(host));

        let consent = ConsoleConsent::with_reader(false, Cursor::new("y\n"));
        controller.start_authorized(&consent).unwrap();
        assert_eq!(controller.state(), CaptureState::Capturing);

        let session = controller.current_session().unwrap();
        // Unpaced: the whole file is consumed almost at once, then the stream idles.
        std::thread::sleep(Duration::from_millis(300));
        let report = controller.stop().unwrap();

        assert_eq!(report.session_id, session.session_id);
        assert_eq!(report.file_path, session.output_path);
        assert!(report.file_path.starts_with(dir.path().join("out").join("AudioCaptures")));
        assert_eq!(report.termination, Termination::StopRequested);
        assert_eq!(pcm_format::decode_le(&fs::read(&report.file_path).unwrap()), samples);
        assert_eq!(finished.try_recv().unwrap().session_id, report.session_id);
        assert_eq!(metadata::read_metadata(&report.file_path).unwrap().bytes, 6000);
    }

    #[test]
    fn declined_consent_never_opens_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = CaptureConfiguration {
            output_directory: dir.path().to_path_buf(),
            ..Default::default()
        };
        let controller = CaptureController::new(ReplayProvider::new(dir.path().join("none.pcm")), config).unwrap();

        let consent = ConsoleConsent::with_reader(false, Cursor::new("n\n"));
        assert!(controller.start_authorized(&consent).is_err());
        assert_eq!(controller.state(), CaptureState::Idle);
        assert!(!dir.path().join("AudioCaptures").exists());
    }
}
