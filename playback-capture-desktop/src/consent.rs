//! Console consent flow.
//!
//! Desktop systems have no system-wide "capture playback" dialog, so the
//! user is asked on the terminal before every session. An approved answer
//! becomes a `DesktopGrant` wrapped in a single-use `AuthorizationToken`.

use std::io::{self, BufRead, BufReader, Write};

use chrono::{DateTime, Local};
use parking_lot::Mutex;

use playback_capture_core::{AuthorizationProvider, AuthorizationToken, CaptureError};

/// Proof that the user approved one capture session on this machine.
#[derive(Debug)]
pub struct DesktopGrant {
    pub granted_at: DateTime<Local>,
}

impl Drop for DesktopGrant {
    fn drop(&mut self) {
        log::debug!("Capture grant from {} released", self.granted_at.format("%H:%M:%S"));
    }
}

/// Asks for consent on a line-based reader (stdin by default).
pub struct ConsoleConsent {
    assume_yes: bool,
    input: Mutex<Box<dyn BufRead + Send>>,
}

impl ConsoleConsent {
    pub fn new(assume_yes: bool) -> Self {
        Self::with_reader(assume_yes, BufReader::new(io::stdin()))
    }

    pub fn with_reader(assume_yes: bool, reader: impl BufRead + Send + 'static) -> Self {
        Self {
            assume_yes,
            input: Mutex::new(Box::new(reader)),
        }
    }

    /// Hand back the reader, including anything typed ahead of the answer.
    pub fn into_input(self) -> Box<dyn BufRead + Send> {
        self.input.into_inner()
    }

    fn ask(&self) -> Result<bool, CaptureError> {
        eprint!("Allow capturing audio played on this device? [y/N] ");
        io::stderr().flush().ok();

        let mut answer = String::new();
        self.input
            .lock()
            .read_line(&mut answer)
            .map_err(|e| CaptureError::PermissionDenied(format!("could not read consent answer: {}", e)))?;
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

impl AuthorizationProvider for ConsoleConsent {
    fn has_record_permission(&self) -> bool {
        true
    }

    fn request_token(&self) -> Result<AuthorizationToken, CaptureError> {
        if !self.assume_yes && !self.ask()? {
            return Err(CaptureError::PermissionDenied("user declined playback capture".into()));
        }
        Ok(AuthorizationToken::new(DesktopGrant {
            granted_at: Local::now(),
        }))
    }
}
