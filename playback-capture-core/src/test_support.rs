//! Scripted streams, providers and hosts shared by the unit tests.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::audio_models::{AudioSource, StreamRequest};
use crate::models::authorization::AuthorizationToken;
use crate::models::error::CaptureError;
use crate::models::recording_result::CaptureReport;
use crate::models::state::CaptureState;
use crate::storage::pcm_writer::OutputSink;
use crate::traits::authorization_provider::AuthorizationProvider;
use crate::traits::capture_provider::{AudioInputStream, CaptureProvider};
use crate::traits::session_host::SessionHost;

/// Grant type the scripted provider accepts.
pub struct TestGrant;

pub fn token() -> AuthorizationToken {
    AuthorizationToken::new(TestGrant)
}

/// One scripted answer to `AudioInputStream::read`.
#[derive(Debug, Clone)]
pub enum Step {
    Samples(Vec<i16>),
    Empty,
    Fail(String),
    FailWith(CaptureError),
    /// Block inside `read` for this long, ignoring cancellation.
    Hang(Duration),
}

/// Shared view of what happened to scripted streams.
#[derive(Clone, Default)]
pub struct StreamProbe {
    opened: Arc<AtomicUsize>,
    reads_started: Arc<AtomicUsize>,
    samples_served: Arc<AtomicUsize>,
    stopped: Arc<AtomicBool>,
    released: Arc<AtomicBool>,
}

impl StreamProbe {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn reads_started(&self) -> usize {
        self.reads_started.load(Ordering::SeqCst)
    }

    pub fn was_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn was_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Wait until `count` `Samples` steps have been handed out.
    pub fn wait_for_samples_served(&self, count: usize) {
        wait_until(|| self.samples_served.load(Ordering::SeqCst) >= count);
    }

    pub fn wait_for_reads_started(&self, count: usize) {
        wait_until(|| self.reads_started() >= count);
    }
}

pub fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met within 5s");
        thread::sleep(Duration::from_millis(2));
    }
}

/// Input stream that replays a fixed list of steps, then reports no data.
pub struct ScriptedStream {
    steps: VecDeque<Step>,
    probe: StreamProbe,
    idle: Duration,
    stop_when_exhausted: Option<Arc<AtomicBool>>,
}

impl ScriptedStream {
    pub fn new(steps: Vec<Step>, probe: StreamProbe) -> Self {
        probe.opened.fetch_add(1, Ordering::SeqCst);
        Self {
            steps: steps.into(),
            probe,
            idle: Duration::from_millis(2),
            stop_when_exhausted: None,
        }
    }

    /// Raise `flag` once every step has been served, ending the capture loop.
    pub fn stop_after_script(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_when_exhausted = Some(flag);
        self
    }
}

impl AudioInputStream for ScriptedStream {
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, CaptureError> {
        self.probe.reads_started.fetch_add(1, Ordering::SeqCst);
        match self.steps.pop_front() {
            Some(Step::Samples(samples)) => {
                let n = samples.len().min(buf.len());
                buf[..n].copy_from_slice(&samples[..n]);
                self.probe.samples_served.fetch_add(1, Ordering::SeqCst);
                Ok(n)
            }
            Some(Step::Empty) => {
                thread::sleep(self.idle);
                Ok(0)
            }
            Some(Step::Fail(message)) => Err(CaptureError::CaptureStreamError(message)),
            Some(Step::FailWith(error)) => Err(error),
            Some(Step::Hang(duration)) => {
                thread::sleep(duration);
                Ok(0)
            }
            None => {
                if let Some(flag) = &self.stop_when_exhausted {
                    flag.store(true, Ordering::Release);
                }
                thread::sleep(self.idle);
                Ok(0)
            }
        }
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.probe.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        self.probe.released.store(true, Ordering::SeqCst);
    }
}

/// Provider handing out one script per opened stream.
pub struct ScriptedProvider {
    scripts: Mutex<VecDeque<Vec<Step>>>,
    pub probe: StreamProbe,
    pub fail_open: bool,
    pub last_request: Mutex<Option<StreamRequest>>,
}

impl ScriptedProvider {
    pub fn new(scripts: Vec<Vec<Step>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            probe: StreamProbe::default(),
            fail_open: false,
            last_request: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::new(Vec::new())
        }
    }
}

impl CaptureProvider for ScriptedProvider {
    fn is_available(&self) -> bool {
        !self.fail_open
    }

    fn open_stream(
        &self,
        token: AuthorizationToken,
        request: &StreamRequest,
    ) -> Result<Box<dyn AudioInputStream>, CaptureError> {
        let _grant: TestGrant = token.into_grant()?;
        if self.fail_open {
            return Err(CaptureError::DeviceUnavailable("scripted device is offline".into()));
        }
        *self.last_request.lock() = Some(request.clone());
        let steps = self.scripts.lock().pop_front().unwrap_or_default();
        Ok(Box::new(ScriptedStream::new(steps, self.probe.clone())))
    }

    fn device_info(&self) -> AudioSource {
        AudioSource {
            id: "scripted".into(),
            name: "Scripted Stream".into(),
            is_default: true,
        }
    }
}

pub struct StaticAuthorization {
    pub permitted: bool,
    pub issued: AtomicUsize,
}

impl StaticAuthorization {
    pub fn new(permitted: bool) -> Self {
        Self {
            permitted,
            issued: AtomicUsize::new(0),
        }
    }
}

impl AuthorizationProvider for StaticAuthorization {
    fn has_record_permission(&self) -> bool {
        self.permitted
    }

    fn request_token(&self) -> Result<AuthorizationToken, CaptureError> {
        self.issued.fetch_add(1, Ordering::SeqCst);
        Ok(token())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    State(CaptureState),
    Error(CaptureError),
    Finished(CaptureReport),
}

/// Session host that records every notification.
#[derive(Default)]
pub struct RecordingHost {
    events: Mutex<Vec<HostEvent>>,
}

impl RecordingHost {
    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().clone()
    }

    pub fn states(&self) -> Vec<CaptureState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HostEvent::State(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<CaptureError> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HostEvent::Error(err) => Some(err),
                _ => None,
            })
            .collect()
    }

    /// Block until a finished report arrives and return it.
    pub fn wait_for_report(&self) -> CaptureReport {
        let mut found = None;
        wait_until(|| {
            found = self.events().into_iter().find_map(|e| match e {
                HostEvent::Finished(report) => Some(report),
                _ => None,
            });
            found.is_some()
        });
        found.expect("report present after wait")
    }
}

impl SessionHost for RecordingHost {
    fn on_state_changed(&self, state: CaptureState) {
        self.events.lock().push(HostEvent::State(state));
    }

    fn on_error(&self, error: &CaptureError) {
        self.events.lock().push(HostEvent::Error(error.clone()));
    }

    fn on_capture_finished(&self, report: &CaptureReport) {
        self.events.lock().push(HostEvent::Finished(report.clone()));
    }
}

/// File sink that runs out of space after `budget` bytes.
pub struct LimitedSink {
    file: File,
    budget: usize,
}

impl LimitedSink {
    pub fn create(path: &Path, budget: usize) -> Self {
        Self {
            file: File::create(path).unwrap(),
            budget,
        }
    }
}

impl Write for LimitedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.budget == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "no space left on device"));
        }
        let n = buf.len().min(self.budget);
        self.file.write_all(&buf[..n])?;
        self.budget -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl OutputSink for LimitedSink {
    fn sync(&self) -> io::Result<()> {
        self.file.sync_all()
    }
}
