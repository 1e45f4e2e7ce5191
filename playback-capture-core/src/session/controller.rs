use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::NaiveDateTime;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::audio_models::StreamRequest;
use crate::models::authorization::AuthorizationToken;
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::models::recording_result::CaptureReport;
use crate::models::state::CaptureState;
use crate::session::capture_worker::CaptureWorker;
use crate::storage::naming;
use crate::storage::pcm_writer::PcmFileWriter;
use crate::traits::authorization_provider::AuthorizationProvider;
use crate::traits::capture_provider::{AudioInputStream, CaptureProvider};
use crate::traits::session_host::SessionHost;

type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;
type Host = Option<Arc<dyn SessionHost>>;

/// Public view of the running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub session_id: Uuid,
    pub output_path: PathBuf,
    pub state: CaptureState,
}

/// Handles the controller keeps for a running capture thread.
struct ActiveWorker {
    session_id: Uuid,
    output_path: PathBuf,
    stop_requested: Arc<AtomicBool>,
    done: Receiver<CaptureReport>,
    handle: Option<thread::JoinHandle<()>>,
}

/// Session slot shared between the controller and its capture thread.
///
/// The lock is only held for state checks and transitions, never across
/// device or file I/O.
struct SessionSlot {
    state: CaptureState,
    worker: Option<ActiveWorker>,
}

/// Outcome of a worker that finished while nobody was waiting in `stop`.
struct Reaped {
    report: Option<CaptureReport>,
    handle: Option<thread::JoinHandle<()>>,
}

/// Owns the capture session lifecycle.
///
/// Generic over the platform backend via the `CaptureProvider` trait. At
/// most one session runs per controller; all methods take `&self`, so the
/// controller can be shared (`Arc<CaptureController<_>>`) between the
/// threads issuing start and stop commands.
///
/// ```text
/// start(token) → [provider.open_stream] → [resolve path] → [PcmFileWriter]
///              → spawn "pcm-capture" thread running CaptureWorker
/// stop()       → raise stop flag → bounded wait for the report → idle
/// ```
pub struct CaptureController<P: CaptureProvider> {
    provider: P,
    config: CaptureConfiguration,
    host: Host,
    clock: Clock,
    slot: Arc<Mutex<SessionSlot>>,
}

impl<P: CaptureProvider> CaptureController<P> {
    pub fn new(provider: P, config: CaptureConfiguration) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(Self {
            provider,
            config,
            host: None,
            clock: Arc::new(|| chrono::Local::now().naive_local()),
            slot: Arc::new(Mutex::new(SessionSlot {
                state: CaptureState::Idle,
                worker: None,
            })),
        })
    }

    pub fn set_host(&mut self, host: Arc<dyn SessionHost>) {
        self.host = Some(host);
    }

    /// Replace the wall clock used for output file names.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDateTime + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &CaptureConfiguration {
        &self.config
    }

    /// Current session state. Also collects a worker that finished after an
    /// earlier `stop` gave up waiting.
    pub fn state(&self) -> CaptureState {
        let (state, reaped) = {
            let mut slot = self.slot.lock();
            let reaped = reap_finished(&mut slot);
            (slot.state, reaped)
        };
        if let Some(reaped) = reaped {
            self.conclude(reaped);
        }
        state
    }

    pub fn current_session(&self) -> Option<SessionInfo> {
        let slot = self.slot.lock();
        slot.worker.as_ref().map(|w| SessionInfo {
            session_id: w.session_id,
            output_path: w.output_path.clone(),
            state: slot.state,
        })
    }

    /// Check permission, obtain a fresh token from `authorization` and start.
    pub fn start_authorized(&self, authorization: &dyn AuthorizationProvider) -> Result<(), CaptureError> {
        match self.state() {
            CaptureState::Idle => {}
            CaptureState::Capturing => return Err(CaptureError::AlreadyCapturing),
            CaptureState::Starting | CaptureState::Stopping => return Err(CaptureError::SessionBusy),
        }
        if !authorization.has_record_permission() {
            return Err(CaptureError::PermissionDenied("record audio permission not granted".into()));
        }
        let token = authorization.request_token()?;
        self.start(token)
    }

    /// Start a capture session with `token`. Transitions: idle → starting → capturing.
    pub fn start(&self, token: AuthorizationToken) -> Result<(), CaptureError> {
        let reaped = {
            let mut slot = self.slot.lock();
            let reaped = reap_finished(&mut slot);
            let current = slot.state;
            match current {
                CaptureState::Capturing => return Err(CaptureError::AlreadyCapturing),
                CaptureState::Starting | CaptureState::Stopping => return Err(CaptureError::SessionBusy),
                CaptureState::Idle => slot.state = CaptureState::Starting,
            }
            reaped
        };
        if let Some(reaped) = reaped {
            self.conclude(reaped);
        }
        notify_state(&self.host, CaptureState::Starting);

        let result = self
            .open_session(token)
            .and_then(|(stream, writer)| self.spawn_worker(stream, writer));

        if let Err(ref e) = result {
            log::warn!("Capture start failed: {}", e);
            self.slot.lock().state = CaptureState::Idle;
            notify_state(&self.host, CaptureState::Idle);
        }
        result
    }

    /// Stop the running session and wait for the file to be closed.
    /// Transitions: capturing → stopping → idle.
    ///
    /// If the capture thread does not finish within the configured shutdown
    /// timeout, `ShutdownTimeout` is returned and the session stays in
    /// `Stopping`; call `stop` again to keep waiting.
    pub fn stop(&self) -> Result<CaptureReport, CaptureError> {
        let (first_request, stop_requested, done) = {
            let mut slot = self.slot.lock();
            match slot.state {
                CaptureState::Idle => return Err(CaptureError::NoActiveCapture),
                CaptureState::Starting => return Err(CaptureError::SessionBusy),
                CaptureState::Capturing | CaptureState::Stopping => {}
            }
            let worker = slot.worker.as_ref().ok_or(CaptureError::NoActiveCapture)?;
            let handles = (Arc::clone(&worker.stop_requested), worker.done.clone());
            let first_request = slot.state.is_capturing();
            slot.state = CaptureState::Stopping;
            (first_request, handles.0, handles.1)
        };

        if first_request {
            notify_state(&self.host, CaptureState::Stopping);
        }
        stop_requested.store(true, Ordering::Release);

        match done.recv_timeout(self.config.shutdown_timeout) {
            Ok(report) => {
                let handle = self.release_slot();
                self.conclude(Reaped {
                    report: Some(report.clone()),
                    handle,
                });
                Ok(report)
            }
            Err(RecvTimeoutError::Timeout) => {
                if self.slot.lock().state.is_idle() {
                    // Another caller collected the report meanwhile.
                    return Err(CaptureError::NoActiveCapture);
                }
                log::warn!(
                    "Capture thread still running after {:?}",
                    self.config.shutdown_timeout
                );
                Err(CaptureError::ShutdownTimeout)
            }
            Err(RecvTimeoutError::Disconnected) => {
                let handle = self.release_slot();
                self.conclude(Reaped { report: None, handle });
                Err(CaptureError::CaptureStreamError(
                    "capture thread exited without a report".into(),
                ))
            }
        }
    }

    fn stream_request(&self) -> StreamRequest {
        StreamRequest {
            format: self.config.stream_format(),
            block_size: self.config.block_size,
            buffer_size_bytes: self.config.buffer_size_bytes(),
            usages: self.config.usages.clone(),
        }
    }

    /// Open the stream first so a refused device never leaves a file behind,
    /// then the output file. The stream is stopped again if the file fails.
    fn open_session(
        &self,
        token: AuthorizationToken,
    ) -> Result<(Box<dyn AudioInputStream>, PcmFileWriter), CaptureError> {
        let token_id = token.id();
        let mut stream = self.provider.open_stream(token, &self.stream_request())?;
        log::debug!("Opened input stream with token {}", token_id);

        let now = (self.clock)();
        let writer = naming::resolve_path(&self.config.output_directory, now, self.config.collision_policy)
            .and_then(PcmFileWriter::create);

        match writer {
            Ok(writer) => Ok((stream, writer)),
            Err(e) => {
                if let Err(stop_err) = stream.stop() {
                    log::warn!("Failed to stop input stream after output error: {}", stop_err);
                }
                Err(e)
            }
        }
    }

    fn spawn_worker(&self, stream: Box<dyn AudioInputStream>, writer: PcmFileWriter) -> Result<(), CaptureError> {
        let session_id = Uuid::new_v4();
        let output_path = writer.file_path().to_path_buf();
        let stop_requested = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);

        let worker = CaptureWorker {
            session_id,
            stream,
            writer,
            format: self.config.stream_format(),
            block_size: self.config.block_size,
            stop_requested: Arc::clone(&stop_requested),
            write_metadata: self.config.write_metadata,
        };

        let slot_ref = Arc::clone(&self.slot);
        let host = self.host.clone();
        // Held back until the host has seen `Capturing`, so every event the
        // worker emits comes after it.
        let (go_tx, go_rx) = crossbeam_channel::bounded::<()>(1);

        // Spawn under the lock so the thread can only observe the slot after
        // it has been marked capturing.
        let mut slot = self.slot.lock();
        let spawned = thread::Builder::new().name("pcm-capture".into()).spawn(move || {
            let _ = go_rx.recv();
            let report = worker.run();
            complete_from_worker(&slot_ref, &host, report, done_tx);
        });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                drop(slot);
                if let Err(rm_err) = fs::remove_file(&output_path) {
                    log::warn!("Failed to remove {}: {}", output_path.display(), rm_err);
                }
                return Err(CaptureError::CaptureStreamError(format!(
                    "failed to spawn capture thread: {}",
                    e
                )));
            }
        };

        log::info!("Capture {} started: {}", session_id, output_path.display());
        slot.state = CaptureState::Capturing;
        slot.worker = Some(ActiveWorker {
            session_id,
            output_path,
            stop_requested,
            done: done_rx,
            handle: Some(handle),
        });
        drop(slot);

        notify_state(&self.host, CaptureState::Capturing);
        let _ = go_tx.send(());
        Ok(())
    }

    /// Return the slot to idle and hand back the thread handle for joining.
    fn release_slot(&self) -> Option<thread::JoinHandle<()>> {
        let mut slot = self.slot.lock();
        slot.state = CaptureState::Idle;
        slot.worker.take().and_then(|w| w.handle)
    }

    /// Join the finished thread and tell the host. Runs without the lock.
    fn conclude(&self, reaped: Reaped) {
        if let Some(handle) = reaped.handle {
            if handle.join().is_err() {
                log::error!("Capture thread panicked");
            }
        }
        if let Some(ref report) = reaped.report {
            notify_finished(&self.host, report);
        }
        notify_state(&self.host, CaptureState::Idle);
    }
}

impl<P: CaptureProvider> Drop for CaptureController<P> {
    fn drop(&mut self) {
        let worker = {
            let mut slot = self.slot.lock();
            if slot.state.is_capturing() {
                slot.state = CaptureState::Stopping;
            }
            slot.worker.take()
        };
        if let Some(mut worker) = worker {
            worker.stop_requested.store(true, Ordering::Release);
            match worker.done.recv_timeout(self.config.shutdown_timeout) {
                Ok(report) => {
                    if let Some(handle) = worker.handle.take() {
                        if handle.join().is_err() {
                            log::error!("Capture thread panicked");
                        }
                    }
                    notify_finished(&self.host, &report);
                }
                Err(_) => log::warn!("Capture {} abandoned while shutting down", worker.session_id),
            }
        }
    }
}

/// Collect a worker that finished after `stop` timed out.
fn reap_finished(slot: &mut SessionSlot) -> Option<Reaped> {
    if slot.state != CaptureState::Stopping {
        return None;
    }
    let outcome = slot.worker.as_ref()?.done.try_recv();
    let report = match outcome {
        Ok(report) => Some(report),
        Err(TryRecvError::Empty) => return None,
        Err(TryRecvError::Disconnected) => {
            log::error!("Capture thread exited without a report");
            None
        }
    };
    slot.state = CaptureState::Idle;
    let handle = slot.worker.take().and_then(|w| w.handle);
    Some(Reaped { report, handle })
}

/// Last step of the capture thread.
///
/// While the slot is still `Capturing` nobody asked the loop to stop, so it
/// ended on a stream or file error: the thread returns the slot to idle
/// itself and reports to the host. Otherwise a `stop` call owns the
/// transition and receives the report over the channel.
fn complete_from_worker(
    slot: &Mutex<SessionSlot>,
    host: &Host,
    report: CaptureReport,
    done: Sender<CaptureReport>,
) {
    let self_terminated = {
        let mut slot = slot.lock();
        if slot.state.is_capturing() {
            slot.state = CaptureState::Idle;
            // Detaches this thread's own handle; it is about to exit.
            slot.worker = None;
            true
        } else {
            false
        }
    };

    if self_terminated {
        log::warn!("Capture {} ended without a stop request", report.session_id);
        notify_finished(host, &report);
        notify_state(host, CaptureState::Idle);
    } else if done.send(report).is_err() {
        log::warn!("Capture report dropped: controller is gone");
    }
}

fn notify_state(host: &Host, state: CaptureState) {
    log::debug!("Capture state → {}", state);
    if let Some(ref host) = host {
        host.on_state_changed(state);
    }
}

fn notify_finished(host: &Host, report: &CaptureReport) {
    if let Some(ref host) = host {
        if let Some(error) = report.termination.error() {
            host.on_error(error);
        }
        host.on_capture_finished(report);
    }
}
