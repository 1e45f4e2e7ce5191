//! Live capture through cpal.
//!
//! In loopback mode the default *output* device is opened as an input
//! stream, which WASAPI (Windows) and Core Audio taps (macOS 14.2+) turn
//! into a capture of everything being played. Otherwise the default input
//! device is used, e.g. a monitor source on PulseAudio/PipeWire.
//!
//! cpal streams are not `Send` on every platform, so each stream lives on
//! its own `cpal-input` thread; samples reach the capture loop through a
//! bounded channel.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};

use playback_capture_core::{
    AudioInputStream, AudioSource, AuthorizationToken, CaptureError, CaptureProvider, StreamRequest,
};

use crate::consent::DesktopGrant;

/// Blocks buffered between the device callback and the capture loop.
const CHANNEL_BLOCKS: usize = 64;

pub struct CpalProvider {
    loopback: bool,
}

impl CpalProvider {
    /// Capture what is played on the default output device.
    pub fn loopback() -> Self {
        Self { loopback: true }
    }

    /// Capture from the default input device.
    pub fn default_input() -> Self {
        Self { loopback: false }
    }

    fn device(&self) -> Option<cpal::Device> {
        let host = cpal::default_host();
        if self.loopback {
            host.default_output_device()
        } else {
            host.default_input_device()
        }
    }
}

impl CaptureProvider for CpalProvider {
    fn is_available(&self) -> bool {
        self.device().is_some()
    }

    fn open_stream(
        &self,
        token: AuthorizationToken,
        request: &StreamRequest,
    ) -> Result<Box<dyn AudioInputStream>, CaptureError> {
        let grant: DesktopGrant = token.into_grant()?;
        let device = self
            .device()
            .ok_or_else(|| CaptureError::DeviceUnavailable("no default audio device".into()))?;
        let name = device.name().unwrap_or_else(|_| "unknown device".into());

        let config = cpal::StreamConfig {
            channels: request.format.channel_count,
            sample_rate: cpal::SampleRate(request.format.sample_rate_hz),
            buffer_size: cpal::BufferSize::Default,
        };

        let (sample_tx, sample_rx) = crossbeam_channel::bounded::<Vec<i16>>(CHANNEL_BLOCKS);
        let (error_tx, error_rx) = crossbeam_channel::bounded::<String>(1);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), CaptureError>>(1);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let dropped = Arc::new(AtomicU64::new(0));
        let dropped_in_callback = Arc::clone(&dropped);

        let thread = thread::Builder::new()
            .name("cpal-input".into())
            .spawn(move || {
                let stream = device.build_input_stream(
                    &config,
                    move |data: &[i16], _info: &cpal::InputCallbackInfo| {
                        forward_samples(&sample_tx, data, &dropped_in_callback);
                    },
                    move |err| {
                        log::error!("cpal stream error: {}", err);
                        let _ = error_tx.try_send(err.to_string());
                    },
                    None,
                );
                let stream = match stream.map_err(|e| CaptureError::DeviceUnavailable(e.to_string())) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(CaptureError::DeviceUnavailable(e.to_string())));
                    return;
                }
                let _ = ready_tx.send(Ok(()));
                // Keep the stream alive until stop or until the reader is dropped.
                let _ = stop_rx.recv();
                drop(stream);
            })
            .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to spawn cpal thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(CaptureError::DeviceUnavailable("cpal thread exited during setup".into()));
            }
        }

        log::info!("Capturing from {} ({:?})", name, request.format);
        Ok(Box::new(CpalStream {
            samples: sample_rx,
            errors: error_rx,
            pending: VecDeque::new(),
            wait: request.block_duration().max(Duration::from_millis(10)),
            stop_tx: Some(stop_tx),
            thread: Some(thread),
            dropped,
            _grant: grant,
        }))
    }

    fn device_info(&self) -> AudioSource {
        let name = self
            .device()
            .and_then(|d| d.name().ok())
            .unwrap_or_else(|| "unavailable".into());
        AudioSource {
            id: if self.loopback { "cpal-loopback".into() } else { "cpal-input".into() },
            name,
            is_default: true,
        }
    }
}

/// Device callback: hand a copy to the capture loop, never block.
fn forward_samples(tx: &Sender<Vec<i16>>, data: &[i16], dropped: &AtomicU64) {
    if data.is_empty() {
        return;
    }
    match tx.try_send(data.to_vec()) {
        Ok(()) | Err(TrySendError::Disconnected(_)) => {}
        Err(TrySendError::Full(block)) => {
            dropped.fetch_add(block.len() as u64, Ordering::Relaxed);
        }
    }
}

struct CpalStream {
    samples: Receiver<Vec<i16>>,
    errors: Receiver<String>,
    pending: VecDeque<i16>,
    wait: Duration,
    stop_tx: Option<Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
    dropped: Arc<AtomicU64>,
    _grant: DesktopGrant,
}

impl AudioInputStream for CpalStream {
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, CaptureError> {
        if let Ok(message) = self.errors.try_recv() {
            return Err(CaptureError::CaptureStreamError(message));
        }

        if self.pending.is_empty() {
            match self.samples.recv_timeout(self.wait) {
                Ok(block) => self.pending.extend(block),
                Err(RecvTimeoutError::Timeout) => return Ok(0),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(CaptureError::CaptureStreamError("cpal stream closed".into()))
                }
            }
        }
        // Top up with whatever else is already queued.
        while self.pending.len() < buf.len() {
            match self.samples.try_recv() {
                Ok(block) => self.pending.extend(block),
                Err(_) => break,
            }
        }

        let n = self.pending.len().min(buf.len());
        for (slot, sample) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = sample;
        }
        Ok(n)
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|_| CaptureError::CaptureStreamError("cpal thread panicked".into()))?;
        }
        let dropped = self.dropped.load(Ordering::Relaxed);
        if dropped > 0 {
            log::warn!("Dropped {} samples: capture loop fell behind the device", dropped);
        }
        Ok(())
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        if self.stop_tx.is_some() || self.thread.is_some() {
            let _ = self.stop();
        }
    }
}
