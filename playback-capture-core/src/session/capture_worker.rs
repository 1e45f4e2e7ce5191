use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use crate::models::audio_models::{CaptureDiagnostics, StreamFormat};
use crate::models::error::CaptureError;
use crate::models::recording_result::{CaptureMetadata, CaptureReport, Termination};
use crate::storage::metadata;
use crate::storage::pcm_writer::{self, PcmFileWriter};
use crate::traits::capture_provider::AudioInputStream;

/// The read-convert-write loop of one capture session.
///
/// Owns the input stream and the output file for the whole session; the
/// controller only reaches it through the stop flag.
/// ```text
/// [AudioInputStream] → [SampleBlock i16 × block_size] → [s16le bytes] → [PcmFileWriter]
/// ```
pub(crate) struct CaptureWorker {
    pub session_id: Uuid,
    pub stream: Box<dyn AudioInputStream>,
    pub writer: PcmFileWriter,
    pub format: StreamFormat,
    pub block_size: usize,
    pub stop_requested: Arc<AtomicBool>,
    pub write_metadata: bool,
}

impl CaptureWorker {
    /// Run until the stop flag is raised or the stream/file fails, then
    /// release the stream, close the file and describe the result.
    pub fn run(self) -> CaptureReport {
        let Self {
            session_id,
            mut stream,
            mut writer,
            format,
            block_size,
            stop_requested,
            write_metadata,
        } = self;

        let file_path = writer.file_path().to_path_buf();
        let mut block = vec![0i16; block_size];
        let mut diagnostics = CaptureDiagnostics::default();
        let mut termination = Termination::StopRequested;

        log::info!("Capture {} writing to {}", session_id, file_path.display());

        while !stop_requested.load(Ordering::Acquire) {
            let read = match stream.read(&mut block) {
                Ok(n) => n.min(block.len()),
                Err(e) => {
                    let e = match e {
                        CaptureError::CaptureStreamError(_) => e,
                        other => CaptureError::CaptureStreamError(other.to_string()),
                    };
                    log::error!("Capture {} read failed: {}", session_id, e);
                    termination = Termination::StreamFailed(e);
                    break;
                }
            };
            diagnostics.reads += 1;

            // Nothing buffered yet; the blocking read paces the loop.
            if read == 0 {
                diagnostics.empty_reads += 1;
                continue;
            }
            if read < block.len() {
                diagnostics.short_reads += 1;
            }

            if let Err(e) = writer.write_samples(&block[..read]) {
                log::error!("Capture {} write failed: {}", session_id, e);
                termination = Termination::OutputFailed(e);
                break;
            }
        }

        if let Err(e) = stream.stop() {
            log::warn!("Capture {} failed to stop input stream: {}", session_id, e);
        }
        drop(stream);

        diagnostics.samples_written = writer.samples_written();
        diagnostics.bytes_written = writer.bytes_written();

        let file_size = match writer.finish() {
            Ok(summary) => {
                log::info!(
                    "Audio capture finished for {}. File size is {} bytes.",
                    summary.file_path.display(),
                    summary.file_size
                );
                summary.file_size
            }
            Err(e) => {
                log::error!("Capture {} failed to close output: {}", session_id, e);
                if termination == Termination::StopRequested {
                    termination = Termination::OutputFailed(e);
                }
                fs::metadata(&file_path).map(|m| m.len()).unwrap_or(0)
            }
        };

        // After an output failure only what reached the file counts.
        let bytes_written = match termination {
            Termination::OutputFailed(_) => file_size,
            _ => diagnostics.bytes_written,
        };
        let samples_on_record = match termination {
            Termination::OutputFailed(_) => file_size / format.bytes_per_sample().max(1) as u64,
            _ => diagnostics.samples_written,
        };

        let checksum = pcm_writer::sha256_file(&file_path).unwrap_or_else(|e| {
            log::warn!("Capture {} checksum unavailable: {}", session_id, e);
            String::new()
        });

        let report = CaptureReport {
            session_id,
            file_path,
            format,
            bytes_written,
            duration: format.duration_of(samples_on_record),
            checksum,
            termination,
            diagnostics,
        };

        if write_metadata {
            if let Err(e) = metadata::write_metadata(&CaptureMetadata::from_report(&report), &report.file_path) {
                log::warn!("Capture {} metadata sidecar not written: {}", session_id, e);
            }
        }

        report
    }
}
