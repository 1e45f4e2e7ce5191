use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::error::CaptureError;
use crate::processing::pcm_format;

const DEFAULT_BUFFER_BYTES: usize = 8 * 1024;

/// Destination of the encoded bytes. `File` in production.
pub(crate) trait OutputSink: Write + Send {
    /// Push written bytes to durable storage.
    fn sync(&self) -> io::Result<()>;
}

impl OutputSink for File {
    fn sync(&self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Append-only writer for headerless 16-bit little-endian PCM.
///
/// The file is created with exclusive-create semantics, so an existing
/// capture is never truncated. `finish` consumes the writer, which makes
/// "closed exactly once" a property of the type rather than a runtime flag.
///
/// ## File Format
/// ```text
/// [s0 lo][s0 hi][s1 lo][s1 hi] ...
/// ```
pub struct PcmFileWriter {
    file_path: PathBuf,
    file: BufWriter<Box<dyn OutputSink>>,
    scratch: Vec<u8>,
    bytes_written: u64,
    samples_written: u64,
}

/// What `PcmFileWriter::finish` leaves behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmFileSummary {
    pub file_path: PathBuf,
    pub bytes_written: u64,
    /// Size reported by the file system after close.
    pub file_size: u64,
}

impl PcmFileWriter {
    /// Create `file_path` for writing. Fails if the file already exists.
    pub fn create(file_path: PathBuf) -> Result<Self, CaptureError> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&file_path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => CaptureError::PathCollision(file_path.clone()),
                _ => CaptureError::OutputUnavailable(format!(
                    "failed to create {}: {}",
                    file_path.display(),
                    e
                )),
            })?;

        Ok(Self::with_sink(file_path, Box::new(file), DEFAULT_BUFFER_BYTES))
    }

    /// Writer over an already opened sink; `file_path` is where its bytes land.
    pub(crate) fn with_sink(file_path: PathBuf, sink: Box<dyn OutputSink>, buffer_bytes: usize) -> Self {
        Self {
            file_path,
            file: BufWriter::with_capacity(buffer_bytes, sink),
            scratch: Vec::new(),
            bytes_written: 0,
            samples_written: 0,
        }
    }

    /// Append `samples`, exactly two bytes per sample.
    pub fn write_samples(&mut self, samples: &[i16]) -> Result<(), CaptureError> {
        if samples.is_empty() {
            return Ok(());
        }
        pcm_format::encode_le_into(samples, &mut self.scratch);
        self.file
            .write_all(&self.scratch)
            .map_err(|e| CaptureError::OutputUnavailable(format!("write failed: {}", e)))?;
        self.bytes_written += self.scratch.len() as u64;
        self.samples_written += samples.len() as u64;
        Ok(())
    }

    /// Flush buffered bytes, sync to disk and close the file.
    pub fn finish(mut self) -> Result<PcmFileSummary, CaptureError> {
        self.file
            .flush()
            .map_err(|e| CaptureError::OutputUnavailable(format!("flush failed: {}", e)))?;
        self.file
            .get_ref()
            .sync()
            .map_err(|e| CaptureError::OutputUnavailable(format!("sync failed: {}", e)))?;
        drop(self.file);

        let file_size = fs::metadata(&self.file_path)
            .map(|m| m.len())
            .map_err(|e| CaptureError::OutputUnavailable(format!("failed to stat output: {}", e)))?;

        Ok(PcmFileSummary {
            file_path: self.file_path,
            bytes_written: self.bytes_written,
            file_size,
        })
    }

    /// Bytes accepted so far. Some may still be buffered, and after a
    /// failed `finish` they may never reach the file.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Path of the output file.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

/// Compute SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String, CaptureError> {
    let mut file = File::open(path)
        .map_err(|e| CaptureError::OutputUnavailable(format!("failed to open file for checksum: {}", e)))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .map_err(|e| CaptureError::OutputUnavailable(format!("failed to read file for checksum: {}", e)))?;
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
