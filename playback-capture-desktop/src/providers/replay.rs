//! Replays a raw s16le PCM file as if it were live playback.
//!
//! Useful for exercising the capture pipeline without audio hardware and
//! for re-recording an earlier capture. Reads are paced to the stream's
//! sample rate unless pacing is disabled.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use playback_capture_core::processing::pcm_format::BYTES_PER_SAMPLE;
use playback_capture_core::{
    AudioInputStream, AudioSource, AuthorizationToken, CaptureError, CaptureProvider, StreamFormat, StreamRequest,
};

use crate::consent::DesktopGrant;

/// Capture provider backed by a PCM file on disk.
pub struct ReplayProvider {
    path: PathBuf,
    paced: bool,
    looping: bool,
}

impl ReplayProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            paced: true,
            looping: false,
        }
    }

    /// Deliver samples as fast as they can be read.
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    /// Start over at the beginning of the file when it runs out.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }
}

impl CaptureProvider for ReplayProvider {
    fn is_available(&self) -> bool {
        self.path.is_file()
    }

    fn open_stream(
        &self,
        token: AuthorizationToken,
        request: &StreamRequest,
    ) -> Result<Box<dyn AudioInputStream>, CaptureError> {
        let grant: DesktopGrant = token.into_grant()?;
        if request.format.bits_per_sample != 16 {
            return Err(CaptureError::DeviceUnavailable(format!(
                "replay only supports 16-bit PCM, {} requested",
                request.format.bits_per_sample
            )));
        }
        let file = File::open(&self.path).map_err(|e| {
            CaptureError::DeviceUnavailable(format!("cannot open {}: {}", self.path.display(), e))
        })?;
        log::info!("Replaying {} as {:?}", self.path.display(), request.format);

        Ok(Box::new(ReplayStream {
            reader: BufReader::new(file),
            format: request.format,
            idle: request.block_duration(),
            paced: self.paced,
            looping: self.looping,
            next_due: Instant::now(),
            bytes: Vec::new(),
            _grant: grant,
        }))
    }

    fn device_info(&self) -> AudioSource {
        AudioSource {
            id: format!("replay:{}", self.path.display()),
            name: format!("Replay of {}", self.path.display()),
            is_default: false,
        }
    }
}

struct ReplayStream {
    reader: BufReader<File>,
    format: StreamFormat,
    idle: Duration,
    paced: bool,
    looping: bool,
    next_due: Instant,
    bytes: Vec<u8>,
    _grant: DesktopGrant,
}

impl ReplayStream {
    /// Read as many whole samples as fit in `max_bytes`, stopping at EOF.
    fn fill(&mut self, max_bytes: usize) -> Result<usize, CaptureError> {
        self.bytes.resize(max_bytes, 0);
        let mut filled = 0;
        while filled < max_bytes {
            match self.reader.read(&mut self.bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(CaptureError::CaptureStreamError(format!("replay read failed: {}", e))),
            }
        }
        Ok(filled - filled % BYTES_PER_SAMPLE)
    }

    fn pace(&mut self, samples: usize) {
        if !self.paced {
            return;
        }
        let now = Instant::now();
        if self.next_due > now {
            thread::sleep(self.next_due - now);
        }
        self.next_due = self.next_due.max(now) + self.format.duration_of(samples as u64);
    }
}

impl AudioInputStream for ReplayStream {
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, CaptureError> {
        let mut usable = self.fill(buf.len() * BYTES_PER_SAMPLE)?;
        if usable == 0 && self.looping {
            self.reader
                .seek(SeekFrom::Start(0))
                .map_err(|e| CaptureError::CaptureStreamError(format!("replay rewind failed: {}", e)))?;
            usable = self.fill(buf.len() * BYTES_PER_SAMPLE)?;
        }

        if usable == 0 {
            // Out of data: behave like silent playback and wait a block.
            thread::sleep(self.idle);
            return Ok(0);
        }

        let samples = usable / BYTES_PER_SAMPLE;
        for (slot, pair) in buf.iter_mut().zip(self.bytes[..usable].chunks_exact(BYTES_PER_SAMPLE)) {
            *slot = i16::from_le_bytes([pair[0], pair[1]]);
        }
        self.pace(samples);
        Ok(samples)
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        log::debug!("Replay stream stopped");
        Ok(())
    }
}
