use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::audio_models::{PlaybackUsage, StreamFormat};

/// What to do when the timestamped output name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Append `-1`, `-2`, ... to the file stem until a free name is found.
    #[default]
    AppendSuffix,
    /// Refuse to start with `PathCollision`.
    Fail,
}

/// Configuration for a capture session.
#[derive(Debug, Clone)]
pub struct CaptureConfiguration {
    /// Sample rate in Hz (default: 8000).
    pub sample_rate_hz: u32,

    /// Number of interleaved channels (default: 1). Valid values: 1, 2.
    pub channel_count: u16,

    /// Bit depth of the PCM output. Only 16-bit signed samples are supported.
    pub bits_per_sample: u16,

    /// Samples requested per blocking read (default: 1024).
    pub block_size: usize,

    /// Directory under which `AudioCaptures/` is created.
    pub output_directory: PathBuf,

    /// Upper bound on how long `stop` waits for the capture thread.
    pub shutdown_timeout: Duration,

    /// Behaviour for same-second file name collisions.
    pub collision_policy: CollisionPolicy,

    /// Playback usages the capture is restricted to (default: media only).
    pub usages: Vec<PlaybackUsage>,

    /// Write a `.metadata.json` sidecar describing the raw PCM format.
    pub write_metadata: bool,
}

impl CaptureConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate_hz == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.bits_per_sample != 16 {
            return Err(format!("unsupported bit depth: {}", self.bits_per_sample));
        }
        if ![1, 2].contains(&self.channel_count) {
            return Err(format!("unsupported channel count: {}", self.channel_count));
        }
        if self.block_size == 0 {
            return Err("block size must be positive".into());
        }
        if self.shutdown_timeout.is_zero() {
            return Err("shutdown timeout must be positive".into());
        }
        if self.usages.is_empty() {
            return Err("at least one playback usage must be selected".into());
        }
        Ok(())
    }

    pub fn stream_format(&self) -> StreamFormat {
        StreamFormat {
            sample_rate_hz: self.sample_rate_hz,
            channel_count: self.channel_count,
            bits_per_sample: self.bits_per_sample,
        }
    }

    /// Device-side buffer size: one block of samples.
    pub fn buffer_size_bytes(&self) -> usize {
        self.block_size * self.stream_format().bytes_per_sample()
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            sample_rate_hz: 8000,
            channel_count: 1,
            bits_per_sample: 16,
            block_size: 1024,
            output_directory: PathBuf::from("."),
            shutdown_timeout: Duration::from_secs(3),
            collision_policy: CollisionPolicy::AppendSuffix,
            usages: vec![PlaybackUsage::Media],
            write_metadata: true,
        }
    }
}
