use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Category of playback audio a capture is allowed to pick up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackUsage {
    Media,
    Game,
    Unknown,
}

/// PCM layout of an input stream and of the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFormat {
    pub sample_rate_hz: u32,
    pub channel_count: u16,
    pub bits_per_sample: u16,
}

impl StreamFormat {
    pub fn bytes_per_sample(&self) -> usize {
        usize::from(self.bits_per_sample / 8)
    }

    /// Playback time represented by `samples` interleaved samples.
    pub fn duration_of(&self, samples: u64) -> Duration {
        let frames = samples / u64::from(self.channel_count.max(1));
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate_hz.max(1)))
    }
}

/// Everything a provider needs to open an input stream for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub format: StreamFormat,
    /// Samples the capture loop requests per read.
    pub block_size: usize,
    /// Suggested device buffer size in bytes.
    pub buffer_size_bytes: usize,
    pub usages: Vec<PlaybackUsage>,
}

impl StreamRequest {
    /// Wall-clock time covered by one full block.
    pub fn block_duration(&self) -> Duration {
        self.format.duration_of(self.block_size as u64)
    }
}

/// An audio source a provider can capture from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// Counters collected by the capture loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureDiagnostics {
    pub reads: u64,
    pub empty_reads: u64,
    pub short_reads: u64,
    pub samples_written: u64,
    pub bytes_written: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_accounts_for_channels() {
        let mono = StreamFormat {
            sample_rate_hz: 8000,
            channel_count: 1,
            bits_per_sample: 16,
        };
        assert_eq!(mono.duration_of(8000), Duration::from_secs(1));

        let stereo = StreamFormat {
            channel_count: 2,
            ..mono
        };
        assert_eq!(stereo.duration_of(8000), Duration::from_millis(500));
    }

    #[test]
    fn block_duration_for_default_block() {
        let request = StreamRequest {
            format: StreamFormat {
                sample_rate_hz: 8000,
                channel_count: 1,
                bits_per_sample: 16,
            },
            block_size: 1024,
            buffer_size_bytes: 2048,
            usages: vec![PlaybackUsage::Media],
        };
        assert_eq!(request.block_duration(), Duration::from_millis(128));
    }
}
