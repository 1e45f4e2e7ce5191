use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};

use playback_capture_core::{CaptureConfiguration, CaptureProvider, CollisionPolicy, PlaybackUsage};

use crate::providers::ReplayProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Replay a raw s16le PCM file.
    Replay,
    /// Default output device in loopback mode (needs the `cpal` feature).
    Loopback,
    /// Default input device (needs the `cpal` feature).
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UsageArg {
    Media,
    Game,
    Unknown,
}

impl From<UsageArg> for PlaybackUsage {
    fn from(value: UsageArg) -> Self {
        match value {
            UsageArg::Media => PlaybackUsage::Media,
            UsageArg::Game => PlaybackUsage::Game,
            UsageArg::Unknown => PlaybackUsage::Unknown,
        }
    }
}

/// Capture audio played on this device into raw PCM files.
#[derive(Debug, Parser)]
#[command(name = "playback-capture", version)]
pub struct CliArgs {
    /// Base directory; captures go to <DIR>/AudioCaptures.
    #[arg(long, env = "PLAYBACK_CAPTURE_DIR")]
    pub output_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = SourceKind::Replay)]
    pub source: SourceKind,

    /// PCM file to replay when --source=replay.
    #[arg(long)]
    pub replay_file: Option<PathBuf>,

    /// Restart the replay file when it ends.
    #[arg(long)]
    pub loop_replay: bool,

    #[arg(long, default_value_t = 8000)]
    pub sample_rate: u32,

    #[arg(long, default_value_t = 1)]
    pub channels: u16,

    /// Samples per blocking read.
    #[arg(long, default_value_t = 1024)]
    pub block_size: usize,

    /// Playback usages to capture (repeatable).
    #[arg(long = "usage", value_enum, default_values_t = [UsageArg::Media])]
    pub usages: Vec<UsageArg>,

    /// Stop automatically after this many seconds instead of waiting for Enter.
    #[arg(long)]
    pub duration: Option<f64>,

    #[arg(long, default_value_t = 3000)]
    pub shutdown_timeout_ms: u64,

    /// Refuse to start if the timestamped file name is taken.
    #[arg(long)]
    pub fail_on_collision: bool,

    /// Do not write the .metadata.json sidecar.
    #[arg(long)]
    pub no_metadata: bool,

    /// Grant capture consent without prompting.
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl CliArgs {
    pub fn output_directory(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            dirs_next::data_local_dir()
                .map(|d| d.join("playback-capture"))
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }

    pub fn capture_configuration(&self) -> CaptureConfiguration {
        CaptureConfiguration {
            sample_rate_hz: self.sample_rate,
            channel_count: self.channels,
            block_size: self.block_size,
            output_directory: self.output_directory(),
            shutdown_timeout: Duration::from_millis(self.shutdown_timeout_ms),
            collision_policy: if self.fail_on_collision {
                CollisionPolicy::Fail
            } else {
                CollisionPolicy::AppendSuffix
            },
            usages: self.usages.iter().copied().map(PlaybackUsage::from).collect(),
            write_metadata: !self.no_metadata,
            ..Default::default()
        }
    }

    pub fn stop_after(&self) -> Option<Duration> {
        self.duration.filter(|d| *d > 0.0).map(Duration::from_secs_f64)
    }

    pub fn build_provider(&self) -> anyhow::Result<Box<dyn CaptureProvider>> {
        match self.source {
            SourceKind::Replay => {
                let path = self.replay_file.clone().context("--replay-file is required for replay")?;
                Ok(Box::new(ReplayProvider::new(path).looping(self.loop_replay)))
            }
            #[cfg(feature = "cpal")]
            SourceKind::Loopback => Ok(Box::new(crate::providers::CpalProvider::loopback())),
            #[cfg(feature = "cpal")]
            SourceKind::Input => Ok(Box::new(crate::providers::CpalProvider::default_input())),
            #[cfg(not(feature = "cpal"))]
            SourceKind::Loopback | SourceKind::Input => {
                anyhow::bail!("{:?} capture needs a build with the `cpal` feature", self.source)
            }
        }
    }
}
