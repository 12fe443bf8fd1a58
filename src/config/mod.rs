//! Capture configuration and command-line parsing.

mod defaults;

use crate::capture::Platform;
use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

use defaults::FORBIDDEN_DEVICE_CHARS;
pub use defaults::{
    DEFAULT_BITWIDTH, DEFAULT_CHANNELS, DEFAULT_CHANNEL_CAPACITY, DEFAULT_DEVICE,
    DEFAULT_EXIT_ON_SILENCE, DEFAULT_FILE_TYPE, DEFAULT_RATE,
};

/// Byte order used both for sample decoding and for recorder arguments.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// Value passed to the recorder's `--endian` flag.
    pub fn as_arg(self) -> &'static str {
        match self {
            Endian::Little => "little",
            Endian::Big => "big",
        }
    }

    /// Suffix of the ALSA format code (`S16_LE` and friends).
    pub(crate) fn code(self) -> &'static str {
        match self {
            Endian::Little => "LE",
            Endian::Big => "BE",
        }
    }
}

/// Sample signedness advertised to the recorder.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SampleEncoding {
    SignedInteger,
    UnsignedInteger,
}

impl SampleEncoding {
    /// Value passed to the recorder's `-e` flag.
    pub fn as_arg(self) -> &'static str {
        match self {
            SampleEncoding::SignedInteger => "signed-integer",
            SampleEncoding::UnsignedInteger => "unsigned-integer",
        }
    }

    /// Prefix of the ALSA format code.
    pub(crate) fn code(self) -> &'static str {
        match self {
            SampleEncoding::SignedInteger => "S",
            SampleEncoding::UnsignedInteger => "U",
        }
    }
}

/// Settings for one capture session. Frozen once the session is constructed;
/// only the silence-exit threshold can be retargeted afterwards, through
/// [`crate::Microphone::set_exit_on_silence`].
///
/// Missing fields are defaulted, never rejected. Nonsensical combinations are
/// left for the recorder subprocess to refuse at spawn time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureConfig {
    pub endian: Endian,
    pub bitwidth: u32,
    pub encoding: SampleEncoding,
    pub rate: u32,
    pub channels: u32,
    pub device: String,
    /// Consecutive silent chunks before a silence event fires; 0 disables
    /// detection entirely.
    pub exit_on_silence: u32,
    /// Container hint for the macOS recorder.
    pub file_type: String,
    /// Bounded capacity of the chunk channel between the pump and consumers.
    pub channel_capacity: usize,
    /// Capture recorder stderr and write verbose debug logs.
    pub debug: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            endian: Endian::Little,
            bitwidth: DEFAULT_BITWIDTH,
            encoding: SampleEncoding::SignedInteger,
            rate: DEFAULT_RATE,
            channels: DEFAULT_CHANNELS,
            device: DEFAULT_DEVICE.to_string(),
            exit_on_silence: DEFAULT_EXIT_ON_SILENCE,
            file_type: DEFAULT_FILE_TYPE.to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            debug: false,
        }
    }
}

/// CLI options for the `micpipe` binary.
#[derive(Debug, Parser, Clone)]
#[command(
    about = "Record microphone audio through a native recorder subprocess",
    author,
    version
)]
pub struct AppConfig {
    /// Output path for captured PCM ("-" writes to stdout)
    #[arg(long, short = 'o', default_value = "-")]
    pub output: PathBuf,

    /// Sample byte order
    #[arg(long, value_enum, default_value_t = Endian::Little)]
    pub endian: Endian,

    /// Bits per sample
    #[arg(long, default_value_t = DEFAULT_BITWIDTH)]
    pub bitwidth: u32,

    /// Sample encoding
    #[arg(long, value_enum, default_value_t = SampleEncoding::SignedInteger)]
    pub encoding: SampleEncoding,

    /// Sample rate (Hz)
    #[arg(long, default_value_t = DEFAULT_RATE)]
    pub rate: u32,

    /// Channel count
    #[arg(long, default_value_t = DEFAULT_CHANNELS)]
    pub channels: u32,

    /// ALSA capture device id (Linux recorder only)
    #[arg(long, default_value = DEFAULT_DEVICE)]
    pub device: String,

    /// Stop after this many consecutive silent chunks (0 disables detection)
    #[arg(long = "exit-on-silence", default_value_t = DEFAULT_EXIT_ON_SILENCE)]
    pub exit_on_silence: u32,

    /// Container hint passed to the macOS recorder
    #[arg(long = "file-type", default_value = DEFAULT_FILE_TYPE)]
    pub file_type: String,

    /// Chunk channel capacity between the pump and the consumer
    #[arg(long = "channel-capacity", default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,

    /// Recorder profile override (defaults to the host platform)
    #[arg(long, value_enum)]
    pub platform: Option<Platform>,

    /// Capture recorder stderr diagnostics and enable verbose debug logging
    #[arg(long, env = "MICPIPE_DEBUG", default_value_t = false)]
    pub debug: bool,

    /// Enable file logging
    #[arg(long, env = "MICPIPE_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and --debug)
    #[arg(long = "no-logs", env = "MICPIPE_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Print the derived configuration and recorder command as JSON, then exit
    #[arg(long = "print-config", default_value_t = false)]
    pub print_config: bool,
}

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Light argument sanity. The capture config itself is never validated;
    /// a recorder that dislikes the combination refuses to spawn instead.
    pub fn validate(&self) -> Result<()> {
        if self.device.len() > 256
            || self
                .device
                .chars()
                .any(|ch| ch.is_control() || FORBIDDEN_DEVICE_CHARS.contains(&ch))
        {
            bail!("--device must be <=256 characters with no control or shell metacharacters");
        }
        if self.channel_capacity == 0 {
            bail!("--channel-capacity must be at least 1");
        }
        Ok(())
    }

    /// Snapshot the CLI flags into the library-level capture config.
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            endian: self.endian,
            bitwidth: self.bitwidth,
            encoding: self.encoding,
            rate: self.rate,
            channels: self.channels,
            device: self.device.clone(),
            exit_on_silence: self.exit_on_silence,
            file_type: self.file_type.clone(),
            channel_capacity: self.channel_capacity,
            debug: self.debug,
        }
    }
}
