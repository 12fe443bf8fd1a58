//! Recorder profiles and argument derivation.
//!
//! Three profiles cover the supported hosts: SoX's `sox` on Windows, its
//! `rec` front-end on macOS, and ALSA's `arecord` everywhere else. All three
//! stream raw PCM to stdout, which is the only contract the pump relies on.

use crate::config::CaptureConfig;
use clap::ValueEnum;
use serde::Serialize;

/// Which recorder profile to launch. Injected at session construction so
/// tests and cross-profile inspection never depend on the real host.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    Windows,
    Macos,
    Other,
}

impl Platform {
    /// Profile matching the machine this process runs on.
    pub fn host() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Macos
        } else {
            Platform::Other
        }
    }
}

/// A fully derived recorder invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecorderCommand {
    pub program: String,
    pub args: Vec<String>,
}

/// Derive the recorder command line for a profile.
pub fn recorder_command(config: &CaptureConfig, platform: Platform) -> RecorderCommand {
    match platform {
        Platform::Windows => RecorderCommand {
            program: "sox".to_string(),
            args: vec![
                "-b".to_string(),
                config.bitwidth.to_string(),
                "--endian".to_string(),
                config.endian.as_arg().to_string(),
                "-c".to_string(),
                config.channels.to_string(),
                "-r".to_string(),
                config.rate.to_string(),
                "-e".to_string(),
                config.encoding.as_arg().to_string(),
                "-t".to_string(),
                "waveaudio".to_string(),
                "default".to_string(),
                "-p".to_string(),
            ],
        },
        Platform::Macos => RecorderCommand {
            program: "rec".to_string(),
            args: vec![
                "-b".to_string(),
                config.bitwidth.to_string(),
                "--endian".to_string(),
                config.endian.as_arg().to_string(),
                "-c".to_string(),
                config.channels.to_string(),
                "-r".to_string(),
                config.rate.to_string(),
                "-e".to_string(),
                config.encoding.as_arg().to_string(),
                "-t".to_string(),
                config.file_type.clone(),
                "-".to_string(),
            ],
        },
        Platform::Other => RecorderCommand {
            program: "arecord".to_string(),
            args: vec![
                "-c".to_string(),
                config.channels.to_string(),
                "-r".to_string(),
                config.rate.to_string(),
                "-f".to_string(),
                alsa_format(config),
                "-D".to_string(),
                config.device.clone(),
            ],
        },
    }
}

/// ALSA format code, e.g. `S16_LE` for signed 16-bit little-endian.
pub(crate) fn alsa_format(config: &CaptureConfig) -> String {
    format!(
        "{}{}_{}",
        config.encoding.code(),
        config.bitwidth,
        config.endian.code()
    )
}
