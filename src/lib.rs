//! Microphone capture through a native recorder subprocess.
//!
//! Spawns the platform recorder (`arecord`, `rec`, or `sox`), pipes its raw
//! PCM output through an inline silence detector, and exposes a small
//! start/stop/pause/resume surface with typed event notifications.

pub mod audio;
pub mod capture;
pub mod config;
mod logging;
pub mod mic;
mod telemetry;

pub use logging::{init_logging, log_debug, log_file_path, log_panic};
pub use mic::{MicEvent, Microphone};
pub use telemetry::{init_telemetry, telemetry_log_path, SessionMetrics};
