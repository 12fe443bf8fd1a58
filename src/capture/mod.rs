//! Recorder subprocess management.
//!
//! Builds the platform-specific recorder command line, spawns and signals the
//! child, and pumps its stdout through the silence detector into the chunk
//! channel. The detector knows nothing about the subprocess; this module is
//! the only place that does.

mod command;
mod process;
mod pump;
#[cfg(test)]
mod tests;

pub use command::{recorder_command, Platform, RecorderCommand};
pub use process::{ProcessController, Recorder, SignalController};
