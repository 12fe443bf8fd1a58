//! Structured session telemetry.
//!
//! Owns the per-session counters the CLI reports and the JSON trace sink the
//! lifecycle events land in. The plain debug log stays human-oriented; this
//! file is the machine-readable side.

use crate::config::AppConfig;
use crate::log_debug;
use serde::Serialize;
use std::env;
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Counters for one capture session. The consumer bumps them as chunks and
/// events arrive; [`finish`] seals the session and emits the summary both as
/// a structured trace event and as a `capture_metrics|...` debug-log line.
///
/// [`finish`]: SessionMetrics::finish
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SessionMetrics {
    pub chunks: usize,
    pub bytes: u64,
    pub silence_events: u32,
    pub exit_reason: String,
}

impl SessionMetrics {
    pub fn record_chunk(&mut self, len: usize) {
        self.chunks += 1;
        self.bytes += len as u64;
    }

    pub fn record_silence(&mut self) {
        self.silence_events += 1;
    }

    /// Seal the session with its exit reason and emit the summary.
    pub fn finish(&mut self, reason: &str) {
        self.exit_reason = reason.to_string();
        log_debug(&format!(
            "capture_metrics|chunks={}|bytes={}|silence_events={}|exit_reason={}",
            self.chunks, self.bytes, self.silence_events, self.exit_reason
        ));
        tracing::info!(
            chunks = self.chunks,
            bytes = self.bytes,
            silence_events = self.silence_events,
            reason,
            "capture session finished"
        );
    }
}

pub fn telemetry_log_path() -> PathBuf {
    env::temp_dir().join("micpipe_trace.jsonl")
}

/// Install the JSON trace sink. Filtering follows `RUST_LOG` when set and
/// defaults to this crate at debug level. Calling again after a successful
/// install is a no-op.
pub fn init_telemetry(config: &AppConfig) {
    let enabled = (config.logs || config.debug) && !config.no_logs;
    if !enabled {
        return;
    }

    let path = telemetry_log_path();
    let file = match File::options().create(true).append(true).open(&path) {
        Ok(file) => file,
        Err(_) => return,
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("micpipe=debug"));
    let trace_layer = tracing_subscriber::fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .json()
        .with_filter(filter);

    if tracing_subscriber::registry()
        .with(trace_layer)
        .try_init()
        .is_ok()
    {
        tracing::info!(path = ?path, "telemetry initialized");
    }
}
