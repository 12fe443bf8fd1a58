//! Per-session debug log.
//!
//! Each run starts a fresh log file, stamps a header, and appends timestamped
//! lines until the session's write budget is spent. Recorder stderr is the
//! one source that can spam, so once the budget runs out the log goes quiet
//! instead of growing; the next session truncates and starts over.

use crate::config::AppConfig;
use std::fs::File;
use std::io::Write;
use std::panic;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

/// Upper bound on one session's log output.
const LOG_BUDGET_BYTES: u64 = 2 * 1024 * 1024;

static LOG: OnceLock<Mutex<DebugLog>> = OnceLock::new();

/// Path of the current session's log file.
pub fn log_file_path() -> PathBuf {
    std::env::temp_dir().join("micpipe.log")
}

#[derive(Default)]
struct DebugLog {
    file: Option<File>,
    remaining: u64,
}

impl DebugLog {
    fn open_session() -> Self {
        match File::create(log_file_path()) {
            Ok(file) => Self {
                file: Some(file),
                remaining: LOG_BUDGET_BYTES,
            },
            Err(_) => Self::default(),
        }
    }

    fn append(&mut self, line: &str) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        if line.len() as u64 > self.remaining {
            let _ = file.write_all(b"[log budget exhausted, further lines dropped]\n");
            self.file = None;
            return;
        }
        if file.write_all(line.as_bytes()).is_ok() {
            self.remaining -= line.len() as u64;
        }
    }
}

fn log_cell() -> &'static Mutex<DebugLog> {
    LOG.get_or_init(|| Mutex::new(DebugLog::default()))
}

/// Start a fresh session log when enabled; otherwise logging is a no-op.
pub fn init_logging(config: &AppConfig) {
    let enabled = (config.logs || config.debug) && !config.no_logs;
    {
        let mut log = log_cell().lock().unwrap_or_else(|e| e.into_inner());
        *log = if enabled {
            DebugLog::open_session()
        } else {
            DebugLog::default()
        };
    }
    if enabled {
        log_debug(&format!(
            "micpipe v{} capture session",
            env!("CARGO_PKG_VERSION")
        ));
    }
}

/// Append a timestamped line to the session log.
pub fn log_debug(msg: &str) {
    let mut log = log_cell().lock().unwrap_or_else(|e| e.into_inner());
    if log.file.is_none() {
        return;
    }
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    log.append(&format!("[{timestamp}] {msg}\n"));
}

/// Record a panic in the session log before the process dies.
pub fn log_panic(info: &panic::PanicHookInfo<'_>) {
    let location = info
        .location()
        .map(|loc| format!("{}:{}", loc.file(), loc.line()))
        .unwrap_or_else(|| "unknown".to_string());
    let payload = if let Some(text) = info.payload().downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = info.payload().downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    };
    log_debug(&format!("panic at {location}: {payload}"));
}

#[cfg(test)]
pub(crate) fn set_logging_for_tests(enabled: bool) {
    let mut log = log_cell().lock().unwrap_or_else(|e| e.into_inner());
    *log = if enabled {
        DebugLog::open_session()
    } else {
        DebugLog::default()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_path_lives_in_temp_dir() {
        assert!(log_file_path().ends_with("micpipe.log"));
    }

    #[test]
    fn disabled_logging_drops_lines() {
        set_logging_for_tests(false);
        // Must stay a no-op with no file handle open.
        log_debug("never written");
    }

    #[test]
    fn exhausted_budget_disables_the_log() {
        let path = std::env::temp_dir().join("micpipe_logging_budget_test.log");
        let file = File::create(&path).expect("test log file");
        let mut log = DebugLog {
            file: Some(file),
            remaining: 10,
        };
        log.append("short\n");
        assert!(log.file.is_some());
        log.append("a line well past the remaining budget\n");
        assert!(log.file.is_none());
        let _ = std::fs::remove_file(&path);
    }
}
