//! Recorder subprocess lifecycle: spawn, signal control, and teardown.

use super::command::{recorder_command, Platform, RecorderCommand};
use super::pump::spawn_pump_thread;
use crate::audio::SilenceDetector;
use crate::config::CaptureConfig;
use crate::log_debug;
use crate::mic::MicEvent;
use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::{Sender, TrySendError};
use std::io::{self, BufRead, BufReader};
use std::process::{ChildStderr, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// How long a stopped recorder may ignore SIGTERM before SIGKILL.
const STOP_GRACE: Duration = Duration::from_millis(500);

/// Capability for suspending, resuming, and terminating the recorder, so
/// lifecycle code never hard-codes signal numbers.
pub trait ProcessController {
    fn suspend(&self) -> Result<()>;
    fn resume(&self) -> Result<()>;
    fn terminate(&self) -> Result<()>;
}

/// Unix adapter translating controller calls into process signals.
pub struct SignalController {
    pid: i32,
}

impl SignalController {
    pub fn new(pid: i32) -> Self {
        Self { pid }
    }

    fn signal(&self, signal: libc::c_int, label: &str) -> Result<()> {
        // SAFETY: kill only delivers a signal to the pid owned by this session.
        let ret = unsafe { libc::kill(self.pid, signal) };
        if ret != 0 {
            return Err(anyhow!(
                "{label} to recorder {} failed: {}",
                self.pid,
                io::Error::last_os_error()
            ));
        }
        Ok(())
    }
}

impl ProcessController for SignalController {
    fn suspend(&self) -> Result<()> {
        self.signal(libc::SIGSTOP, "SIGSTOP")
    }

    fn resume(&self) -> Result<()> {
        self.signal(libc::SIGCONT, "SIGCONT")
    }

    fn terminate(&self) -> Result<()> {
        self.signal(libc::SIGTERM, "SIGTERM")
    }
}

/// State shared between the manager and the pump thread. `pid == -1` means no
/// session is running; it is the single source of truth for liveness.
pub(super) struct RecorderShared {
    pub(super) pid: AtomicI32,
    pub(super) paused: AtomicBool,
    pub(super) stopping: AtomicBool,
}

/// Owns the recorder subprocess and its pump thread.
///
/// The pump thread owns the `Child` handle and is the only reaper; the
/// manager keeps the pid for signaling. Lifecycle completions and failures
/// are reported over the event channel handed in at construction.
pub struct Recorder {
    config: CaptureConfig,
    platform: Platform,
    event_tx: Sender<MicEvent>,
    shared: Arc<RecorderShared>,
    pump: Option<thread::JoinHandle<()>>,
    stderr_thread: Option<thread::JoinHandle<()>>,
    #[cfg(test)]
    command_override: Option<RecorderCommand>,
}

impl Recorder {
    pub fn new(config: CaptureConfig, platform: Platform, event_tx: Sender<MicEvent>) -> Self {
        Self {
            config,
            platform,
            event_tx,
            shared: Arc::new(RecorderShared {
                pid: AtomicI32::new(-1),
                paused: AtomicBool::new(false),
                stopping: AtomicBool::new(false),
            }),
            pump: None,
            stderr_thread: None,
            #[cfg(test)]
            command_override: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.pid.load(Ordering::Relaxed) >= 0
    }

    fn command(&self) -> RecorderCommand {
        #[cfg(test)]
        if let Some(command) = &self.command_override {
            return command.clone();
        }
        recorder_command(&self.config, self.platform)
    }

    #[cfg(test)]
    pub(crate) fn set_command_override(&mut self, command: RecorderCommand) {
        self.command_override = Some(command);
    }

    /// Spawn the recorder and wire its stdout into the pump. Fails if a
    /// session is already running or if the recorder binary cannot be
    /// launched; in the latter case no session state is left behind.
    pub fn start(
        &mut self,
        detector: Arc<Mutex<SilenceDetector>>,
        chunk_tx: Sender<Vec<u8>>,
    ) -> Result<()> {
        if self.is_running() {
            bail!("recorder already started; call stop() before starting again");
        }
        self.join_workers();

        let command = self.command();
        log_debug(&format!(
            "spawning recorder: {} {}",
            command.program,
            command.args.join(" ")
        ));

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(if self.config.debug {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .spawn()
            .with_context(|| format!("failed to spawn recorder '{}'", command.program))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("recorder stdout was not piped"))?;
        if let Some(stderr) = child.stderr.take() {
            self.stderr_thread = Some(spawn_stderr_thread(stderr));
        }

        self.shared.stopping.store(false, Ordering::Relaxed);
        self.shared.paused.store(false, Ordering::Relaxed);
        self.shared.pid.store(child.id() as i32, Ordering::Relaxed);

        // Emit before the pump runs so StartComplete always precedes the
        // session's first silence or exit notification.
        send_event(&self.event_tx, MicEvent::StartComplete);
        self.pump = Some(spawn_pump_thread(
            child,
            stdout,
            detector,
            chunk_tx,
            self.event_tx.clone(),
            self.shared.clone(),
        ));
        Ok(())
    }

    /// Terminate the recorder and join the pump. No-op when not running.
    pub fn stop(&mut self) {
        let pid = self.shared.pid.load(Ordering::Relaxed);
        if pid < 0 {
            return;
        }
        self.shared.stopping.store(true, Ordering::Relaxed);
        self.shared.paused.store(false, Ordering::Relaxed);

        let controller = SignalController::new(pid);
        // A suspended child only sees SIGTERM once it is continued.
        if let Err(err) = controller.resume() {
            log_debug(&format!("resume before stop failed: {err:#}"));
        }
        if let Err(err) = controller.terminate() {
            log_debug(&format!("terminate failed: {err:#}"));
        }
        self.shared.pid.store(-1, Ordering::Relaxed);
        self.join_pump(pid);
        send_event(&self.event_tx, MicEvent::StopComplete);
    }

    /// Suspend the recorder and park the pump so no further chunks are read;
    /// pending audio waits in the kernel pipe buffer. No-op when not running.
    pub fn pause(&mut self) {
        let pid = self.shared.pid.load(Ordering::Relaxed);
        if pid < 0 {
            return;
        }
        if let Err(err) = SignalController::new(pid).suspend() {
            log_debug(&format!("suspend failed: {err:#}"));
        }
        self.shared.paused.store(true, Ordering::Relaxed);
        send_event(&self.event_tx, MicEvent::PauseComplete);
    }

    /// Continue the recorder and unpark the pump. No-op when not running.
    pub fn resume(&mut self) {
        let pid = self.shared.pid.load(Ordering::Relaxed);
        if pid < 0 {
            return;
        }
        if let Err(err) = SignalController::new(pid).resume() {
            log_debug(&format!("resume failed: {err:#}"));
        }
        self.shared.paused.store(false, Ordering::Relaxed);
        send_event(&self.event_tx, MicEvent::ResumeComplete);
    }

    /// Wait for the pump to drain and exit, escalating to SIGKILL if the
    /// child ignores SIGTERM past the grace window.
    fn join_pump(&mut self, pid: i32) {
        let Some(handle) = self.pump.take() else {
            return;
        };
        let deadline = Instant::now() + STOP_GRACE;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        if !handle.is_finished() {
            log_debug("recorder ignored SIGTERM, escalating to SIGKILL");
            // SAFETY: pid belonged to this session's child; at worst the
            // signal races a reap and reports ESRCH.
            let ret = unsafe { libc::kill(pid, libc::SIGKILL) };
            if ret != 0 {
                log_debug(&format!(
                    "SIGKILL to recorder failed: {}",
                    io::Error::last_os_error()
                ));
            }
        }
        if handle.join().is_err() {
            log_debug("pump thread panicked");
        }
        if let Some(handle) = self.stderr_thread.take() {
            let _ = handle.join();
        }
    }

    /// Reap worker threads left over from a session that ended on its own.
    fn join_workers(&mut self) {
        if let Some(handle) = self.pump.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.stderr_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Forward an event without ever blocking the emitter. A full channel means
/// the consumer stopped draining; the event is logged and dropped.
pub(super) fn send_event(tx: &Sender<MicEvent>, event: MicEvent) {
    if let Err(err) = tx.try_send(event) {
        match err {
            TrySendError::Full(event) => {
                log_debug(&format!("event channel full, dropping {event:?}"));
            }
            TrySendError::Disconnected(_) => {}
        }
    }
}

/// Drain recorder diagnostics into the debug log, one line at a time.
fn spawn_stderr_thread(stderr: ChildStderr) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let reader = BufReader::new(stderr);
        for line in reader.lines() {
            match line {
                Ok(line) => log_debug(&format!("recorder stderr: {line}")),
                Err(err) => {
                    log_debug(&format!("recorder stderr read failed: {err}"));
                    break;
                }
            }
        }
    })
}
