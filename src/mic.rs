//! Microphone session facade: one recorder subprocess wired through one
//! silence detector, with lifecycle calls on this side and chunks plus typed
//! events on the other.

use crate::audio::SilenceDetector;
use crate::capture::{Platform, Recorder};
use crate::config::CaptureConfig;
use crate::log_debug;
use anyhow::Result;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Notifications emitted by a capture session.
///
/// Lifecycle completions confirm the corresponding call took effect;
/// `Silence` reports a threshold crossing; `ProcessExit` reports a recorder
/// that ended without `stop()` being called; `StreamError` reports an I/O
/// failure on the pipe. Errors arrive here rather than from lifecycle calls,
/// so callers that care must drain [`Microphone::events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MicEvent {
    Silence { consecutive_chunks: u32 },
    StartComplete,
    StopComplete,
    PauseComplete,
    ResumeComplete,
    ProcessExit { code: Option<i32> },
    StreamError { message: String },
}

/// A configured microphone session.
///
/// Construction only wires things up; nothing runs until [`start`] spawns the
/// recorder. The detector and both channels outlive individual subprocesses,
/// so a session can be stopped and started again without re-subscribing.
///
/// [`start`]: Microphone::start
pub struct Microphone {
    config: CaptureConfig,
    detector: Arc<Mutex<SilenceDetector>>,
    threshold: Arc<AtomicU32>,
    recorder: Recorder,
    chunk_tx: Sender<Vec<u8>>,
    chunk_rx: Receiver<Vec<u8>>,
    event_rx: Receiver<MicEvent>,
}

impl Microphone {
    /// Build a session from a config (defaults already applied via
    /// `CaptureConfig::default`) and an explicit recorder profile.
    pub fn new(config: CaptureConfig, platform: Platform) -> Self {
        let threshold = Arc::new(AtomicU32::new(config.exit_on_silence));
        let detector = Arc::new(Mutex::new(SilenceDetector::with_threshold_handle(
            config.endian,
            threshold.clone(),
        )));
        let (chunk_tx, chunk_rx) = bounded(config.channel_capacity.max(1));
        let (event_tx, event_rx) = bounded(EVENT_CHANNEL_CAPACITY);
        let recorder = Recorder::new(config.clone(), platform, event_tx);
        Self {
            config,
            detector,
            threshold,
            recorder,
            chunk_tx,
            chunk_rx,
            event_rx,
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Spawn the recorder for this session. Fails if already running or if
    /// the recorder binary cannot be launched; emits `StartComplete` on
    /// success.
    pub fn start(&mut self) -> Result<()> {
        tracing::info!(
            exit_on_silence = self.threshold.load(Ordering::Relaxed),
            "starting capture session"
        );
        self.recorder
            .start(self.detector.clone(), self.chunk_tx.clone())
    }

    /// Terminate the recorder; emits `StopComplete`. No-op when not running.
    pub fn stop(&mut self) {
        tracing::info!("stopping capture session");
        self.recorder.stop();
    }

    /// Suspend the recorder and the stream; emits `PauseComplete`. No-op when
    /// not running.
    pub fn pause(&mut self) {
        tracing::debug!("pausing capture session");
        self.recorder.pause();
    }

    /// Continue a paused recorder; emits `ResumeComplete`. No-op when not
    /// running.
    pub fn resume(&mut self) {
        tracing::debug!("resuming capture session");
        self.recorder.resume();
    }

    pub fn is_running(&self) -> bool {
        self.recorder.is_running()
    }

    /// The live audio stream: chunks arrive in subprocess output order,
    /// unmodified. The receiver is cloneable for fan-out.
    pub fn audio_stream(&self) -> Receiver<Vec<u8>> {
        self.chunk_rx.clone()
    }

    /// Session notifications; see [`MicEvent`].
    pub fn events(&self) -> Receiver<MicEvent> {
        self.event_rx.clone()
    }

    /// Retarget the silence-exit threshold on the live detector. 0 disables
    /// detection.
    pub fn set_exit_on_silence(&self, threshold: u32) {
        self.threshold.store(threshold, Ordering::Relaxed);
        log_debug(&format!("exit_on_silence set to {threshold}"));
    }

    pub fn exit_on_silence(&self) -> u32 {
        self.threshold.load(Ordering::Relaxed)
    }

    /// Current consecutive-silent-chunk count.
    pub fn consecutive_silence(&self) -> u32 {
        self.detector
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .consecutive_silence()
    }

    #[cfg(test)]
    pub(crate) fn set_command_override(&mut self, command: crate::capture::RecorderCommand) {
        self.recorder.set_command_override(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::RecorderCommand;
    use crossbeam_channel::RecvTimeoutError;
    use std::time::{Duration, Instant};

    fn sh_command(script: &str) -> RecorderCommand {
        RecorderCommand {
            program: "/bin/sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    fn drain_until_exit(events: &Receiver<MicEvent>) -> Vec<MicEvent> {
        let mut seen = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            match events.recv_timeout(Duration::from_millis(100)) {
                Ok(event) => {
                    let is_exit = matches!(event, MicEvent::ProcessExit { .. });
                    seen.push(event);
                    if is_exit {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        seen
    }

    #[test]
    fn stop_before_start_is_a_noop() {
        let mut mic = Microphone::new(CaptureConfig::default(), Platform::Other);
        assert!(!mic.is_running());
        mic.stop();
        mic.pause();
        mic.resume();
        assert!(mic.events().try_recv().is_err());
    }

    #[test]
    fn set_exit_on_silence_retargets_live_threshold() {
        let mic = Microphone::new(CaptureConfig::default(), Platform::Other);
        assert_eq!(mic.exit_on_silence(), 0);
        mic.set_exit_on_silence(3);
        assert_eq!(mic.exit_on_silence(), 3);
        assert_eq!(mic.consecutive_silence(), 0);
    }

    #[test]
    fn full_session_forwards_audio_and_reports_silence() {
        let config = CaptureConfig {
            exit_on_silence: 1,
            ..CaptureConfig::default()
        };
        let mut mic = Microphone::new(config, Platform::Other);
        mic.set_command_override(sh_command("printf '\\000\\000\\000\\000'"));
        let chunks = mic.audio_stream();
        let events = mic.events();

        mic.start().expect("session should start");
        let seen = drain_until_exit(&events);

        assert_eq!(seen.first(), Some(&MicEvent::StartComplete));
        assert!(seen.contains(&MicEvent::Silence {
            consecutive_chunks: 1
        }));
        assert_eq!(seen.last(), Some(&MicEvent::ProcessExit { code: Some(0) }));

        let mut audio = Vec::new();
        while let Ok(chunk) = chunks.try_recv() {
            audio.extend(chunk);
        }
        assert_eq!(audio, vec![0u8; 4]);
        assert!(!mic.is_running());
    }

    #[test]
    fn session_restarts_after_external_exit() {
        let mut mic = Microphone::new(CaptureConfig::default(), Platform::Other);
        mic.set_command_override(sh_command("exit 0"));
        let events = mic.events();

        mic.start().expect("first start");
        let first = drain_until_exit(&events);
        assert_eq!(first.last(), Some(&MicEvent::ProcessExit { code: Some(0) }));
        assert!(!mic.is_running());

        mic.start().expect("restart after external exit");
        let second = drain_until_exit(&events);
        assert_eq!(second.first(), Some(&MicEvent::StartComplete));
        assert_eq!(second.last(), Some(&MicEvent::ProcessExit { code: Some(0) }));
    }
}
