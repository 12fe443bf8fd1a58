use super::command::{alsa_format, recorder_command, Platform, RecorderCommand};
use super::process::Recorder;
use crate::audio::SilenceDetector;
use crate::config::{CaptureConfig, Endian, SampleEncoding};
use crate::mic::MicEvent;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[test]
fn arecord_profile_matches_default_config() {
    let command = recorder_command(&CaptureConfig::default(), Platform::Other);
    assert_eq!(command.program, "arecord");
    assert_eq!(
        command.args,
        vec!["-c", "1", "-r", "16000", "-f", "S16_LE", "-D", "plughw:1,0"]
    );
}

#[test]
fn sox_profile_matches_windows_recorder() {
    let command = recorder_command(&CaptureConfig::default(), Platform::Windows);
    assert_eq!(command.program, "sox");
    assert_eq!(
        command.args,
        vec![
            "-b",
            "16",
            "--endian",
            "little",
            "-c",
            "1",
            "-r",
            "16000",
            "-e",
            "signed-integer",
            "-t",
            "waveaudio",
            "default",
            "-p"
        ]
    );
}

#[test]
fn rec_profile_honors_file_type() {
    let config = CaptureConfig {
        file_type: "wav".to_string(),
        ..CaptureConfig::default()
    };
    let command = recorder_command(&config, Platform::Macos);
    assert_eq!(command.program, "rec");
    assert_eq!(
        command.args,
        vec![
            "-b",
            "16",
            "--endian",
            "little",
            "-c",
            "1",
            "-r",
            "16000",
            "-e",
            "signed-integer",
            "-t",
            "wav",
            "-"
        ]
    );
}

#[test]
fn alsa_format_reflects_encoding_and_endian() {
    let config = CaptureConfig {
        encoding: SampleEncoding::UnsignedInteger,
        bitwidth: 8,
        endian: Endian::Big,
        ..CaptureConfig::default()
    };
    assert_eq!(alsa_format(&config), "U8_BE");
}

#[test]
fn host_platform_maps_target_os() {
    let host = Platform::host();
    #[cfg(target_os = "linux")]
    assert_eq!(host, Platform::Other);
    #[cfg(target_os = "macos")]
    assert_eq!(host, Platform::Macos);
    #[cfg(target_os = "windows")]
    assert_eq!(host, Platform::Windows);
    let _ = host;
}

fn sh_command(script: &str) -> RecorderCommand {
    RecorderCommand {
        program: "/bin/sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
    }
}

struct TestSession {
    recorder: Recorder,
    events: Receiver<MicEvent>,
    chunks: Receiver<Vec<u8>>,
    chunk_tx: Sender<Vec<u8>>,
    detector: Arc<Mutex<SilenceDetector>>,
}

fn session(script: &str) -> TestSession {
    let (event_tx, events) = bounded(64);
    let (chunk_tx, chunks) = bounded(64);
    let mut recorder = Recorder::new(CaptureConfig::default(), Platform::Other, event_tx);
    recorder.set_command_override(sh_command(script));
    TestSession {
        recorder,
        events,
        chunks,
        chunk_tx,
        detector: Arc::new(Mutex::new(SilenceDetector::new(Endian::Little, 0))),
    }
}

impl TestSession {
    fn start(&mut self) -> anyhow::Result<()> {
        self.recorder
            .start(self.detector.clone(), self.chunk_tx.clone())
    }

    fn drain_until_exit(&self) -> Vec<MicEvent> {
        let mut seen = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            match self.events.recv_timeout(Duration::from_millis(100)) {
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

    fn collected_audio(&self) -> Vec<u8> {
        let mut audio = Vec::new();
        while let Ok(chunk) = self.chunks.try_recv() {
            audio.extend(chunk);
        }
        audio
    }
}

#[test]
fn forwards_child_output_in_order() {
    let mut session = session("printf 'abc'; printf 'def'");
    session.start().expect("start");
    let events = session.drain_until_exit();
    assert_eq!(events.first(), Some(&MicEvent::StartComplete));
    assert_eq!(
        events.last(),
        Some(&MicEvent::ProcessExit { code: Some(0) })
    );
    assert_eq!(session.collected_audio(), b"abcdef");
}

#[test]
fn unexpected_exit_reports_code_and_clears_handle() {
    let mut session = session("exit 3");
    session.start().expect("start");
    let events = session.drain_until_exit();
    assert_eq!(
        events.last(),
        Some(&MicEvent::ProcessExit { code: Some(3) })
    );
    assert!(!session.recorder.is_running());
}

#[test]
fn start_while_running_fails() {
    let mut session = session("exec sleep 2");
    session.start().expect("first start");
    let err = session
        .start()
        .expect_err("second start on a live session must fail");
    assert!(err.to_string().contains("already started"), "{err:#}");
    session.recorder.stop();
}

#[test]
fn stop_clears_handle_and_allows_restart() {
    let mut session = session("exec sleep 5");
    session.start().expect("start");
    assert!(session.recorder.is_running());

    session.recorder.stop();
    assert!(!session.recorder.is_running());
    let mut saw_stop = false;
    while let Ok(event) = session.events.try_recv() {
        if event == MicEvent::StopComplete {
            saw_stop = true;
        }
    }
    assert!(saw_stop, "stop must emit StopComplete");

    session.start().expect("restart after stop");
    assert!(session.recorder.is_running());
    session.recorder.stop();
}

#[test]
fn pause_resume_loses_nothing_and_keeps_order() {
    let mut session = session("printf 'one'; sleep 1; printf 'two'");
    session.start().expect("start");

    std::thread::sleep(Duration::from_millis(200));
    session.recorder.pause();
    std::thread::sleep(Duration::from_millis(300));
    session.recorder.resume();

    let events = session.drain_until_exit();
    assert!(events.contains(&MicEvent::PauseComplete));
    assert!(events.contains(&MicEvent::ResumeComplete));
    assert_eq!(
        events.last(),
        Some(&MicEvent::ProcessExit { code: Some(0) })
    );
    assert_eq!(session.collected_audio(), b"onetwo");
}

#[test]
fn lifecycle_calls_are_noops_when_stopped() {
    let mut session = session("exit 0");
    session.recorder.stop();
    session.recorder.pause();
    session.recorder.resume();
    assert!(session.events.try_recv().is_err());
}
