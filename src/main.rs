//! Capture CLI: records microphone audio to a file or stdout until the
//! silence threshold trips, the recorder exits, or Ctrl-C arrives.

use anyhow::{Context, Result};
use crossbeam_channel::{select, Receiver};
use micpipe::capture::{recorder_command, Platform};
use micpipe::config::AppConfig;
use micpipe::{
    init_logging, init_telemetry, log_debug, log_panic, MicEvent, Microphone, SessionMetrics,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigint(_signal: libc::c_int) {
    STOP_REQUESTED.store(true, Ordering::Relaxed);
}

fn install_sigint_handler() {
    let handler = handle_sigint as extern "C" fn(libc::c_int);
    // SAFETY: the handler only stores to an atomic flag, which is
    // async-signal-safe.
    unsafe {
        libc::signal(libc::SIGINT, handler as libc::sighandler_t);
    }
}

fn open_output(path: &Path) -> Result<Box<dyn Write>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(io::stdout()));
    }
    let file = File::create(path)
        .with_context(|| format!("failed to create output file '{}'", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    init_logging(&config);
    init_telemetry(&config);
    std::panic::set_hook(Box::new(|info| log_panic(info)));

    let platform = config.platform.unwrap_or_else(Platform::host);
    let capture = config.capture_config();

    if config.print_config {
        let snapshot = serde_json::json!({
            "platform": platform,
            "config": capture,
            "command": recorder_command(&capture, platform),
        });
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    install_sigint_handler();
    let mut writer = open_output(&config.output)?;

    let mut mic = Microphone::new(capture.clone(), platform);
    let chunks = mic.audio_stream();
    let events = mic.events();
    mic.start()?;

    let mut metrics = SessionMetrics::default();
    let exit_reason = run_session(
        &chunks,
        &events,
        writer.as_mut(),
        &mut metrics,
        capture.exit_on_silence > 0,
    )?;
    mic.stop();

    // Pick up whatever the pump forwarded before the session ended.
    while let Ok(chunk) = chunks.try_recv() {
        record_chunk(writer.as_mut(), &chunk, &mut metrics)?;
    }
    writer.flush().context("failed to flush output")?;

    metrics.finish(exit_reason);
    if capture.debug {
        eprintln!("{}", serde_json::to_string(&metrics)?);
    }
    Ok(())
}

fn run_session(
    chunks: &Receiver<Vec<u8>>,
    events: &Receiver<MicEvent>,
    writer: &mut dyn Write,
    metrics: &mut SessionMetrics,
    stop_on_silence: bool,
) -> Result<&'static str> {
    loop {
        if STOP_REQUESTED.load(Ordering::Relaxed) {
            return Ok("interrupt");
        }
        select! {
            recv(chunks) -> chunk => match chunk {
                Ok(chunk) => record_chunk(writer, &chunk, metrics)?,
                Err(_) => return Ok("stream_closed"),
            },
            recv(events) -> event => match event {
                Ok(event) => {
                    if let Some(reason) = handle_event(event, metrics, stop_on_silence) {
                        return Ok(reason);
                    }
                }
                Err(_) => return Ok("stream_closed"),
            },
            default(Duration::from_millis(100)) => {}
        }
    }
}

fn record_chunk(writer: &mut dyn Write, chunk: &[u8], metrics: &mut SessionMetrics) -> Result<()> {
    writer
        .write_all(chunk)
        .context("failed to write audio chunk")?;
    metrics.record_chunk(chunk.len());
    Ok(())
}

fn handle_event(
    event: MicEvent,
    metrics: &mut SessionMetrics,
    stop_on_silence: bool,
) -> Option<&'static str> {
    log_debug(&format!("session event: {event:?}"));
    match event {
        MicEvent::Silence { consecutive_chunks } => {
            metrics.record_silence();
            tracing::debug!(consecutive_chunks, "silence threshold crossed");
            stop_on_silence.then_some("silence")
        }
        MicEvent::ProcessExit { code } => {
            eprintln!("recorder exited unexpectedly (code {code:?})");
            Some("process_exit")
        }
        MicEvent::StreamError { message } => {
            eprintln!("audio stream error: {message}");
            Some("stream_error")
        }
        MicEvent::StartComplete
        | MicEvent::StopComplete
        | MicEvent::PauseComplete
        | MicEvent::ResumeComplete => None,
    }
}
