//! Pump thread: reads recorder stdout, runs the silence stage, forwards
//! chunks downstream in arrival order, and reaps the child at end of stream.

use super::process::{send_event, ProcessController, RecorderShared, SignalController};
use crate::audio::SilenceDetector;
use crate::log_debug;
use crate::mic::MicEvent;
use crossbeam_channel::{SendTimeoutError, Sender};
use std::io::{ErrorKind, Read};
use std::process::{Child, ChildStdout};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const READ_BUFFER_BYTES: usize = 4096;
const PAUSE_POLL: Duration = Duration::from_millis(10);
const SEND_POLL: Duration = Duration::from_millis(100);

enum Forward {
    Sent,
    Closed,
}

pub(super) fn spawn_pump_thread(
    mut child: Child,
    mut stdout: ChildStdout,
    detector: Arc<Mutex<SilenceDetector>>,
    chunk_tx: Sender<Vec<u8>>,
    event_tx: Sender<MicEvent>,
    shared: Arc<RecorderShared>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut buffer = [0u8; READ_BUFFER_BYTES];
        let mut downstream_gone = false;
        loop {
            // While paused the pipe is left alone; the suspended child and
            // the kernel buffer hold whatever is in flight.
            if shared.paused.load(Ordering::Relaxed) {
                thread::sleep(PAUSE_POLL);
                continue;
            }
            match stdout.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    let chunk = buffer[..n].to_vec();
                    let silence = {
                        let mut detector = detector.lock().unwrap_or_else(|e| e.into_inner());
                        detector.process(&chunk)
                    };
                    if let Some(event) = silence {
                        send_event(
                            &event_tx,
                            MicEvent::Silence {
                                consecutive_chunks: event.consecutive_chunks,
                            },
                        );
                    }
                    if matches!(forward_chunk(&chunk_tx, &shared, chunk), Forward::Closed) {
                        downstream_gone = true;
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    log_debug(&format!("recorder stream read failed: {err}"));
                    send_event(
                        &event_tx,
                        MicEvent::StreamError {
                            message: err.to_string(),
                        },
                    );
                    downstream_gone = true;
                    break;
                }
            }
        }

        // Nobody is listening or the stream broke: make sure the child dies
        // before we block on reaping it.
        if downstream_gone && !shared.stopping.load(Ordering::Relaxed) {
            if let Err(err) = SignalController::new(child.id() as i32).terminate() {
                log_debug(&format!("terminate after stream loss failed: {err:#}"));
            }
        }

        match child.wait() {
            Ok(status) => {
                if !shared.stopping.load(Ordering::Relaxed) {
                    shared.pid.store(-1, Ordering::Relaxed);
                    log_debug(&format!("recorder exited on its own: {status}"));
                    send_event(
                        &event_tx,
                        MicEvent::ProcessExit {
                            code: status.code(),
                        },
                    );
                }
            }
            Err(err) => log_debug(&format!("failed to reap recorder: {err}")),
        }
    })
}

/// Blocking forward with an escape hatch: while the session is shutting down
/// a stalled consumer must not wedge the pump, so the chunk is dropped then.
fn forward_chunk(
    chunk_tx: &Sender<Vec<u8>>,
    shared: &RecorderShared,
    mut chunk: Vec<u8>,
) -> Forward {
    loop {
        match chunk_tx.send_timeout(chunk, SEND_POLL) {
            Ok(()) => return Forward::Sent,
            Err(SendTimeoutError::Timeout(returned)) => {
                if shared.stopping.load(Ordering::Relaxed) {
                    return Forward::Closed;
                }
                chunk = returned;
            }
            Err(SendTimeoutError::Disconnected(_)) => return Forward::Closed,
        }
    }
}
