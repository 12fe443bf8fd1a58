use super::SPEECH_MAGNITUDE;
use crate::config::Endian;
use crate::log_debug;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Fired when the consecutive-silence count reaches the configured threshold.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SilenceEvent {
    pub consecutive_chunks: u32,
}

/// Classifies each chunk of raw PCM as silent or speech-bearing.
///
/// Samples are decoded as 16-bit signed pairs in the configured byte order.
/// A chunk counts as speech as soon as one sample's magnitude exceeds
/// [`SPEECH_MAGNITUDE`]; scanning stops there and the consecutive-silence
/// count resets. A fully silent chunk bumps the count by exactly one, and the
/// event fires only on the increment that lands exactly on the threshold, so
/// a long stretch of silence produces a single notification until speech
/// re-arms the detector.
///
/// The threshold lives behind a shared atomic so a running session can be
/// retargeted without touching the pump thread. A threshold of 0 disables
/// detection entirely: nothing is scanned and the count never moves.
pub struct SilenceDetector {
    endian: Endian,
    exit_threshold: Arc<AtomicU32>,
    consecutive_silence: u32,
}

impl SilenceDetector {
    pub fn new(endian: Endian, exit_on_silence: u32) -> Self {
        Self::with_threshold_handle(endian, Arc::new(AtomicU32::new(exit_on_silence)))
    }

    /// Build a detector around an externally owned threshold cell.
    pub fn with_threshold_handle(endian: Endian, exit_threshold: Arc<AtomicU32>) -> Self {
        Self {
            endian,
            exit_threshold,
            consecutive_silence: 0,
        }
    }

    /// Handle for retargeting the threshold while the detector is live.
    pub fn threshold_handle(&self) -> Arc<AtomicU32> {
        self.exit_threshold.clone()
    }

    pub fn exit_on_silence(&self) -> u32 {
        self.exit_threshold.load(Ordering::Relaxed)
    }

    pub fn consecutive_silence(&self) -> u32 {
        self.consecutive_silence
    }

    /// Run one chunk through the stage. The caller forwards the same bytes
    /// downstream unchanged; the return value is the only side channel.
    pub fn process(&mut self, chunk: &[u8]) -> Option<SilenceEvent> {
        let threshold = self.exit_threshold.load(Ordering::Relaxed);
        if threshold == 0 {
            return None;
        }

        if chunk_has_speech(chunk, self.endian) {
            if self.consecutive_silence > 0 {
                log_debug(&format!(
                    "speech after {} silent chunks",
                    self.consecutive_silence
                ));
            }
            self.consecutive_silence = 0;
            return None;
        }

        self.consecutive_silence = self.consecutive_silence.saturating_add(1);
        if self.consecutive_silence == threshold {
            log_debug(&format!("silence threshold reached after {threshold} chunks"));
            Some(SilenceEvent {
                consecutive_chunks: self.consecutive_silence,
            })
        } else {
            None
        }
    }
}

/// Scan 16-bit sample pairs for one magnitude above the speech threshold.
/// Trailing odd bytes cannot form a sample and are ignored, so truncated
/// chunks never fail.
fn chunk_has_speech(chunk: &[u8], endian: Endian) -> bool {
    chunk.chunks_exact(2).any(|pair| {
        let sample = match endian {
            Endian::Little => i16::from_le_bytes([pair[0], pair[1]]),
            Endian::Big => i16::from_be_bytes([pair[0], pair[1]]),
        };
        i32::from(sample).abs() > SPEECH_MAGNITUDE
    })
}
