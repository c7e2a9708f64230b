//! Utterance capture state machine
//!
//! Pure state machine over (frame, activity score, time): Idle keeps a
//! rolling pre-buffer so the first syllables of an utterance are not lost;
//! Recording appends frames and watches for a silence tail or the hard
//! time ceiling; a flush hands the frozen utterance to the caller and
//! returns to Idle. Feeding the machine is the caller's job, which keeps
//! every timing property testable without hardware.

use crate::config::CaptureConfig;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::debug;

/// A bounded span of captured audio representing one user request
#[derive(Debug, Clone)]
pub struct Utterance {
    /// Mono samples including the pre-buffer
    pub samples: Vec<f32>,
    /// Capture sample rate
    pub sample_rate: u32,
    /// Recording duration from voice onset to flush
    pub duration: Duration,
}

/// Result of feeding one frame to the machine
#[derive(Debug)]
pub enum CaptureEvent {
    /// Nothing changed; keep feeding frames
    Pending,
    /// Voice onset: recording has begun
    Started,
    /// The utterance is complete
    Flushed(Utterance),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Recording,
}

/// Wake/VAD-gated recording state machine
#[derive(Debug)]
pub struct UtteranceCapture {
    threshold: f32,
    silence: Duration,
    max_recording: Duration,
    pre_buffer_frames: usize,
    sample_rate: u32,
    state: State,
    pre_buffer: VecDeque<Vec<f32>>,
    buffer: Vec<f32>,
    session_start: Option<Instant>,
    last_voice_at: Option<Instant>,
}

impl UtteranceCapture {
    /// Create a capture machine from configuration
    #[must_use]
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            threshold: config.activity_threshold,
            silence: Duration::from_millis(config.silence_duration_ms),
            max_recording: Duration::from_secs(config.max_recording_secs),
            pre_buffer_frames: config.pre_buffer_frames(),
            sample_rate: config.sample_rate,
            state: State::Idle,
            pre_buffer: VecDeque::new(),
            buffer: Vec::new(),
            session_start: None,
            last_voice_at: None,
        }
    }

    /// True while an utterance is being recorded
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.state == State::Recording
    }

    /// Feed one frame with its activity score at time `now`
    pub fn push(&mut self, frame: &[f32], score: f32, now: Instant) -> CaptureEvent {
        match self.state {
            State::Idle => self.push_idle(frame, score, now),
            State::Recording => self.push_recording(frame, score, now),
        }
    }

    /// Abandon any in-progress recording and return to Idle
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.pre_buffer.clear();
        self.buffer.clear();
        self.session_start = None;
        self.last_voice_at = None;
    }

    fn push_idle(&mut self, frame: &[f32], score: f32, now: Instant) -> CaptureEvent {
        if score >= self.threshold {
            debug!(score, "voice onset");
            self.state = State::Recording;
            self.session_start = Some(now);
            self.last_voice_at = Some(now);

            // The pre-buffer holds the audio just before onset.
            self.buffer = self.pre_buffer.drain(..).flatten().collect();
            self.buffer.extend_from_slice(frame);
            return CaptureEvent::Started;
        }

        if self.pre_buffer.len() == self.pre_buffer_frames && self.pre_buffer_frames > 0 {
            self.pre_buffer.pop_front();
        }
        if self.pre_buffer_frames > 0 {
            self.pre_buffer.push_back(frame.to_vec());
        }
        CaptureEvent::Pending
    }

    fn push_recording(&mut self, frame: &[f32], score: f32, now: Instant) -> CaptureEvent {
        self.buffer.extend_from_slice(frame);
        if score >= self.threshold {
            self.last_voice_at = Some(now);
        }

        let session_start = self.session_start.unwrap_or(now);
        let last_voice = self.last_voice_at.unwrap_or(now);

        let silent_too_long = now.duration_since(last_voice) > self.silence;
        let over_ceiling = now.duration_since(session_start) > self.max_recording;
        if silent_too_long || over_ceiling {
            debug!(
                silent_too_long,
                over_ceiling,
                samples = self.buffer.len(),
                "utterance flushed"
            );
            let utterance = Utterance {
                samples: std::mem::take(&mut self.buffer),
                sample_rate: self.sample_rate,
                duration: now.duration_since(session_start),
            };
            self.reset();
            return CaptureEvent::Flushed(utterance);
        }

        CaptureEvent::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: usize = 512;
    const RATE: u32 = 16_000;

    fn config() -> CaptureConfig {
        CaptureConfig::default()
    }

    fn frame_period() -> Duration {
        Duration::from_micros(FRAME as u64 * 1_000_000 / RATE as u64)
    }

    fn voice() -> Vec<f32> {
        vec![0.8; FRAME]
    }

    fn silence() -> Vec<f32> {
        vec![0.0; FRAME]
    }

    /// Drive the machine with per-frame scores starting at `start`,
    /// advancing one frame period per score.
    fn drive(
        capture: &mut UtteranceCapture,
        start: Instant,
        scores: &[f32],
    ) -> (Option<Utterance>, Instant) {
        let mut now = start;
        for &score in scores {
            now += frame_period();
            let samples = if score >= 0.6 { voice() } else { silence() };
            if let CaptureEvent::Flushed(u) = capture.push(&samples, score, now) {
                return (Some(u), now);
            }
        }
        (None, now)
    }

    #[test]
    fn test_onset_starts_recording_with_pre_buffer() {
        let mut capture = UtteranceCapture::new(&config());
        let start = Instant::now();

        // Fill the pre-buffer with distinctive silence frames.
        let (flushed, now) = drive(&mut capture, start, &[0.0; 40]);
        assert!(flushed.is_none());
        assert!(!capture.is_recording());

        let event = capture.push(&voice(), 0.9, now + frame_period());
        assert!(matches!(event, CaptureEvent::Started));
        assert!(capture.is_recording());
        // Pre-buffer (32 frames) plus the onset frame are retained.
        assert_eq!(capture.buffer.len(), 33 * FRAME);
    }

    #[test]
    fn test_silence_tail_flushes() {
        let mut capture = UtteranceCapture::new(&config());
        let start = Instant::now();

        // Voice for 10 frames, then silence; the flush comes once the
        // silent tail exceeds one second.
        let mut scores = vec![0.9; 10];
        scores.extend(vec![0.0; 40]);
        let (flushed, _) = drive(&mut capture, start, &scores);

        let utterance = flushed.expect("flushed");
        assert_eq!(utterance.sample_rate, RATE);
        assert!(!capture.is_recording());
        // ~32ms per frame, so the tail trips just past frame 31 of silence.
        assert!(utterance.duration > Duration::from_secs(1));
    }

    #[test]
    fn test_brief_dips_do_not_flush() {
        let mut capture = UtteranceCapture::new(&config());
        let start = Instant::now();

        // Voice every 16 frames (~0.5s apart) keeps each silence window
        // under the one-second tail, so the session never flushes early.
        let mut scores = Vec::new();
        for _ in 0..20 {
            scores.push(0.9);
            scores.extend(vec![0.0; 15]);
        }
        let (flushed, _) = drive(&mut capture, start, &scores);

        assert!(flushed.is_none());
        assert!(capture.is_recording());
    }

    #[test]
    fn test_hard_ceiling_despite_continuous_voice() {
        let mut capture = UtteranceCapture::new(&config());
        let start = Instant::now();

        // 32ms frames: 30s is 937.5 frames. Continuous voice must still
        // flush within MAX_RECORDING_TIME plus one frame period.
        let scores = vec![0.9; 1000];
        let (flushed, now) = drive(&mut capture, start, &scores);

        let utterance = flushed.expect("ceiling flush");
        assert!(utterance.duration <= Duration::from_secs(30) + frame_period());
        let _ = now;
    }

    #[test]
    fn test_reset_abandons_recording() {
        let mut capture = UtteranceCapture::new(&config());
        let now = Instant::now();
        capture.push(&voice(), 0.9, now);
        assert!(capture.is_recording());

        capture.reset();
        assert!(!capture.is_recording());
        assert!(capture.buffer.is_empty());
    }
}
