//! Fixed-size audio frames

use std::time::Instant;

/// Audio sample type
pub type Sample = f32;

/// One fixed-size block of mono samples from the microphone
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Mono samples in -1.0..=1.0
    pub samples: Vec<Sample>,
    /// Monotonic time the block left the microphone
    ///
    /// Silence-tail and recording-ceiling windows are measured on this
    /// capture timeline, so frames that queue up behind a slow consumer
    /// keep their original spacing.
    pub captured_at: Instant,
}

impl AudioFrame {
    /// Create a frame from samples captured at the given instant
    #[must_use]
    pub fn new(samples: Vec<Sample>, captured_at: Instant) -> Self {
        Self {
            samples,
            captured_at,
        }
    }

    /// Number of samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the frame holds no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback duration at the given sample rate, in milliseconds
    #[must_use]
    pub fn duration_ms(&self, sample_rate: u32) -> f64 {
        self.samples.len() as f64 * 1000.0 / f64::from(sample_rate)
    }
}
