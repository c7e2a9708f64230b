//! Per-frame voice activity scoring and the wake detector seam
//!
//! Wake detection is a capability behind [`WakeDetector`] so a
//! trigger-phrase model can be plugged in at wiring time. The built-in
//! implementation is [`VadScorer`]: the RMS of a frame of normalized
//! samples lands in 0.0..=1.0 and serves both as the wake gate (in sleep)
//! and as the turn-taking signal during capture.

use crate::config::CaptureConfig;
use tracing::info;

/// Capability to score frames for wake-up and turn-taking
pub trait WakeDetector: Send {
    /// Activity or trigger score for one frame, in 0.0..=1.0
    fn score(&mut self, samples: &[f32]) -> f32;

    /// The detection threshold
    fn threshold(&self) -> f32;

    /// Reset internal state at a session boundary
    fn reset(&mut self) {}
}

/// Build the configured wake detector.
///
/// A `wake_model_path` may name a trigger-phrase model; no model backend
/// ships in-crate, so a configured path is only announced and scoring
/// stays energy-based until a [`WakeDetector`] backend is wired in.
#[must_use]
pub fn wake_detector(config: &CaptureConfig) -> Box<dyn WakeDetector> {
    if let Some(path) = &config.wake_model_path {
        info!(
            path = %path.display(),
            "wake model configured but no model backend is wired, using energy scoring"
        );
    } else {
        info!("wake detector initialized (energy scoring)");
    }
    Box::new(VadScorer::new(config.activity_threshold))
}

/// Energy-based voice activity scorer
#[derive(Debug, Clone, Copy)]
pub struct VadScorer {
    threshold: f32,
}

impl VadScorer {
    /// Create a scorer with the given detection threshold
    #[must_use]
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    /// Activity score of a frame: RMS energy in 0.0..=1.0
    #[must_use]
    pub fn score(&self, samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    /// True when the frame's score reaches the threshold
    #[must_use]
    pub fn is_voice(&self, samples: &[f32]) -> bool {
        self.score(samples) >= self.threshold
    }
}

impl WakeDetector for VadScorer {
    fn score(&mut self, samples: &[f32]) -> f32 {
        VadScorer::score(self, samples)
    }

    fn threshold(&self) -> f32 {
        self.threshold
    }
}
