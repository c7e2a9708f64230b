//! Audio pipeline configuration

use serde::{Deserialize, Serialize};

/// Utterance capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Sample rate for microphone capture
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Samples per analysis frame
    #[serde(default = "default_frame_samples")]
    pub frame_samples: usize,

    /// Activity score at or above which a frame counts as voice (0.0 - 1.0)
    #[serde(default = "default_threshold")]
    pub activity_threshold: f32,

    /// Silence duration (ms) that ends an utterance
    #[serde(default = "default_silence_duration")]
    pub silence_duration_ms: u64,

    /// Hard ceiling on one utterance (seconds)
    #[serde(default = "default_max_recording")]
    pub max_recording_secs: u64,

    /// Audio retained from before voice onset (ms)
    #[serde(default = "default_pre_buffer")]
    pub pre_buffer_ms: u64,

    /// Path to a trigger-phrase wake model, if one is deployed
    #[serde(default)]
    pub wake_model_path: Option<std::path::PathBuf>,
}

fn default_sample_rate() -> u32 {
    16_000
}

fn default_frame_samples() -> usize {
    512
}

fn default_threshold() -> f32 {
    0.6
}

fn default_silence_duration() -> u64 {
    1_000
}

fn default_max_recording() -> u64 {
    30
}

fn default_pre_buffer() -> u64 {
    1_000
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            frame_samples: default_frame_samples(),
            activity_threshold: default_threshold(),
            silence_duration_ms: default_silence_duration(),
            max_recording_secs: default_max_recording(),
            pre_buffer_ms: default_pre_buffer(),
            wake_model_path: None,
        }
    }
}

impl CaptureConfig {
    /// Set the activity threshold
    #[must_use]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.activity_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Number of frames the pre-buffer holds
    #[must_use]
    pub fn pre_buffer_frames(&self) -> usize {
        let samples = self.sample_rate as u64 * self.pre_buffer_ms / 1000;
        (samples as usize).div_ceil(self.frame_samples.max(1))
    }
}

/// Speech configuration (transcription and synthesis)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Language hint for transcription
    #[serde(default = "default_language")]
    pub language: String,

    /// Synthesis voice
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Synthesis model
    #[serde(default = "default_speech_model")]
    pub speech_model: String,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_voice() -> String {
    "alloy".to_string()
}

fn default_speech_model() -> String {
    "tts-1".to_string()
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            voice: default_voice(),
            speech_model: default_speech_model(),
        }
    }
}

/// Top-level audio configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Capture settings
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Speech settings
    #[serde(default)]
    pub speech: SpeechConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CaptureConfig::default();
        assert_eq!(config.sample_rate, 16_000);
        assert_eq!(config.frame_samples, 512);
        assert_eq!(config.silence_duration_ms, 1_000);
        assert_eq!(config.max_recording_secs, 30);
    }

    #[test]
    fn test_pre_buffer_frames() {
        let config = CaptureConfig::default();
        // One second at 16kHz in 512-sample frames.
        assert_eq!(config.pre_buffer_frames(), 32);
    }

    #[test]
    fn test_threshold_clamped() {
        let config = CaptureConfig::default().with_threshold(1.4);
        assert_eq!(config.activity_threshold, 1.0);
    }
}
