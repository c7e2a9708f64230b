//! Top-level configuration
//!
//! Loaded from a TOML file; every section and field has a default so an
//! empty file (or a missing one handled by the caller) yields a working
//! configuration.

use crate::error::{Error, Result};
use okulo_audio::AudioConfig;
use okulo_vision::VisionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

fn default_persona() -> String {
    "You are Okulo, a small companion device with motorized eyes. \
     Keep replies short and spoken-word friendly: no markdown, no lists. \
     You can call tools when the user asks for something they cover."
        .to_string()
}

fn default_session_timeout_secs() -> u64 {
    60
}

fn default_min_fragment_chars() -> usize {
    15
}

/// Configuration for the whole device
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OkuloConfig {
    /// System prompt seeding every conversation
    pub persona: String,
    /// Seconds of conversational silence before dropping back to sleep
    pub session_timeout_secs: u64,
    /// Minimum characters before a sentence terminator ends a speech fragment
    pub min_fragment_chars: usize,
    /// Microphone capture and speech settings
    pub audio: AudioConfig,
    /// Camera, tracking and actuator settings
    pub vision: VisionConfig,
}

impl Default for OkuloConfig {
    fn default() -> Self {
        Self {
            persona: default_persona(),
            session_timeout_secs: default_session_timeout_secs(),
            min_fragment_chars: default_min_fragment_chars(),
            audio: AudioConfig::default(),
            vision: VisionConfig::default(),
        }
    }
}

impl OkuloConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        debug!(path = %path.display(), "loaded configuration");
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express
    pub fn validate(&self) -> Result<()> {
        let capture = &self.audio.capture;
        if !(0.0..=1.0).contains(&capture.activity_threshold) {
            return Err(Error::Config(format!(
                "audio.capture.activity_threshold must be within 0..=1, got {}",
                capture.activity_threshold
            )));
        }
        if capture.frame_samples == 0 {
            return Err(Error::Config(
                "audio.capture.frame_samples must be positive".to_string(),
            ));
        }
        if capture.sample_rate == 0 {
            return Err(Error::Config(
                "audio.capture.sample_rate must be positive".to_string(),
            ));
        }
        if capture.max_recording_secs == 0 {
            return Err(Error::Config(
                "audio.capture.max_recording_secs must be positive".to_string(),
            ));
        }
        if self.vision.blink_one_in == 0 {
            return Err(Error::Config(
                "vision.blink_one_in must be positive".to_string(),
            ));
        }
        if self.vision.interval_ms == 0 {
            return Err(Error::Config(
                "vision.interval_ms must be positive".to_string(),
            ));
        }
        if self.session_timeout_secs == 0 {
            return Err(Error::Config(
                "session_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = OkuloConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session_timeout_secs, 60);
        assert_eq!(config.min_fragment_chars, 15);
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config: OkuloConfig = toml::from_str("").unwrap();
        assert_eq!(config.audio.capture.sample_rate, 16_000);
        assert_eq!(config.vision.blink_one_in, 25);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config: OkuloConfig = toml::from_str(
            r#"
            session_timeout_secs = 120

            [audio.capture]
            activity_threshold = 0.4

            [vision]
            serial_port = "/dev/ttyUSB0"
            "#,
        )
        .unwrap();
        assert_eq!(config.session_timeout_secs, 120);
        assert!((config.audio.capture.activity_threshold - 0.4).abs() < f32::EPSILON);
        assert_eq!(config.vision.serial_port, "/dev/ttyUSB0");
        // Untouched fields keep their defaults.
        assert_eq!(config.audio.capture.sample_rate, 16_000);
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let mut config = OkuloConfig::default();
        config.audio.capture.activity_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = OkuloConfig::default();
        config.session_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
