//! Okulo Audio - the voice side of the companion
//!
//! This crate provides:
//! - Input: microphone capture delivering fixed-size frames
//! - Vad: per-frame voice activity scoring
//! - Capture: the wake/VAD-gated utterance state machine
//! - Stt: Whisper API transcription
//! - Tts: streamed speech synthesis backends
//! - Output: speaker playback and the ordered fragment pipeline

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod capture;
pub mod config;
pub mod error;
pub mod frame;
pub mod input;
pub mod output;
pub mod stt;
pub mod tts;
pub mod vad;

pub use capture::{CaptureEvent, Utterance, UtteranceCapture};
pub use config::{AudioConfig, CaptureConfig, SpeechConfig};
pub use error::{Error, Result};
pub use frame::{AudioFrame, Sample};
pub use input::{samples_to_wav, AudioInput};
pub use output::{AudioOutput, AudioSink, SpeakerPipeline};
pub use stt::{SpeechToText, TranscriptionClient};
pub use tts::{OpenAiSpeech, SynthesisBackend};
pub use vad::{wake_detector, VadScorer, WakeDetector};
