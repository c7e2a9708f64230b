//! Okulo Vision - mechanical-eye gaze tracking
//!
//! This crate drives the companion's motorized eyes:
//! - Detect: video frames, face/motion detector capability traits
//! - Focus: gaze target smoothing and motion averaging
//! - Actuator: the serial command gateway and transport trait
//! - Scenes: eyelid poses, blinks, and the wake-up choreography
//! - Attention: the independent tracking loop

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod actuator;
pub mod attention;
pub mod config;
pub mod detect;
pub mod error;
pub mod focus;
pub mod scenes;

pub use actuator::{ActuatorCommand, ActuatorGateway, ActuatorTransport, SerialTransport};
pub use attention::{AttentionLoop, ModeProbe};
pub use config::{AxisCalibration, EyeCalibration, VisionConfig};
pub use detect::{FaceBox, FaceDetector, Frame, FrameDiffMotion, MotionDetector, NullFaceDetector, VideoSource};
pub use error::{Error, Result};
pub use focus::{FocusPoint, FocusTracker};
