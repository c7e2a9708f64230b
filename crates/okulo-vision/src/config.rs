//! Vision and actuator configuration

use crate::focus::FocusPoint;
use serde::{Deserialize, Serialize};

/// Linear pixel-to-angle calibration for one actuator axis
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AxisCalibration {
    /// Input range start (pixels)
    pub in_min: f32,
    /// Input range end (pixels)
    pub in_max: f32,
    /// Output range start (servo degrees)
    pub out_min: f32,
    /// Output range end (servo degrees)
    pub out_max: f32,
}

impl AxisCalibration {
    /// Map a pixel value to a rounded servo angle
    #[must_use]
    pub fn map(&self, value: f32) -> i32 {
        let angle = self.out_min
            + (value - self.in_min) * (self.out_max - self.out_min) / (self.in_max - self.in_min);
        angle.round() as i32
    }
}

/// Both-axis eye calibration.
///
/// The vertical axis is inverted: pixel rows grow downward while the eye's
/// pitch servo grows upward, so the y input is `frame_height - y`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EyeCalibration {
    /// Horizontal axis map
    #[serde(default = "default_x_axis")]
    pub x: AxisCalibration,
    /// Vertical axis map (applied to the flipped y)
    #[serde(default = "default_y_axis")]
    pub y: AxisCalibration,
    /// Frame height used for the vertical flip
    #[serde(default = "default_frame_height")]
    pub frame_height: f32,
}

fn default_x_axis() -> AxisCalibration {
    AxisCalibration {
        in_min: 40.0,
        in_max: 1240.0,
        out_min: 50.0,
        out_max: 130.0,
    }
}

fn default_y_axis() -> AxisCalibration {
    AxisCalibration {
        in_min: 40.0,
        in_max: 680.0,
        out_min: 70.0,
        out_max: 110.0,
    }
}

fn default_frame_height() -> f32 {
    720.0
}

impl Default for EyeCalibration {
    fn default() -> Self {
        Self {
            x: default_x_axis(),
            y: default_y_axis(),
            frame_height: default_frame_height(),
        }
    }
}

impl EyeCalibration {
    /// Map a focus point to (yaw, pitch) servo angles
    #[must_use]
    pub fn angles(&self, point: FocusPoint) -> (i32, i32) {
        let x = self.x.map(point.x);
        let y = self.y.map(self.frame_height - point.y);
        (x, y)
    }
}

/// Attention loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Loop cadence in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Seconds without a face before motion fallback engages
    #[serde(default = "default_motion_fallback_secs")]
    pub motion_fallback_secs: u64,

    /// Blink odds per iteration, expressed as 1-in-N
    #[serde(default = "default_blink_one_in")]
    pub blink_one_in: u32,

    /// Pixel-to-angle calibration
    #[serde(default)]
    pub calibration: EyeCalibration,

    /// Actuator serial device path
    #[serde(default = "default_serial_port")]
    pub serial_port: String,

    /// Actuator serial baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

fn default_interval_ms() -> u64 {
    30
}

fn default_motion_fallback_secs() -> u64 {
    3
}

fn default_blink_one_in() -> u32 {
    25
}

fn default_serial_port() -> String {
    "/dev/ttyACM0".to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            motion_fallback_secs: default_motion_fallback_secs(),
            blink_one_in: default_blink_one_in(),
            calibration: EyeCalibration::default(),
            serial_port: default_serial_port(),
            baud_rate: default_baud_rate(),
        }
    }
}
