//! Gaze target tracking and smoothing
//!
//! The focus point is the current gaze target in frame-pixel space. Small
//! movements are damped to keep the eyes from jittering; a large jump (a
//! different person entering the frame) snaps immediately.

use crate::detect::FaceBox;
use std::collections::VecDeque;

/// Squared pixel distance below which smoothing applies instead of snapping
pub const SNAP_SQ_DIST: f32 = 10_000.0;

/// Exponential smoothing factor for small movements
pub const SMOOTHING_FACTOR: f32 = 0.4;

/// Motion centroids averaged for the fallback target
const MOTION_HISTORY: usize = 3;

/// A gaze target in frame-pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FocusPoint {
    /// Horizontal pixel position
    pub x: f32,
    /// Vertical pixel position
    pub y: f32,
}

/// Tracks and smooths the focus point across detections
#[derive(Debug, Default)]
pub struct FocusTracker {
    point: FocusPoint,
    motion_history: VecDeque<FocusPoint>,
}

impl FocusTracker {
    /// Create a tracker at the origin
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current focus point
    #[must_use]
    pub fn current(&self) -> FocusPoint {
        self.point
    }

    /// Update from a detected face.
    ///
    /// The raw target sits at the horizontal center of the box and a third
    /// of the way down, approximating the eye line rather than the box
    /// center.
    pub fn observe_face(&mut self, face: &FaceBox) -> FocusPoint {
        let target = FocusPoint {
            x: face.left as f32 + face.width as f32 / 2.0,
            y: face.top as f32 + face.height as f32 / 3.0,
        };
        self.update(target)
    }

    /// Update from a motion centroid.
    ///
    /// Motion targets are noisy, so the focus point becomes the average of
    /// the last few centroids instead of going through the face smoothing.
    pub fn observe_motion(&mut self, x: f32, y: f32) -> FocusPoint {
        if self.motion_history.len() == MOTION_HISTORY {
            self.motion_history.pop_front();
        }
        self.motion_history.push_back(FocusPoint { x, y });

        let n = self.motion_history.len() as f32;
        let sum = self
            .motion_history
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        self.point = FocusPoint {
            x: sum.0 / n,
            y: sum.1 / n,
        };
        self.point
    }

    fn update(&mut self, target: FocusPoint) -> FocusPoint {
        let dx = target.x - self.point.x;
        let dy = target.y - self.point.y;

        if dx * dx + dy * dy < SNAP_SQ_DIST {
            self.point = FocusPoint {
                x: self.point.x + dx * SMOOTHING_FACTOR,
                y: self.point.y + dy * SMOOTHING_FACTOR,
            };
        } else {
            self.point = target;
        }
        self.point
    }
}
