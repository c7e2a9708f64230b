//! Frames, detection traits, and the built-in motion detector
//!
//! Face detection is an external collaborator behind [`FaceDetector`];
//! deployments plug in whatever detector their platform provides. Motion
//! detection ships in-crate as a simple frame-difference detector.

use crate::error::Result;

/// A grayscale video frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Row-major luma samples, `width * height` bytes
    pub data: Vec<u8>,
}

impl Frame {
    /// Create a frame from raw luma data
    #[must_use]
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), (width * height) as usize);
        Self {
            width,
            height,
            data,
        }
    }
}

/// A detected face bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    /// Left edge
    pub left: u32,
    /// Top edge
    pub top: u32,
    /// Box width
    pub width: u32,
    /// Box height
    pub height: u32,
}

/// Capability to produce video frames
pub trait VideoSource: Send {
    /// Read the next frame, blocking until one is available
    fn read(&mut self) -> Result<Frame>;
}

/// Capability to find the most prominent face in a frame
pub trait FaceDetector: Send {
    /// Largest detected face, if any
    fn detect(&mut self, frame: &Frame) -> Option<FaceBox>;
}

/// Capability to find a motion centroid in a frame
pub trait MotionDetector: Send {
    /// Centroid of the most significant motion, if above the noise floor
    fn detect(&mut self, frame: &Frame) -> Option<(f32, f32)>;
}

/// Face detector that never detects; for deployments without a face stack
#[derive(Debug, Default)]
pub struct NullFaceDetector;

impl FaceDetector for NullFaceDetector {
    fn detect(&mut self, _frame: &Frame) -> Option<FaceBox> {
        None
    }
}

/// Frame-difference motion detector.
///
/// Compares each frame against the previous one: pixels whose absolute
/// difference exceeds the threshold count as moving, and if enough of them
/// move, their centroid is the motion target.
#[derive(Debug)]
pub struct FrameDiffMotion {
    previous: Option<Frame>,
    threshold: u8,
    min_area: usize,
}

impl Default for FrameDiffMotion {
    fn default() -> Self {
        Self::new(50, 1000)
    }
}

impl FrameDiffMotion {
    /// Create a detector with the given per-pixel threshold and minimum
    /// number of changed pixels
    #[must_use]
    pub fn new(threshold: u8, min_area: usize) -> Self {
        Self {
            previous: None,
            threshold,
            min_area,
        }
    }
}

impl MotionDetector for FrameDiffMotion {
    fn detect(&mut self, frame: &Frame) -> Option<(f32, f32)> {
        let previous = match self.previous.replace(frame.clone()) {
            Some(p) if p.data.len() == frame.data.len() => p,
            _ => return None,
        };

        let mut count = 0usize;
        let mut sum_x = 0u64;
        let mut sum_y = 0u64;
        for y in 0..frame.height {
            let row = (y * frame.width) as usize;
            for x in 0..frame.width {
                let idx = row + x as usize;
                let diff = frame.data[idx].abs_diff(previous.data[idx]);
                if diff > self.threshold {
                    count += 1;
                    sum_x += u64::from(x);
                    sum_y += u64::from(y);
                }
            }
        }

        if count > self.min_area {
            Some((sum_x as f32 / count as f32, sum_y as f32 / count as f32))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(width: u32, height: u32) -> Frame {
        Frame::new(width, height, vec![0; (width * height) as usize])
    }

    fn with_block(width: u32, height: u32, left: u32, top: u32, size: u32) -> Frame {
        let mut frame = blank(width, height);
        for y in top..top + size {
            for x in left..left + size {
                frame.data[(y * width + x) as usize] = 255;
            }
        }
        frame
    }

    #[test]
    fn test_first_frame_yields_nothing() {
        let mut detector = FrameDiffMotion::new(50, 100);
        assert!(detector.detect(&blank(100, 100)).is_none());
    }

    #[test]
    fn test_static_scene_yields_nothing() {
        let mut detector = FrameDiffMotion::new(50, 100);
        let frame = with_block(100, 100, 20, 20, 30);
        detector.detect(&frame);
        assert!(detector.detect(&frame).is_none());
    }

    #[test]
    fn test_moving_block_centroid() {
        let mut detector = FrameDiffMotion::new(50, 100);
        detector.detect(&blank(200, 200));
        // A 40x40 block appears centered at (60, 60).
        let (cx, cy) = detector
            .detect(&with_block(200, 200, 40, 40, 40))
            .expect("motion");
        assert!((cx - 59.5).abs() < 1.0);
        assert!((cy - 59.5).abs() < 1.0);
    }

    #[test]
    fn test_small_change_below_min_area_ignored() {
        let mut detector = FrameDiffMotion::new(50, 100);
        detector.detect(&blank(100, 100));
        assert!(detector.detect(&with_block(100, 100, 10, 10, 5)).is_none());
    }
}
