//! The attention loop: an independent gaze task
//!
//! Runs on its own cadence, fully isolated from the voice pipeline: a frame
//! read miss, a detector miss, or an actuator write failure is logged and
//! the iteration skipped. The loop polls the mode probe each iteration; in
//! sleep it parks the eyes closed and does no detection work, and on waking
//! it plays the wake-up choreography before tracking resumes.

use crate::actuator::ActuatorGateway;
use crate::config::{EyeCalibration, VisionConfig};
use crate::detect::{FaceDetector, MotionDetector, VideoSource};
use crate::focus::FocusTracker;
use crate::scenes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Observation of the device mode, polled once per iteration
pub trait ModeProbe: Send {
    /// True while the device is in sleep mode
    fn is_asleep(&self) -> bool;
}

/// The gaze task: detection, smoothing, calibration, blinks
pub struct AttentionLoop {
    video: Box<dyn VideoSource>,
    faces: Box<dyn FaceDetector>,
    motion: Box<dyn MotionDetector>,
    gateway: ActuatorGateway,
    mode: Box<dyn ModeProbe>,
    tracker: FocusTracker,
    calibration: EyeCalibration,
    interval: Duration,
    motion_fallback: Duration,
    blink_one_in: u32,
    rng: StdRng,
}

impl AttentionLoop {
    /// Assemble the loop from its collaborators
    #[must_use]
    pub fn new(
        config: &VisionConfig,
        video: Box<dyn VideoSource>,
        faces: Box<dyn FaceDetector>,
        motion: Box<dyn MotionDetector>,
        gateway: ActuatorGateway,
        mode: Box<dyn ModeProbe>,
    ) -> Self {
        Self {
            video,
            faces,
            motion,
            gateway,
            mode,
            tracker: FocusTracker::new(),
            calibration: config.calibration,
            interval: Duration::from_millis(config.interval_ms),
            motion_fallback: Duration::from_secs(config.motion_fallback_secs),
            blink_one_in: config.blink_one_in.max(1),
            rng: StdRng::from_entropy(),
        }
    }

    /// Run until cancelled. Never returns an error: every per-iteration
    /// failure is logged and skipped.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(interval_ms = self.interval.as_millis() as u64, "attention loop started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut asleep = false;
        let mut last_face_at = Instant::now();

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if self.mode.is_asleep() {
                if !asleep {
                    asleep = true;
                    if let Err(e) = self.gateway.send(&scenes::sleep_pose()) {
                        debug!(error = %e, "sleep pose write failed");
                    }
                }
                continue;
            }
            if asleep {
                asleep = false;
                if let Err(e) = scenes::play(&mut self.gateway, &scenes::wakeup_scene()).await {
                    warn!(error = %e, "wakeup scene failed");
                }
                last_face_at = Instant::now();
            }

            let frame = match self.video.read() {
                Ok(frame) => frame,
                Err(e) => {
                    debug!(error = %e, "frame read failed");
                    continue;
                }
            };

            let focused = if let Some(face) = self.faces.detect(&frame) {
                last_face_at = Instant::now();
                Some(self.tracker.observe_face(&face))
            } else if last_face_at.elapsed() >= self.motion_fallback {
                self.motion
                    .detect(&frame)
                    .map(|(x, y)| self.tracker.observe_motion(x, y))
            } else {
                None
            };

            if let Some(point) = focused {
                let (yaw, pitch) = self.calibration.angles(point);
                if let Err(e) = self.gateway.send(&scenes::eyes_open(yaw, pitch)) {
                    debug!(error = %e, "tracking write failed");
                }
            }

            // Blink at the current gaze; the tracked focus point is untouched.
            if self.rng.gen_range(0..self.blink_one_in) == 0 {
                let (yaw, pitch) = self.calibration.angles(self.tracker.current());
                if let Err(e) = scenes::play(&mut self.gateway, &scenes::blink_scene(yaw, pitch)).await
                {
                    debug!(error = %e, "blink failed");
                }
            }
        }

        let _ = self.gateway.send(&scenes::sleep_pose());
        info!("attention loop stopped");
    }
}
