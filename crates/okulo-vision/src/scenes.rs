//! Expression scenes: eyelid poses, blinks, and the wake-up choreography
//!
//! Poses carry six angles: yaw, pitch, then the four eyelid servos
//! (top-left, bottom-left, top-right, bottom-right).

use crate::actuator::{ActuatorCommand, ActuatorGateway};
use crate::error::Result;
use std::time::Duration;

/// Eyelid angles for open eyes
pub const LIDS_OPEN: [i32; 4] = [100, 70, 80, 110];

/// Eyelid angles for closed eyes
pub const LIDS_CLOSED: [i32; 4] = [60, 120, 120, 70];

/// Centered gaze angles
pub const GAZE_CENTER: (i32, i32) = (90, 90);

/// Open-eye pose looking at (yaw, pitch)
#[must_use]
pub fn eyes_open(yaw: i32, pitch: i32) -> ActuatorCommand {
    pose(yaw, pitch, LIDS_OPEN)
}

/// Closed-eye pose holding (yaw, pitch)
#[must_use]
pub fn eyes_closed(yaw: i32, pitch: i32) -> ActuatorCommand {
    pose(yaw, pitch, LIDS_CLOSED)
}

/// Resting pose: eyes closed, gaze centered
#[must_use]
pub fn sleep_pose() -> ActuatorCommand {
    eyes_closed(GAZE_CENTER.0, GAZE_CENTER.1)
}

fn pose(yaw: i32, pitch: i32, lids: [i32; 4]) -> ActuatorCommand {
    let mut angles = vec![yaw, pitch];
    angles.extend_from_slice(&lids);
    ActuatorCommand::new(angles)
}

/// One step of a choreographed scene
#[derive(Debug, Clone)]
pub struct Keyframe {
    /// Pose to send
    pub command: ActuatorCommand,
    /// How long to hold it before the next keyframe
    pub hold: Duration,
}

impl Keyframe {
    fn new(command: ActuatorCommand, hold_ms: u64) -> Self {
        Self {
            command,
            hold: Duration::from_millis(hold_ms),
        }
    }
}

/// The wake-up choreography: a drowsy sequence of slow and quick blinks
/// with glances left and right, ending centered with eyes open.
#[must_use]
pub fn wakeup_scene() -> Vec<Keyframe> {
    let ahead = GAZE_CENTER.0;
    let aside = 120;
    let other = 50;
    let pitch = GAZE_CENTER.1;

    vec![
        Keyframe::new(eyes_open(ahead, pitch), 500),
        Keyframe::new(eyes_closed(ahead, pitch), 100),
        Keyframe::new(eyes_open(ahead, pitch), 500),
        Keyframe::new(eyes_closed(ahead, pitch), 100),
        Keyframe::new(eyes_open(ahead, pitch), 100),
        Keyframe::new(eyes_closed(ahead, pitch), 100),
        Keyframe::new(eyes_open(ahead, pitch), 300),
        Keyframe::new(eyes_open(aside, pitch), 100),
        Keyframe::new(eyes_closed(aside, pitch), 100),
        Keyframe::new(eyes_open(aside, pitch), 900),
        Keyframe::new(eyes_closed(aside, pitch), 100),
        Keyframe::new(eyes_open(other, pitch), 200),
        Keyframe::new(eyes_closed(other, pitch), 100),
        Keyframe::new(eyes_open(other, pitch), 100),
        Keyframe::new(eyes_closed(other, pitch), 100),
        Keyframe::new(eyes_open(ahead, pitch), 0),
    ]
}

/// A quick blink holding the current gaze
#[must_use]
pub fn blink_scene(yaw: i32, pitch: i32) -> Vec<Keyframe> {
    vec![
        Keyframe::new(eyes_closed(yaw, pitch), 100),
        Keyframe::new(eyes_open(yaw, pitch), 0),
    ]
}

/// Play a scene through the gateway, holding each keyframe for its duration
pub async fn play(gateway: &mut ActuatorGateway, scene: &[Keyframe]) -> Result<()> {
    for keyframe in scene {
        gateway.send(&keyframe.command)?;
        if !keyframe.hold.is_zero() {
            tokio::time::sleep(keyframe.hold).await;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::test_support::RecordingTransport;

    #[test]
    fn test_poses() {
        assert_eq!(eyes_open(90, 90).angles(), &[90, 90, 100, 70, 80, 110]);
        assert_eq!(eyes_closed(50, 90).angles(), &[50, 90, 60, 120, 120, 70]);
        assert_eq!(sleep_pose().angles(), &[90, 90, 60, 120, 120, 70]);
    }

    #[test]
    fn test_wakeup_scene_shape() {
        let scene = wakeup_scene();
        assert_eq!(scene.len(), 16);
        // Starts and ends centered with eyes open.
        assert_eq!(scene.first().unwrap().command, eyes_open(90, 90));
        assert_eq!(scene.last().unwrap().command, eyes_open(90, 90));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blink_writes_close_then_open() {
        let transport = RecordingTransport::default();
        let frames = transport.frames.clone();
        let mut gateway = ActuatorGateway::new(Box::new(transport));

        play(&mut gateway, &blink_scene(100, 85)).await.unwrap();

        let frames = frames.lock().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], b"100,85,60,120,120,70\n");
        assert_eq!(frames[1], b"100,85,100,70,80,110\n");
    }
}
