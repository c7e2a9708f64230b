//! Device mode state machine
//!
//! The mode is shared as a single atomic, observed by polling: the
//! attention loop and the capture loop each check it once per iteration,
//! which bounds transition latency by their cadence. The machine is
//! deliberately permissive — any transition succeeds — so external
//! triggers such as a manual toggle can force a state; the valid runtime
//! path is Sleep → WakeUp → Talk → {Talk | Sleep}.

use okulo_vision::ModeProbe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::info;

/// Device operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    /// Passive listening for the wake gate; eyes parked
    Sleep = 0,
    /// Transient acknowledgment state between wake and conversation
    WakeUp = 1,
    /// Active conversation: capture, transcribe, respond
    Talk = 2,
    /// Reserved for externally driven function control
    Func = 3,
}

impl Mode {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::WakeUp,
            2 => Self::Talk,
            3 => Self::Func,
            _ => Self::Sleep,
        }
    }

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sleep => "sleep",
            Self::WakeUp => "wakeup",
            Self::Talk => "talk",
            Self::Func => "func",
        }
    }
}

/// Cloneable handle on the shared mode
#[derive(Debug, Clone)]
pub struct ModeHandle {
    state: Arc<AtomicU8>,
}

impl Default for ModeHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeHandle {
    /// Create a handle starting in Sleep
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(Mode::Sleep as u8)),
        }
    }

    /// The current mode
    #[must_use]
    pub fn current(&self) -> Mode {
        Mode::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Switch to `to`, returning the previous mode. Always succeeds.
    pub fn transition(&self, to: Mode) -> Mode {
        let previous = Mode::from_u8(self.state.swap(to as u8, Ordering::SeqCst));
        if previous != to {
            info!(from = previous.as_str(), to = to.as_str(), "mode transition");
        }
        previous
    }
}

impl ModeProbe for ModeHandle {
    fn is_asleep(&self) -> bool {
        self.current() == Mode::Sleep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_asleep() {
        let mode = ModeHandle::new();
        assert_eq!(mode.current(), Mode::Sleep);
        assert!(mode.is_asleep());
    }

    #[test]
    fn test_transition_returns_previous() {
        let mode = ModeHandle::new();
        assert_eq!(mode.transition(Mode::WakeUp), Mode::Sleep);
        assert_eq!(mode.transition(Mode::Talk), Mode::WakeUp);
        assert_eq!(mode.current(), Mode::Talk);
    }

    #[test]
    fn test_any_transition_allowed() {
        let mode = ModeHandle::new();
        // Permissive machine: a manual toggle can force any state.
        assert_eq!(mode.transition(Mode::Func), Mode::Sleep);
        assert_eq!(mode.transition(Mode::Sleep), Mode::Func);
    }

    #[test]
    fn test_clones_share_state() {
        let mode = ModeHandle::new();
        let other = mode.clone();
        mode.transition(Mode::Talk);
        assert_eq!(other.current(), Mode::Talk);
        assert!(!other.is_asleep());
    }
}
