//! Okulo Core - device mode machine, configuration and orchestration
//!
//! This crate ties the audio and language crates together:
//! - Mode: the shared Sleep/WakeUp/Talk/Func state machine
//! - Config: the TOML-backed top-level configuration
//! - Orchestrator: the listen / transcribe / respond loop

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod mode;
pub mod orchestrator;

pub use config::OkuloConfig;
pub use error::{Error, Result};
pub use mode::{Mode, ModeHandle};
pub use orchestrator::{CuePlayer, Orchestrator};
