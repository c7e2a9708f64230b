//! Actuator commands and the single-writer serial gateway
//!
//! Commands are servo angle vectors encoded as a comma-separated line. All
//! writers (tracking, blinks, expression scenes) funnel through one
//! [`ActuatorGateway`], which owns the transport and suppresses writes that
//! would not visibly move the eyes.

use crate::error::{Error, Result};
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info};

/// A servo angle vector for the eye assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuatorCommand {
    angles: Vec<i32>,
}

impl ActuatorCommand {
    /// Create a command from servo angles
    #[must_use]
    pub fn new(angles: Vec<i32>) -> Self {
        Self { angles }
    }

    /// The angle vector
    #[must_use]
    pub fn angles(&self) -> &[i32] {
        &self.angles
    }

    /// Wire encoding: comma-separated angles terminated by a newline
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let line = self
            .angles
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!("{line}\n").into_bytes()
    }
}

/// Capability to deliver encoded commands to the eye hardware
pub trait ActuatorTransport: Send {
    /// Write one encoded command frame
    fn write_frame(&mut self, data: &[u8]) -> Result<()>;
}

/// Serial-port transport for the eye controller board
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    /// Open the serial device
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .timeout(Duration::from_secs(1))
            .open()
            .map_err(|e| Error::Transport(format!("{path}: {e}")))?;
        info!(path, baud_rate, "actuator serial link open");
        Ok(Self { port })
    }
}

impl ActuatorTransport for SerialTransport {
    fn write_frame(&mut self, data: &[u8]) -> Result<()> {
        self.port
            .write_all(data)
            .map_err(|e| Error::Transport(e.to_string()))
    }
}

/// Deduplicating single-writer funnel in front of the transport.
///
/// A command where every axis differs from the last sent command by less
/// than one unit is a silent no-op. This cuts serial bandwidth and servo
/// wear during smoothed tracking, where consecutive targets round to the
/// same angles.
pub struct ActuatorGateway {
    transport: Box<dyn ActuatorTransport>,
    last_sent: Option<Vec<i32>>,
}

impl ActuatorGateway {
    /// Create a gateway owning the given transport
    #[must_use]
    pub fn new(transport: Box<dyn ActuatorTransport>) -> Self {
        Self {
            transport,
            last_sent: None,
        }
    }

    /// Send a command, skipping the write when it would not move any axis
    pub fn send(&mut self, command: &ActuatorCommand) -> Result<()> {
        if let Some(last) = &self.last_sent {
            let unchanged = last.len() == command.angles.len()
                && last
                    .iter()
                    .zip(&command.angles)
                    .all(|(a, b)| (a - b).abs() < 1);
            if unchanged {
                return Ok(());
            }
        }

        debug!(angles = ?command.angles, "actuator write");
        self.transport.write_frame(&command.encode())?;
        self.last_sent = Some(command.angles.clone());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Transport recording every written frame
    #[derive(Clone, Default)]
    pub struct RecordingTransport {
        pub frames: Arc<Mutex<Vec<Vec<u8>>>>,
        pub fail: bool,
    }

    impl ActuatorTransport for RecordingTransport {
        fn write_frame(&mut self, data: &[u8]) -> Result<()> {
            if self.fail {
                return Err(Error::Transport("disconnected".to_string()));
            }
            self.frames.lock().unwrap().push(data.to_vec());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::RecordingTransport;
    use super::*;

    #[test]
    fn test_encoding() {
        let command = ActuatorCommand::new(vec![90, 90, 100, 70, 80, 110]);
        assert_eq!(command.encode(), b"90,90,100,70,80,110\n");
    }

    #[test]
    fn test_duplicate_command_writes_once() {
        let transport = RecordingTransport::default();
        let frames = transport.frames.clone();
        let mut gateway = ActuatorGateway::new(Box::new(transport));

        let command = ActuatorCommand::new(vec![90, 85]);
        gateway.send(&command).unwrap();
        gateway.send(&command).unwrap();
        assert_eq!(frames.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_one_unit_change_writes_again() {
        let transport = RecordingTransport::default();
        let frames = transport.frames.clone();
        let mut gateway = ActuatorGateway::new(Box::new(transport));

        gateway.send(&ActuatorCommand::new(vec![90, 85])).unwrap();
        gateway.send(&ActuatorCommand::new(vec![91, 85])).unwrap();
        assert_eq!(frames.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_length_change_writes() {
        let transport = RecordingTransport::default();
        let frames = transport.frames.clone();
        let mut gateway = ActuatorGateway::new(Box::new(transport));

        gateway.send(&ActuatorCommand::new(vec![90, 85])).unwrap();
        gateway
            .send(&ActuatorCommand::new(vec![90, 85, 100, 70, 80, 110]))
            .unwrap();
        assert_eq!(frames.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_transport_failure_is_reported() {
        let transport = RecordingTransport {
            fail: true,
            ..Default::default()
        };
        let mut gateway = ActuatorGateway::new(Box::new(transport));
        let err = gateway.send(&ActuatorCommand::new(vec![90, 90])).unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
