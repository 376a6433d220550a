//! Host side of the Arduino "prototype" sketch protocol.
//!
//! Every command is a single ASCII string `@<cmd>%<arg>%<arg>$!`. Negative pin
//! numbers select the "off" variant of a command (INPUT for `pm`, LOW for
//! `dw`). The board only answers queries such as `version`, one line each.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{SerialPort, SerialPortType};
use tracing::{debug, info, warn};

use crate::error::{BoardError, BoardResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    PinMode { pin: u8, mode: PinMode },
    DigitalWrite { pin: u8, level: Level },
    AnalogWrite { pin: u8, value: i32 },
    Version,
}

impl Command {
    pub fn encode(&self) -> String {
        match *self {
            Command::PinMode { pin, mode } => {
                let arg = match mode {
                    PinMode::Output => i32::from(pin),
                    PinMode::Input => -i32::from(pin),
                };
                format!("@pm%{}$!", arg)
            }
            Command::DigitalWrite { pin, level } => {
                let arg = match level {
                    Level::High => i32::from(pin),
                    Level::Low => -i32::from(pin),
                };
                format!("@dw%{}$!", arg)
            }
            Command::AnalogWrite { pin, value } => {
                format!("@aw%{}%{}$!", pin, value.clamp(0, 255))
            }
            Command::Version => "@version%$!".to_string(),
        }
    }
}

/// Byte transport to a board.
pub trait SerialLink {
    fn send(&mut self, bytes: &[u8]) -> BoardResult<()>;

    /// One reply line without its terminator, or `None` if nothing arrived
    /// before the link's read timeout.
    fn read_line(&mut self) -> BoardResult<Option<String>>;
}

/// [`SerialLink`] over a host serial port.
pub struct SerialPortLink {
    port: Box<dyn SerialPort>,
}

impl SerialPortLink {
    pub fn open(port_name: &str, baud_rate: u32, timeout: Duration) -> BoardResult<Self> {
        let port = serialport::new(port_name, baud_rate).timeout(timeout).open()?;
        info!("Opened serial port {} at {} baud", port_name, baud_rate);
        Ok(Self { port })
    }

    /// First USB serial port on the host, falling back to any serial port.
    pub fn find_port() -> BoardResult<String> {
        let ports = serialport::available_ports()?;
        debug!(
            "Available serial ports: {:?}",
            ports.iter().map(|p| &p.port_name).collect::<Vec<_>>()
        );
        ports
            .iter()
            .find(|p| matches!(p.port_type, SerialPortType::UsbPort(_)))
            .or_else(|| ports.first())
            .map(|p| p.port_name.clone())
            .ok_or(BoardError::PortNotFound)
    }
}

impl SerialLink for SerialPortLink {
    fn send(&mut self, bytes: &[u8]) -> BoardResult<()> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> BoardResult<Option<String>> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) if byte[0] == b'\n' => break,
                Ok(_) => line.push(byte[0]),
                Err(e) if e.kind() == ErrorKind::TimedOut => break,
                Err(e) => return Err(e.into()),
            }
        }
        if line.is_empty() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&line).trim_end_matches('\r').to_string()))
    }
}

/// An Arduino running the prototype sketch.
pub struct Arduino<L: SerialLink> {
    link: L,
    version: Option<String>,
}

impl<L: SerialLink> Arduino<L> {
    /// Wraps `link` and asks the board for its sketch version. A silent board
    /// is only a warning, commands may still get through.
    pub fn new(mut link: L) -> BoardResult<Self> {
        link.send(Command::Version.encode().as_bytes())?;
        let version = link.read_line()?;
        match &version {
            Some(v) => info!("Arduino sketch version {}", v),
            None => warn!("Arduino did not answer the version query"),
        }
        Ok(Self { link, version })
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn send(&mut self, command: Command) -> BoardResult<()> {
        let encoded = command.encode();
        debug!(command = %encoded, "sending");
        self.link.send(encoded.as_bytes())
    }

    pub fn pin_mode(&mut self, pin: u8, mode: PinMode) -> BoardResult<()> {
        self.send(Command::PinMode { pin, mode })
    }

    pub fn digital_write(&mut self, pin: u8, level: Level) -> BoardResult<()> {
        self.send(Command::DigitalWrite { pin, level })
    }

    pub fn analog_write(&mut self, pin: u8, value: i32) -> BoardResult<()> {
        self.send(Command::AnalogWrite { pin, value })
    }
}
