//! Microcontroller boards driven from the host over a serial link.

pub mod arduino;
pub mod error;
pub mod rover;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use arduino::{Arduino, Command, Level, PinMode, SerialLink, SerialPortLink};
pub use error::{BoardError, BoardResult};
pub use rover::{Direction, Rover, RoverConfig};
