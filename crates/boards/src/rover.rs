//! Two-motor rover on an Elegoo SmartCar shield.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::arduino::{Arduino, Level, PinMode, SerialLink, SerialPortLink};
use crate::error::BoardResult;

/// Enables motor control.
pub const PIN_STBY: u8 = 3;
/// Motor A speed (PWM).
pub const PIN_PWMA: u8 = 5;
/// Motor B speed (PWM).
pub const PIN_PWMB: u8 = 6;
/// Motor B direction.
pub const PIN_BIN1: u8 = 7;
/// Motor A direction.
pub const PIN_AIN1: u8 = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoverConfig {
    /// Serial port of the board. Auto-detected when unset.
    pub port: Option<String>,
    pub baud: u32,
    /// PWM duty written to both motors, 0..=255
    pub speed: i32,
    /// Pause after opening the port while the board resets
    pub settle_ms: u64,
    pub read_timeout_ms: u64,
}

impl Default for RoverConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud: 9600,
            speed: 100,
            settle_ms: 2000,
            read_timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    Brake,
}

impl Direction {
    /// Maps a classifier output to a movement. Classes past the first two
    /// all stop the rover.
    pub fn from_class(class: usize) -> Self {
        match class {
            0 => Direction::Forward,
            1 => Direction::Backward,
            _ => Direction::Brake,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::Forward => "Forward",
            Direction::Backward => "Backward",
            Direction::Brake => "Stop",
        }
    }
}

pub struct Rover<L: SerialLink = SerialPortLink> {
    board: Arduino<L>,
    speed: i32,
}

impl Rover<SerialPortLink> {
    /// Opens the serial port (auto-detecting it if needed) and sets up the shield.
    pub fn connect(config: &RoverConfig) -> BoardResult<Self> {
        let port = match &config.port {
            Some(port) => port.clone(),
            None => SerialPortLink::find_port()?,
        };
        let link = SerialPortLink::open(
            &port,
            config.baud,
            Duration::from_millis(config.read_timeout_ms),
        )?;
        // Opening the port resets the Uno
        thread::sleep(Duration::from_millis(config.settle_ms));
        Self::with_link(link, config.speed)
    }
}

impl<L: SerialLink> Rover<L> {
    pub fn with_link(link: L, speed: i32) -> BoardResult<Self> {
        let mut board = Arduino::new(link)?;
        for pin in [PIN_PWMA, PIN_PWMB, PIN_AIN1, PIN_BIN1] {
            board.pin_mode(pin, PinMode::Output)?;
        }
        board.analog_write(PIN_PWMA, speed)?;
        board.analog_write(PIN_PWMB, speed)?;
        info!("Rover ready at speed {}", speed);
        Ok(Self { board, speed })
    }

    pub fn speed(&self) -> i32 {
        self.speed
    }

    pub fn board(&self) -> &Arduino<L> {
        &self.board
    }

    pub fn move_in(&mut self, direction: Direction) -> BoardResult<()> {
        match direction {
            Direction::Brake => self.board.digital_write(PIN_STBY, Level::Low),
            Direction::Forward | Direction::Backward => {
                let level = if direction == Direction::Forward {
                    Level::High
                } else {
                    Level::Low
                };
                self.board.digital_write(PIN_STBY, Level::High)?;
                self.board.digital_write(PIN_AIN1, level)?;
                self.board.digital_write(PIN_BIN1, level)
            }
        }
    }

    /// Forward, backward, then brake, holding each move for `pause`.
    pub fn self_test(&mut self, pause: Duration) -> BoardResult<()> {
        for direction in [Direction::Forward, Direction::Backward, Direction::Brake] {
            info!("Self-test: {}", direction.label());
            self.move_in(direction)?;
            thread::sleep(pause);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingLink;

    fn rover() -> Rover<RecordingLink> {
        Rover::with_link(RecordingLink::default(), 100).unwrap()
    }

    fn sent_after_setup(rover: &Rover<RecordingLink>) -> Vec<String> {
        // Version query, four pin modes, two speeds
        rover.board().link().sent[7..].to_vec()
    }

    #[test]
    fn setup_configures_pins_and_speed() {
        let rover = rover();
        assert_eq!(
            rover.board().link().sent,
            vec![
                "@version%$!",
                "@pm%5$!",
                "@pm%6$!",
                "@pm%8$!",
                "@pm%7$!",
                "@aw%5%100$!",
                "@aw%6%100$!",
            ]
        );
    }

    #[test]
    fn moves_write_documented_pins() {
        let mut rover = rover();
        rover.move_in(Direction::Forward).unwrap();
        assert_eq!(sent_after_setup(&rover), vec!["@dw%3$!", "@dw%8$!", "@dw%7$!"]);

        let mut rover = self::rover();
        rover.move_in(Direction::Backward).unwrap();
        assert_eq!(sent_after_setup(&rover), vec!["@dw%3$!", "@dw%-8$!", "@dw%-7$!"]);

        let mut rover = self::rover();
        rover.move_in(Direction::Brake).unwrap();
        assert_eq!(sent_after_setup(&rover), vec!["@dw%-3$!"]);
    }

    #[test]
    fn class_mapping() {
        assert_eq!(Direction::from_class(0), Direction::Forward);
        assert_eq!(Direction::from_class(1), Direction::Backward);
        assert_eq!(Direction::from_class(2), Direction::Brake);
        assert_eq!(Direction::from_class(7), Direction::Brake);
        assert_eq!(Direction::from_class(2).label(), "Stop");
    }

    #[test]
    fn self_test_runs_all_moves() {
        let mut rover = rover();
        rover.self_test(Duration::ZERO).unwrap();
        assert_eq!(sent_after_setup(&rover).len(), 3 + 3 + 1);
        assert_eq!(sent_after_setup(&rover).last().unwrap(), "@dw%-3$!");
    }
}
