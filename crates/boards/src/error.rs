use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("No serial port found. Is the board plugged in via USB?")]
    PortNotFound,

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BoardResult<T> = Result<T, BoardError>;
