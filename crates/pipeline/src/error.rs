//! Error types for the feature pipeline

use eeg_types::{Band, ConfigError};
use thiserror::Error;

/// Pipeline-specific error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Chunk has {got} channels, expected {expected}")]
    ChannelMismatch { expected: usize, got: usize },

    #[error("Sensor channel {channel} not available, stream has {available}")]
    MissingChannel { channel: usize, available: usize },

    #[error("Block of {len} values is not a whole number of {channels}-channel frames")]
    RaggedBlock { len: usize, channels: usize },

    #[error("Requested {requested} frames but the buffer holds {capacity}")]
    WindowTooLarge { requested: usize, capacity: usize },

    #[error("Invalid window: {message}")]
    InvalidWindow { message: String },

    #[error("No spectral bins fall inside the {} band", .0.name())]
    EmptyBand(Band),

    #[error("Filter error: {0}")]
    Filter(String),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
