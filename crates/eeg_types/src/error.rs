use serde::{Deserialize, Serialize};

/// Represents errors that can occur while pulling from a sample source.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum SensorError {
    /// The source delivered samples that do not match its advertised layout.
    #[error("Malformed chunk: {0}")]
    MalformedChunk(String),
    /// A driver-level error.
    #[error("Driver error: {0}")]
    DriverError(String),
}

/// Invalid timing or channel configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("overlap ({overlap}s) must be shorter than the mini-batch ({mini}s)")]
    OverlapTooLong { overlap: f64, mini: f64 },
    #[error("mini-batch ({mini}s) must not exceed the stream batch ({batch}s)")]
    MiniLongerThanBatch { mini: f64, batch: f64 },
    #[error("at least one sensor channel must be selected")]
    NoChannels,
    #[error("duplicate sensor channel: {0}")]
    DuplicateChannel(usize),
    #[error("sample rate {0} Hz is too low for the configured windows")]
    SampleRateTooLow(f64),
    #[error("training windows of {size} vectors cannot overlap by {overlap}")]
    WindowOverlap { size: usize, overlap: usize },
    #[error("feature settings differ: {0}")]
    SettingsMismatch(String),
}
