//! Common types and traits for sample sources

use std::time::Duration;

use eeg_types::{SensorError, StreamChunk, StreamInfo};
use thiserror::Error;

/// Errors that can occur while discovering or opening a source
#[derive(Error, Debug, Clone)]
pub enum DriverError {
    /// A sensor-specific error.
    #[error("Sensor error: {0}")]
    SensorError(#[from] SensorError),
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    /// No stream of the requested type showed up before the timeout
    #[error("Hardware not found: {0}")]
    HardwareNotFound(String),
    /// The binary was built without support for this source
    #[error("Unsupported source: {0}")]
    Unsupported(String),
    /// Generic error
    #[error("Error: {0}")]
    Other(String),
}

/// Trait that all sample sources must implement
pub trait StreamSource: Send + 'static {
    /// Layout and nominal rate of the stream.
    fn info(&self) -> &StreamInfo;

    /// Pull up to `max_samples` frames.
    ///
    /// Blocks until at least one frame is available or `timeout` elapses, in
    /// which case an empty chunk is returned.
    fn pull_chunk(
        &mut self,
        timeout: Duration,
        max_samples: usize,
    ) -> Result<StreamChunk, SensorError>;
}

/// Message shown to the operator when no headset stream can be found.
pub const NOT_FOUND_HINT: &str =
    "No EEG stream found.\nPlease ensure bluetooth is enabled and the device is turned on.";

/// Discover the first LSL stream of `stream_type` and open it.
pub fn resolve_stream(
    stream_type: &str,
    timeout: Duration,
) -> Result<Box<dyn StreamSource>, DriverError> {
    #[cfg(feature = "lsl")]
    {
        let inlet = crate::lsl_inlet::LslSource::resolve(stream_type, timeout)?;
        Ok(Box::new(inlet))
    }
    #[cfg(not(feature = "lsl"))]
    {
        let _ = (stream_type, timeout);
        Err(DriverError::Unsupported(
            "built without the `lsl` feature; rebuild with --features lsl or use the mock source"
                .to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "lsl"))]
    #[test]
    fn lsl_requires_feature() {
        let err = resolve_stream("EEG", Duration::from_millis(10))
            .err()
            .unwrap();
        assert!(matches!(err, DriverError::Unsupported(_)));
        assert!(err.to_string().contains("lsl"));
    }

    #[test]
    fn not_found_hint_names_bluetooth() {
        let err = DriverError::HardwareNotFound(NOT_FOUND_HINT.to_string());
        assert!(err.to_string().contains("Please ensure bluetooth is enabled"));
    }
}
