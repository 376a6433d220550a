//! Lab Streaming Layer inlet.
//!
//! Headset bridges such as muse-lsl publish the raw electrode stream on the
//! local network with content type "EEG". This source resolves the first such
//! stream and pulls samples from it.

use std::time::{Duration, Instant};

use eeg_types::{SensorError, StreamChunk, StreamInfo};
use log::{info, warn};
use lsl::Pullable;

use crate::types::{DriverError, StreamSource, NOT_FOUND_HINT};

/// Seconds of data the inlet buffers before the oldest samples are dropped.
const MAX_BUFFER_S: i32 = 360;

pub struct LslSource {
    info: StreamInfo,
    inlet: lsl::StreamInlet,
}

impl LslSource {
    /// Resolve the first stream whose `type` is `stream_type`.
    pub fn resolve(stream_type: &str, timeout: Duration) -> Result<Self, DriverError> {
        info!("Resolving LSL stream of type '{}'...", stream_type);
        let streams = lsl::resolve_byprop("type", stream_type, 1, timeout.as_secs_f64())
            .map_err(|e| DriverError::Other(format!("LSL resolve failed: {:?}", e)))?;

        // The first stream found wins if multiple are available
        let stream = streams
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::HardwareNotFound(NOT_FOUND_HINT.to_string()))?;

        let inlet = lsl::StreamInlet::new(&stream, MAX_BUFFER_S, 0, true)
            .map_err(|e| DriverError::Other(format!("Failed to open LSL inlet: {:?}", e)))?;

        let info = StreamInfo {
            name: stream.stream_name(),
            stream_type: stream.stream_type(),
            channel_count: stream.channel_count().max(0) as usize,
            sample_rate: stream.nominal_srate(),
        };
        if info.sample_rate <= 0.0 {
            return Err(DriverError::ConfigurationError(format!(
                "stream '{}' has an irregular sample rate",
                info.name
            )));
        }
        info!(
            "Connected to '{}' ({} channels @ {} Hz)",
            info.name, info.channel_count, info.sample_rate
        );

        Ok(Self { info, inlet })
    }
}

impl StreamSource for LslSource {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn pull_chunk(
        &mut self,
        timeout: Duration,
        max_samples: usize,
    ) -> Result<StreamChunk, SensorError> {
        let channels = self.info.channel_count;
        let deadline = Instant::now() + timeout;
        let mut samples = Vec::with_capacity(max_samples * channels);
        let mut timestamps = Vec::with_capacity(max_samples);

        while timestamps.len() < max_samples {
            // Block for the first frame, then drain whatever is already queued
            let wait = if timestamps.is_empty() {
                deadline.saturating_duration_since(Instant::now()).as_secs_f64()
            } else {
                0.0
            };
            let (frame, ts): (Vec<f32>, f64) = self
                .inlet
                .pull_sample(wait)
                .map_err(|e| SensorError::DriverError(format!("{:?}", e)))?;
            // A zero timestamp means nothing arrived within `wait`
            if ts == 0.0 {
                break;
            }
            if frame.len() != channels {
                warn!("Dropping frame with {} values, expected {}", frame.len(), channels);
                return Err(SensorError::MalformedChunk(format!(
                    "frame has {} channels, stream advertises {}",
                    frame.len(),
                    channels
                )));
            }
            samples.extend_from_slice(&frame);
            timestamps.push(ts);
        }

        Ok(StreamChunk::new(samples, timestamps, channels))
    }
}
