//! Timing configuration shared by recording, training and inference.
//!
//! Every buffer in the feature pipeline is sized from these few durations, so
//! recording and inference must agree on them for a trained model to make
//! sense. The profile written by a recording session carries a copy.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Guards the truncating conversions below against values such as
/// `1.0 / (1.0 - 0.9) == 9.999999999999998`-style representation error.
const TRUNCATION_EPSILON: f64 = 1e-9;

/// Truncates like an integer cast, tolerating float representation error.
pub fn whole(value: f64) -> usize {
    if value <= 0.0 {
        return 0;
    }
    (value + TRUNCATION_EPSILON).floor() as usize
}

/// Durations and channel selection for the streaming feature pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Length of the rolling raw-sample window, in seconds
    pub batch_length_s: f64,
    /// Length of the window one band-power estimate is computed from, in seconds
    pub mini_length_s: f64,
    /// Overlap between consecutive mini-batches, in seconds
    pub overlap_s: f64,
    /// Device channels fed into the pipeline. On a Muse 2, 0..=3 are the scalp
    /// electrodes (left-most first) and 4 is AUX.
    pub sensor_channels: Vec<usize>,
    /// Apply the powerline notch while filling the stream buffer
    pub notch: bool,
    /// Powerline frequency in Hz
    pub notch_hz: f32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            batch_length_s: 5.0,
            mini_length_s: 1.0,
            overlap_s: 0.9,
            sensor_channels: vec![0, 1, 2, 3],
            notch: true,
            notch_hz: 60.0,
        }
    }
}

impl FeatureConfig {
    /// Amount of new data between two consecutive mini-batches, in seconds.
    pub fn shift_length_s(&self) -> f64 {
        self.mini_length_s - self.overlap_s
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("batch_length_s", self.batch_length_s),
            ("mini_length_s", self.mini_length_s),
            ("notch_hz", self.notch_hz as f64),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        if self.overlap_s < 0.0 {
            return Err(ConfigError::NotPositive {
                field: "overlap_s",
                value: self.overlap_s,
            });
        }
        if self.overlap_s >= self.mini_length_s {
            return Err(ConfigError::OverlapTooLong {
                overlap: self.overlap_s,
                mini: self.mini_length_s,
            });
        }
        if self.mini_length_s > self.batch_length_s {
            return Err(ConfigError::MiniLongerThanBatch {
                mini: self.mini_length_s,
                batch: self.batch_length_s,
            });
        }
        if self.sensor_channels.is_empty() {
            return Err(ConfigError::NoChannels);
        }
        let mut seen = std::collections::HashSet::new();
        for &channel in &self.sensor_channels {
            if !seen.insert(channel) {
                return Err(ConfigError::DuplicateChannel(channel));
            }
        }
        // Recorded profiles must be sliceable into training windows
        let (size, overlap) = (self.sequence_length(), self.chunk_overlap());
        if size == 0 || overlap >= size {
            return Err(ConfigError::WindowOverlap { size, overlap });
        }
        Ok(())
    }

    /// Checks that every derived size is non-zero at the given sample rate.
    pub fn validate_for_rate(&self, sample_rate: f64) -> Result<(), ConfigError> {
        self.validate()?;
        if self.samples_per_pull(sample_rate) == 0 || self.mini_batch_frames(sample_rate) < 2 {
            return Err(ConfigError::SampleRateTooLow(sample_rate));
        }
        Ok(())
    }

    /// Frames held by the rolling stream buffer.
    pub fn stream_batch_frames(&self, sample_rate: f64) -> usize {
        whole(sample_rate * self.batch_length_s)
    }

    /// Frames in one mini-batch handed to the band-power estimator.
    pub fn mini_batch_frames(&self, sample_rate: f64) -> usize {
        whole(sample_rate * self.mini_length_s)
    }

    /// Maximum samples requested from the source per pull.
    pub fn samples_per_pull(&self, sample_rate: f64) -> usize {
        whole(sample_rate * self.shift_length_s())
    }

    /// Number of band-power estimates averaged by the smoothing buffer.
    pub fn smoothing_depth(&self) -> usize {
        whole((self.batch_length_s - self.mini_length_s) / self.shift_length_s() + 1.0)
    }

    /// Smoothed vectors per classifier input sequence.
    pub fn sequence_length(&self) -> usize {
        whole(self.mini_length_s / self.shift_length_s())
    }

    /// Vectors shared by two consecutive training windows.
    pub fn chunk_overlap(&self) -> usize {
        whole(self.overlap_s * self.sequence_length() as f64)
    }
}
