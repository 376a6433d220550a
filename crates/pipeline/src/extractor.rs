use eeg_types::{BandPowers, FeatureConfig, StreamChunk, StreamInfo};
use tracing::{debug, info};

use crate::error::{PipelineError, PipelineResult};
use crate::smoothing::SmoothingBuffer;
use crate::stages::band_power::BandPowerEstimator;
use crate::stream_buffer::StreamBuffer;

/// Turns raw chunks from a source into smoothed band-power vectors.
///
/// Each call to [`FeatureExtractor::process`] runs one step of the pipeline:
/// select channels, roll them into the stream buffer, estimate band powers on
/// the newest mini-batch and push the estimate through the smoothing buffer.
pub struct FeatureExtractor {
    config: FeatureConfig,
    source_channels: usize,
    sample_rate: f64,
    buffer: StreamBuffer,
    estimator: BandPowerEstimator,
    smoothing: SmoothingBuffer,
}

impl FeatureExtractor {
    pub fn new(config: &FeatureConfig, stream: &StreamInfo) -> PipelineResult<Self> {
        let sample_rate = stream.sample_rate;
        config.validate_for_rate(sample_rate)?;

        if let Some(&channel) = config
            .sensor_channels
            .iter()
            .find(|&&c| c >= stream.channel_count)
        {
            return Err(PipelineError::MissingChannel {
                channel,
                available: stream.channel_count,
            });
        }

        let channels = config.sensor_channels.len();
        let batch_frames = config.stream_batch_frames(sample_rate);
        let mini_frames = config.mini_batch_frames(sample_rate);

        let buffer = if config.notch {
            StreamBuffer::with_notch(batch_frames, channels, sample_rate as f32, config.notch_hz)?
        } else {
            StreamBuffer::new(batch_frames, channels)?
        };
        let estimator = BandPowerEstimator::new(mini_frames, channels, sample_rate)?;
        let smoothing = SmoothingBuffer::new(config.smoothing_depth())?;

        info!(
            stream = %stream.name,
            sample_rate,
            channels = ?config.sensor_channels,
            batch_frames,
            mini_frames,
            smoothing_depth = smoothing.depth(),
            notch = config.notch,
            "feature extractor ready"
        );

        Ok(Self {
            config: config.clone(),
            source_channels: stream.channel_count,
            sample_rate,
            buffer,
            estimator,
            smoothing,
        })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Frames to request from the source on each pull.
    pub fn samples_per_pull(&self) -> usize {
        self.config.samples_per_pull(self.sample_rate)
    }

    /// Feed one chunk. Returns `None` when the chunk carried no frames.
    pub fn process(&mut self, chunk: &StreamChunk) -> PipelineResult<Option<BandPowers>> {
        if chunk.channels != self.source_channels {
            return Err(PipelineError::ChannelMismatch {
                expected: self.source_channels,
                got: chunk.channels,
            });
        }
        if chunk.is_empty() {
            return Ok(None);
        }

        let selected = chunk
            .select_channels(&self.config.sensor_channels)
            .ok_or(PipelineError::ChannelMismatch {
                expected: self.source_channels,
                got: chunk.channels,
            })?;
        self.buffer.update(&selected)?;

        let mini = self.buffer.last(self.estimator.frames())?;
        let powers = self.estimator.estimate(mini)?;
        self.smoothing.push(powers);

        let smoothed = self.smoothing.mean();
        debug!(frames = chunk.frames(), ?smoothed, "processed chunk");
        Ok(Some(smoothed))
    }
}
