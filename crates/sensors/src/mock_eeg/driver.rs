use std::thread;
use std::time::{Duration, Instant};

use eeg_types::{Band, SensorError, StreamChunk, StreamInfo};
use log::{debug, info};

use super::mock_data_generator::EegGenerator;
use crate::types::{DriverError, StreamSource};

/// Configuration for the synthetic source.
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub sample_rate: f64,
    pub channel_count: usize,
    /// Pace pulls against the wall clock like a real headset. When off, every
    /// pull returns `max_samples` frames immediately.
    pub realtime: bool,
    pub seed: Option<u64>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            sample_rate: 256.0,
            channel_count: 5,
            realtime: true,
            seed: None,
        }
    }
}

/// A source that synthesises EEG instead of reading a headset.
pub struct MockSource {
    info: StreamInfo,
    realtime: bool,
    generator: EegGenerator,
    started: Option<Instant>,
    // Total frames handed out since the first pull
    sample_count: u64,
}

impl MockSource {
    pub fn new(config: MockConfig) -> Result<Self, DriverError> {
        if config.channel_count == 0 {
            return Err(DriverError::ConfigurationError(
                "At least one channel must be configured".to_string(),
            ));
        }
        if !(config.sample_rate > 0.0) {
            return Err(DriverError::ConfigurationError(format!(
                "Invalid sample rate: {}",
                config.sample_rate
            )));
        }

        let info = StreamInfo {
            name: "MockMuse".to_string(),
            stream_type: "EEG".to_string(),
            channel_count: config.channel_count,
            sample_rate: config.sample_rate,
        };
        info!("MockSource created with config: {:?}", config);

        Ok(Self {
            info,
            realtime: config.realtime,
            generator: EegGenerator::new(config.sample_rate, config.channel_count, config.seed),
            started: None,
            sample_count: 0,
        })
    }

    /// See [`EegGenerator::set_emphasis`].
    pub fn set_emphasis(&mut self, band: Option<Band>) {
        debug!("MockSource emphasis set to {:?}", band);
        self.generator.set_emphasis(band);
    }

    /// Frames the wall clock says should exist by now but were not pulled yet.
    fn frames_due(&self, now: Instant) -> u64 {
        let started = self.started.unwrap_or(now);
        let elapsed = now.duration_since(started).as_secs_f64();
        let produced = (elapsed * self.info.sample_rate) as u64;
        produced.saturating_sub(self.sample_count)
    }
}

impl StreamSource for MockSource {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn pull_chunk(
        &mut self,
        timeout: Duration,
        max_samples: usize,
    ) -> Result<StreamChunk, SensorError> {
        let channels = self.info.channel_count;
        if max_samples == 0 {
            return Ok(StreamChunk::empty(channels));
        }

        let frames = if self.realtime {
            let now = Instant::now();
            let started = *self.started.get_or_insert(now);
            let deadline = now + timeout;
            let mut due = self.frames_due(now);
            // Sleep until a full request has accrued or the timeout hits
            while due < max_samples as u64 {
                let needed = (self.sample_count + max_samples as u64) as f64 / self.info.sample_rate;
                let ready_at = started + Duration::from_secs_f64(needed);
                let wake = ready_at.min(deadline);
                let now = Instant::now();
                if wake > now {
                    thread::sleep(wake - now);
                }
                due = self.frames_due(Instant::now());
                if Instant::now() >= deadline {
                    break;
                }
            }
            (due as usize).min(max_samples)
        } else {
            max_samples
        };

        let mut samples = vec![0.0; frames * channels];
        let mut timestamps = Vec::with_capacity(frames);
        for frame in samples.chunks_exact_mut(channels) {
            self.generator.next_frame(frame);
            timestamps.push(self.sample_count as f64 / self.info.sample_rate);
            self.sample_count += 1;
        }

        Ok(StreamChunk::new(samples, timestamps, channels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline(channels: usize) -> MockSource {
        MockSource::new(MockConfig {
            sample_rate: 256.0,
            channel_count: channels,
            realtime: false,
            seed: Some(11),
        })
        .unwrap()
    }

    #[test]
    fn rejects_zero_channels() {
        let result = MockSource::new(MockConfig {
            channel_count: 0,
            ..MockConfig::default()
        });
        assert!(matches!(result, Err(DriverError::ConfigurationError(_))));
    }

    #[test]
    fn offline_pull_returns_requested_frames() {
        let mut source = offline(5);
        let chunk = source.pull_chunk(Duration::from_secs(3), 25).unwrap();
        assert_eq!(chunk.channels, 5);
        assert_eq!(chunk.frames(), 25);
        assert_eq!(chunk.timestamps.len(), 25);
    }

    #[test]
    fn timestamps_continue_across_pulls() {
        let mut source = offline(2);
        let first = source.pull_chunk(Duration::from_secs(1), 4).unwrap();
        let second = source.pull_chunk(Duration::from_secs(1), 4).unwrap();
        let step = 1.0 / 256.0;
        assert!((second.timestamps[0] - first.timestamps[3] - step).abs() < 1e-12);
    }

    #[test]
    fn realtime_pull_respects_timeout() {
        let mut source = MockSource::new(MockConfig {
            realtime: true,
            seed: Some(2),
            ..MockConfig::default()
        })
        .unwrap();
        let start = Instant::now();
        // A full second of data cannot accrue within 50 ms
        let chunk = source.pull_chunk(Duration::from_millis(50), 256).unwrap();
        assert!(start.elapsed() < Duration::from_millis(500));
        assert!(chunk.frames() < 256);
    }
}
