//! Opening the sample source and pulling feature vectors from it

use anyhow::{bail, Context, Result};
use eeg_sensor::raw::{MockConfig, MockSource};
use eeg_sensor::{resolve_stream, StreamSource};
use eeg_types::{Band, BandPowers, StreamInfo};
use pipeline::FeatureExtractor;
use tracing::{info, warn};

use crate::config::AppConfig;

/// Consecutive empty pulls tolerated before the stream is considered lost.
const MAX_EMPTY_PULLS: usize = 5;

/// Band the synthetic headset boosts while each action is recorded, so mock
/// sessions produce separable classes.
const MOCK_ACTION_BANDS: [Band; 5] = [Band::Alpha, Band::Beta, Band::Theta, Band::Gamma, Band::Delta];

pub enum Source {
    Mock(MockSource),
    Live(Box<dyn StreamSource>),
}

impl Source {
    /// The synthetic headset when `mock` is set, otherwise the first stream
    /// of the configured type.
    pub fn open(config: &AppConfig, mock: bool) -> Result<Self> {
        if mock {
            let settings = &config.mock;
            let source = MockSource::new(MockConfig {
                sample_rate: settings.sample_rate,
                channel_count: settings.channel_count,
                realtime: settings.realtime,
                seed: settings.seed,
            })
            .context("Failed to create mock source")?;
            info!("Using mock EEG source");
            return Ok(Source::Mock(source));
        }

        let stream = resolve_stream(&config.stream_type, config.resolve_timeout())
            .context("Failed to open EEG stream")?;
        Ok(Source::Live(stream))
    }

    pub fn info(&self) -> &StreamInfo {
        self.stream().info()
    }

    fn stream(&self) -> &dyn StreamSource {
        match self {
            Source::Mock(source) => source,
            Source::Live(source) => source.as_ref(),
        }
    }

    fn stream_mut(&mut self) -> &mut dyn StreamSource {
        match self {
            Source::Mock(source) => source,
            Source::Live(source) => source.as_mut(),
        }
    }

    /// Lets the mock imitate the operator thinking about `action`. No effect
    /// on a real headset.
    pub fn begin_action(&mut self, action: usize) {
        if let Source::Mock(source) = self {
            source.set_emphasis(Some(MOCK_ACTION_BANDS[action % MOCK_ACTION_BANDS.len()]));
        }
    }

    /// Pulls until the extractor produces the next smoothed vector.
    pub fn next_features(
        &mut self,
        extractor: &mut FeatureExtractor,
        config: &AppConfig,
    ) -> Result<BandPowers> {
        let pull = extractor.samples_per_pull();
        for _ in 0..MAX_EMPTY_PULLS {
            let chunk = self
                .stream_mut()
                .pull_chunk(config.pull_timeout(), pull)
                .context("Failed to pull from EEG stream")?;
            match extractor.process(&chunk)? {
                Some(features) => return Ok(features),
                None => warn!(
                    "No samples within {:.1} s, waiting for the stream",
                    config.pull_timeout_s
                ),
            }
        }
        bail!(
            "EEG stream delivered no samples for {} consecutive pulls",
            MAX_EMPTY_PULLS
        )
    }
}
