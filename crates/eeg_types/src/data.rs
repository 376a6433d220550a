use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::FeatureConfig;
use crate::error::ConfigError;

/// Number of canonical EEG bands a band-power vector carries.
pub const NUM_BANDS: usize = 5;

/// Canonical EEG frequency bands, lowest first.
///
/// Delta is associated with the unconscious brain, Gamma with active
/// cognitive processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    Delta,
    Theta,
    Alpha,
    Beta,
    Gamma,
}

impl Band {
    pub const ALL: [Band; NUM_BANDS] = [
        Band::Delta,
        Band::Theta,
        Band::Alpha,
        Band::Beta,
        Band::Gamma,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Band::Delta => "delta",
            Band::Theta => "theta",
            Band::Alpha => "alpha",
            Band::Beta => "beta",
            Band::Gamma => "gamma",
        }
    }

    /// Position of this band inside a [`BandPowers`] vector.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// One power value per [`Band`], in `Band::ALL` order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandPowers(pub [f32; NUM_BANDS]);

impl BandPowers {
    pub fn get(&self, band: Band) -> f32 {
        self.0[band.index()]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Band with the largest value.
    pub fn dominant(&self) -> Band {
        let mut best = Band::Delta;
        for band in Band::ALL {
            if self.get(band) > self.get(best) {
                best = band;
            }
        }
        best
    }
}

/// Description of a resolved sample stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub name: String,
    /// Content type the stream advertises, e.g. "EEG"
    pub stream_type: String,
    pub channel_count: usize,
    /// Nominal sample rate in Hz
    pub sample_rate: f64,
}

/// Samples returned by one pull from a source.
///
/// `samples` is frame-major: frame `i` occupies
/// `samples[i * channels..(i + 1) * channels]`. A pull that timed out yields an
/// empty chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamChunk {
    pub samples: Vec<f32>,
    /// One timestamp per frame, in seconds on the source clock
    pub timestamps: Vec<f64>,
    pub channels: usize,
}

impl StreamChunk {
    pub fn new(samples: Vec<f32>, timestamps: Vec<f64>, channels: usize) -> Self {
        Self {
            samples,
            timestamps,
            channels,
        }
    }

    pub fn empty(channels: usize) -> Self {
        Self {
            channels,
            ..Self::default()
        }
    }

    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn frame(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.channels)?;
        self.samples.get(start..start + self.channels)
    }

    /// Keeps only `selection` (device channel indices, in the given order).
    /// Returns `None` when a selected channel does not exist.
    pub fn select_channels(&self, selection: &[usize]) -> Option<Vec<f32>> {
        if selection.iter().any(|&c| c >= self.channels) {
            return None;
        }
        let mut out = Vec::with_capacity(self.frames() * selection.len());
        for frame in self.samples.chunks_exact(self.channels) {
            out.extend(selection.iter().map(|&c| frame[c]));
        }
        Some(out)
    }
}

/// Feature timing and stream rate a set of features was computed with.
/// Features from different settings are not comparable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingSettings {
    pub features: FeatureConfig,
    pub sample_rate: f64,
}

impl RecordingSettings {
    /// Fails when features computed under `current` would differ from ours.
    pub fn check_compatible(&self, current: &RecordingSettings) -> Result<(), ConfigError> {
        if (self.sample_rate - current.sample_rate).abs() > 1e-6 {
            return Err(ConfigError::SettingsMismatch(format!(
                "recorded at {} Hz, stream runs at {} Hz",
                self.sample_rate, current.sample_rate
            )));
        }
        if self.features != current.features {
            return Err(ConfigError::SettingsMismatch(format!(
                "recorded with {:?}, configured {:?}",
                self.features, current.features
            )));
        }
        Ok(())
    }
}

/// Smoothed feature vectors recorded per action during a labeled session.
///
/// The action label is the index into `actions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDataset {
    pub recorded_at: DateTime<Utc>,
    /// Sample rate of the stream the features were computed from
    pub sample_rate: f64,
    /// Timing the features were computed with
    pub features: FeatureConfig,
    pub actions: Vec<Vec<BandPowers>>,
}

impl ActionDataset {
    pub fn new(num_actions: usize, sample_rate: f64, features: FeatureConfig) -> Self {
        Self {
            recorded_at: Utc::now(),
            sample_rate,
            features,
            actions: vec![Vec::new(); num_actions],
        }
    }

    pub fn num_actions(&self) -> usize {
        self.actions.len()
    }

    /// Appends a vector to `action`. Returns `false` if the action does not exist.
    pub fn push(&mut self, action: usize, powers: BandPowers) -> bool {
        match self.actions.get_mut(action) {
            Some(vectors) => {
                vectors.push(powers);
                true
            }
            None => false,
        }
    }

    pub fn total_vectors(&self) -> usize {
        self.actions.iter().map(Vec::len).sum()
    }

    pub fn settings(&self) -> RecordingSettings {
        RecordingSettings {
            features: self.features.clone(),
            sample_rate: self.sample_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_channels_keeps_requested_order() {
        let chunk = StreamChunk::new(vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0], vec![0.0, 0.1], 3);
        assert_eq!(chunk.frames(), 2);
        assert_eq!(chunk.select_channels(&[2, 0]), Some(vec![2.0, 0.0, 12.0, 10.0]));
        assert_eq!(chunk.select_channels(&[3]), None);
    }

    #[test]
    fn frame_access_is_bounds_checked() {
        let chunk = StreamChunk::new(vec![1.0, 2.0, 3.0, 4.0], vec![0.0, 0.1], 2);
        assert_eq!(chunk.frame(1), Some(&[3.0, 4.0][..]));
        assert_eq!(chunk.frame(2), None);
        assert!(StreamChunk::empty(4).is_empty());
    }

    #[test]
    fn dominant_band_is_largest_entry() {
        let powers = BandPowers([0.1, 0.4, 2.0, 0.3, 0.0]);
        assert_eq!(powers.dominant(), Band::Alpha);
        assert_eq!(powers.get(Band::Beta), 0.3);
    }

    #[test]
    fn dataset_rejects_unknown_action() {
        let mut dataset = ActionDataset::new(2, 256.0, FeatureConfig::default());
        assert!(dataset.push(1, BandPowers::default()));
        assert!(!dataset.push(2, BandPowers::default()));
        assert_eq!(dataset.total_vectors(), 1);
    }

    #[test]
    fn settings_must_match_to_be_compatible() {
        let recorded = ActionDataset::new(2, 256.0, FeatureConfig::default()).settings();
        assert!(recorded.check_compatible(&recorded.clone()).is_ok());

        let other_rate = RecordingSettings {
            sample_rate: 250.0,
            ..recorded.clone()
        };
        assert!(matches!(
            recorded.check_compatible(&other_rate),
            Err(ConfigError::SettingsMismatch(_))
        ));

        let no_notch = RecordingSettings {
            features: FeatureConfig {
                notch: false,
                ..FeatureConfig::default()
            },
            ..recorded.clone()
        };
        assert!(recorded.check_compatible(&no_notch).is_err());
    }

    #[test]
    fn dataset_survives_json() {
        let mut dataset = ActionDataset::new(1, 256.0, FeatureConfig::default());
        dataset.push(0, BandPowers([1.0, 2.0, 3.0, 4.0, 5.0]));
        let json = serde_json::to_string(&dataset).unwrap();
        let back: ActionDataset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dataset);
    }
}
