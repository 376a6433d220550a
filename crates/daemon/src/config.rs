use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use boards::RoverConfig;
use classifier::TrainingConfig;
use eeg_types::{whole, FeatureConfig};
use serde::{Deserialize, Serialize};

/// Settings for the synthetic headset used with `--mock`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockSettings {
    pub sample_rate: f64,
    pub channel_count: usize,
    /// Deliver samples at the nominal rate instead of as fast as requested
    pub realtime: bool,
    pub seed: Option<u64>,
}

impl Default for MockSettings {
    fn default() -> Self {
        Self {
            sample_rate: 256.0,
            channel_count: 5,
            realtime: true,
            seed: None,
        }
    }
}

/// Top-level configuration. Every field has a default, so a config file only
/// needs the values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub features: FeatureConfig,
    /// Recording time per action, in seconds
    pub record_seconds: f64,
    /// Content type of the stream to resolve
    pub stream_type: String,
    pub resolve_timeout_s: f64,
    pub pull_timeout_s: f64,
    pub training: TrainingConfig,
    pub rover: RoverConfig,
    pub mock: MockSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            features: FeatureConfig::default(),
            record_seconds: 60.0,
            stream_type: "EEG".to_string(),
            resolve_timeout_s: 10.0,
            pull_timeout_s: 3.0,
            training: TrainingConfig::default(),
            rover: RoverConfig::default(),
            mock: MockSettings::default(),
        }
    }
}

impl AppConfig {
    /// Reads a JSON config, or returns the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Could not read configuration file at '{}'", path.display()))?;
                serde_json::from_str(&contents)
                    .with_context(|| format!("Could not parse configuration file at '{}'", path.display()))?
            }
            None => AppConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.features.validate()?;
        self.training.validate()?;
        ensure!(
            self.record_seconds > 0.0,
            "record_seconds must be positive, got {}",
            self.record_seconds
        );
        ensure!(
            self.resolve_timeout_s > 0.0 && self.pull_timeout_s > 0.0,
            "timeouts must be positive"
        );
        Ok(())
    }

    /// Smoothed vectors recorded for each action.
    pub fn steps_per_action(&self) -> usize {
        whole(self.record_seconds / self.features.shift_length_s())
    }

    pub fn pull_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.pull_timeout_s)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.resolve_timeout_s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_recording_sessions() {
        let config = AppConfig::default();
        assert_eq!(config.steps_per_action(), 600);
        assert_eq!(config.pull_timeout(), Duration::from_secs(3));
        assert_eq!(config.resolve_timeout(), Duration::from_secs(10));
        assert_eq!(config.stream_type, "EEG");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "record_seconds": 5, "features": {{ "sensor_channels": [1, 2] }}, "rover": {{ "port": "/dev/ttyACM0" }} }}"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.record_seconds, 5.0);
        assert_eq!(config.features.sensor_channels, vec![1, 2]);
        assert_eq!(config.features.mini_length_s, 1.0);
        assert_eq!(config.rover.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(config.rover.baud, 9600);
        assert_eq!(config.training.epochs, 100);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "features": {{ "overlap_s": 2.0 }} }}"#).unwrap();
        assert!(AppConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(AppConfig::load(Some(Path::new("/definitely/not/here.json"))).is_err());
    }
}
