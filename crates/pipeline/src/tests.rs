//! Integration tests for the pipeline, driven by the synthetic headset.

use std::time::Duration;

use eeg_sensor::raw::{MockConfig, MockSource};
use eeg_sensor::StreamSource;
use eeg_types::{ActionDataset, Band, BandPowers, FeatureConfig};

use crate::extractor::FeatureExtractor;
use crate::prediction::PredictionBuffer;
use crate::windowing::build_training_set;

fn offline_source(seed: u64) -> MockSource {
    MockSource::new(MockConfig {
        sample_rate: 256.0,
        channel_count: 5,
        realtime: false,
        seed: Some(seed),
    })
    .unwrap()
}

/// Pull `steps` chunks through a fresh extractor and return every smoothed vector.
fn run(source: &mut MockSource, config: &FeatureConfig, steps: usize) -> Vec<BandPowers> {
    let mut extractor = FeatureExtractor::new(config, source.info()).unwrap();
    let pull = extractor.samples_per_pull();
    (0..steps)
        .map(|_| {
            let chunk = source.pull_chunk(Duration::from_secs(3), pull).unwrap();
            extractor.process(&chunk).unwrap().unwrap()
        })
        .collect()
}

#[test]
fn smoothed_vectors_are_finite_and_settle() {
    let config = FeatureConfig::default();
    let mut source = offline_source(1);
    let vectors = run(&mut source, &config, 120);

    assert!(vectors.iter().all(|v| v.0.iter().all(|x| x.is_finite())));

    // After the stream and smoothing buffers fill, consecutive estimates
    // differ only by the background noise
    let tail = &vectors[100..];
    for pair in tail.windows(2) {
        for band in Band::ALL {
            assert!((pair[0].get(band) - pair[1].get(band)).abs() < 0.05);
        }
    }
}

#[test]
fn emphasised_band_raises_its_power() {
    let config = FeatureConfig::default();

    let mut plain = offline_source(7);
    let baseline = *run(&mut plain, &config, 100).last().unwrap();

    let mut boosted = offline_source(7);
    boosted.set_emphasis(Some(Band::Beta));
    let emphasised = *run(&mut boosted, &config, 100).last().unwrap();

    assert!(emphasised.get(Band::Beta) > baseline.get(Band::Beta) + 0.3);
    assert!((emphasised.get(Band::Delta) - baseline.get(Band::Delta)).abs() < 0.2);
}

#[test]
fn same_seed_gives_same_features() {
    let config = FeatureConfig::default();
    let a = run(&mut offline_source(3), &config, 30);
    let b = run(&mut offline_source(3), &config, 30);
    assert_eq!(a, b);
}

#[test]
fn recorded_session_becomes_training_windows() {
    let config = FeatureConfig::default();
    let mut dataset = ActionDataset::new(2, 256.0, config.clone());
    let mut source = offline_source(5);

    for (action, band) in [(0, Band::Alpha), (1, Band::Beta)] {
        source.set_emphasis(Some(band));
        for powers in run(&mut source, &config, 20) {
            assert!(dataset.push(action, powers));
        }
    }

    let set = build_training_set(&dataset).unwrap();
    // 20 vectors, windows of 10 stepping by 1
    assert_eq!(set.class_counts(), vec![11, 11]);
    assert!(set.windows.iter().all(|w| w.len() == config.sequence_length()));
}

#[test]
fn prediction_buffer_tracks_latest_features() {
    let config = FeatureConfig::default();
    let mut source = offline_source(9);
    let mut buffer = PredictionBuffer::new(config.sequence_length()).unwrap();

    let vectors = run(&mut source, &config, 15);
    for v in &vectors {
        buffer.push(*v);
    }
    assert!(buffer.filled());
    assert_eq!(buffer.as_sequence(), vectors[5..].to_vec());
}
