//! Record, train and drive end to end against the synthetic headset.

use std::io::Cursor;

use boards::testing::RecordingLink;
use boards::Rover;
use classifier::{ModelConfig, SequenceClassifier, TrainingConfig};
use eeg_types::{FeatureConfig, RecordingSettings};
use telekinesis::config::MockSettings;
use telekinesis::record::{self, load_profile, RecordOptions};
use telekinesis::train::{self, history_path, TrainOptions};
use telekinesis::{drive, AppConfig, Source};

fn offline_config() -> AppConfig {
    AppConfig {
        record_seconds: 3.0,
        mock: MockSettings {
            realtime: false,
            seed: Some(1),
            ..MockSettings::default()
        },
        training: TrainingConfig {
            epochs: 5,
            hidden_sizes: vec![8, 8],
            seed: Some(2),
            ..TrainingConfig::default()
        },
        ..AppConfig::default()
    }
}

#[test]
fn record_train_drive() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config();

    // Record two actions, pressing Enter before each
    let mut source = Source::open(&config, true).unwrap();
    let options = RecordOptions {
        actions: Some(2),
        profile: Some(dir.path().join("session").to_string_lossy().into_owned()),
    };
    let mut input = Cursor::new("\n\n");
    let mut out = Vec::new();
    let profile = record::run(&config, &mut source, &options, &mut input, &mut out).unwrap();

    assert_eq!(profile, dir.path().join("session.json"));
    let dataset = load_profile(&profile).unwrap();
    assert_eq!(dataset.num_actions(), 2);
    assert!(dataset.actions.iter().all(|a| a.len() == 30));
    assert_eq!(dataset.features, config.features);

    // Train
    let model_path = dir.path().join("model.json");
    let mut out = Vec::new();
    let history = train::run(
        &config.training,
        &TrainOptions {
            profile: profile.clone(),
            model: model_path.clone(),
        },
        &mut out,
    )
    .unwrap();
    assert_eq!(history.loss.len(), 5);
    assert!(history_path(&model_path).exists());
    assert!(String::from_utf8(out).unwrap().starts_with("Accuracy: "));

    // Drive without a rover
    let model = SequenceClassifier::load(&model_path).unwrap();
    assert_eq!(model.num_classes(), 2);
    assert_eq!(model.recording(), Some(&dataset.settings()));
    let mut source = Source::open(&config, true).unwrap();
    let mut out = Vec::new();
    let summary = drive::run(&config, &mut source, &model, None::<&mut Rover>, Some(15), &mut out).unwrap();

    assert_eq!(summary.steps, 15);
    assert_eq!(summary.class_counts.iter().sum::<usize>(), 15);
    let printed = String::from_utf8(out).unwrap();
    let labels = printed
        .lines()
        .filter(|l| matches!(*l, "Forward" | "Backward" | "Stop"))
        .count();
    assert_eq!(labels, 15);
}

#[test]
fn record_prompts_for_missing_answers() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        record_seconds: 0.5,
        ..offline_config()
    };
    let mut source = Source::open(&config, true).unwrap();
    let name = dir.path().join("prompted").to_string_lossy().into_owned();
    let mut input = Cursor::new(format!("zero\n1\n\n{}\n", name));
    let mut out = Vec::new();

    let profile = record::run(&config, &mut source, &RecordOptions::default(), &mut input, &mut out).unwrap();
    assert_eq!(profile, dir.path().join("prompted.json"));
    assert_eq!(load_profile(&profile).unwrap().actions[0].len(), 5);

    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("Please enter a positive integer."));
    assert!(printed.contains("Data saved"));
}

#[test]
fn drive_rejects_mismatched_model() {
    let config = offline_config();
    let model = SequenceClassifier::new(
        ModelConfig {
            sequence_length: 4,
            num_features: 5,
            hidden_sizes: vec![4],
            num_classes: 3,
        },
        Some(0),
    )
    .unwrap();
    let mut source = Source::open(&config, true).unwrap();
    let mut out = Vec::new();
    assert!(drive::run(&config, &mut source, &model, None::<&mut Rover>, Some(1), &mut out).is_err());
}

/// Untrained model shaped for the default timing, claiming `settings`.
fn model_recorded_with(settings: RecordingSettings, classes: usize) -> SequenceClassifier {
    let mut model = SequenceClassifier::new(
        ModelConfig {
            sequence_length: FeatureConfig::default().sequence_length(),
            num_features: 5,
            hidden_sizes: vec![4],
            num_classes: classes,
        },
        Some(3),
    )
    .unwrap();
    model.set_recording(Some(settings));
    model
}

#[test]
fn drive_rejects_model_recorded_with_other_settings() {
    let config = offline_config();
    let rate = config.mock.sample_rate;

    let without_notch = RecordingSettings {
        features: FeatureConfig {
            notch: false,
            ..config.features.clone()
        },
        sample_rate: rate,
    };
    let other_channels = RecordingSettings {
        features: FeatureConfig {
            sensor_channels: vec![1, 2],
            ..config.features.clone()
        },
        sample_rate: rate,
    };
    let other_rate = RecordingSettings {
        features: config.features.clone(),
        sample_rate: rate * 2.0,
    };

    for settings in [without_notch, other_channels, other_rate] {
        let model = model_recorded_with(settings, 2);
        let mut source = Source::open(&config, true).unwrap();
        let mut out = Vec::new();
        let err = drive::run(&config, &mut source, &model, None::<&mut Rover>, Some(1), &mut out)
            .unwrap_err();
        assert!(format!("{:#}", err).contains("feature settings differ"));
    }
}

#[test]
fn drive_moves_rover_as_printed() {
    let config = offline_config();
    let settings = RecordingSettings {
        features: config.features.clone(),
        sample_rate: config.mock.sample_rate,
    };
    let model = model_recorded_with(settings, 3);
    let mut rover = Rover::with_link(RecordingLink::answering("1.0"), 100).unwrap();
    let setup = rover.board().link().sent.len();

    let mut source = Source::open(&config, true).unwrap();
    let mut out = Vec::new();
    let summary = drive::run(&config, &mut source, &model, Some(&mut rover), Some(8), &mut out).unwrap();
    assert_eq!(summary.steps, 8);

    let printed = String::from_utf8(out).unwrap();
    let mut expected = Vec::new();
    for label in printed.lines().filter(|l| matches!(*l, "Forward" | "Backward" | "Stop")) {
        match label {
            "Forward" => expected.extend(["@dw%3$!", "@dw%8$!", "@dw%7$!"]),
            "Backward" => expected.extend(["@dw%3$!", "@dw%-8$!", "@dw%-7$!"]),
            _ => expected.push("@dw%-3$!"),
        }
    }
    assert!(!expected.is_empty());
    assert_eq!(rover.board().link().sent[setup..].to_vec(), expected);
}
