//! Real-time control loop: features in, rover moves out

use std::io::Write;

use anyhow::{ensure, Context, Result};
use boards::{Direction, Rover, SerialLink};
use classifier::SequenceClassifier;
use pipeline::{FeatureExtractor, PredictionBuffer};
use eeg_types::RecordingSettings;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::source::Source;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriveSummary {
    pub steps: usize,
    /// How often each class was chosen
    pub class_counts: Vec<usize>,
}

/// Runs the loop for `steps` predictions, or until interrupted when unset.
/// Without a rover the chosen moves are only printed.
pub fn run<L: SerialLink, W: Write>(
    config: &AppConfig,
    source: &mut Source,
    model: &SequenceClassifier,
    mut rover: Option<&mut Rover<L>>,
    steps: Option<usize>,
    out: &mut W,
) -> Result<DriveSummary> {
    let sequence_length = config.features.sequence_length();
    ensure!(
        model.config().sequence_length == sequence_length,
        "model expects sequences of {} vectors but the feature timing gives {}",
        model.config().sequence_length,
        sequence_length
    );

    let current = RecordingSettings {
        features: config.features.clone(),
        sample_rate: source.info().sample_rate,
    };
    match model.recording() {
        Some(recorded) => recorded
            .check_compatible(&current)
            .context("Model was trained on features computed differently")?,
        None => warn!("Model does not record its feature settings, assuming they match"),
    }

    let mut extractor = FeatureExtractor::new(&config.features, source.info())
        .context("Stream does not fit the feature configuration")?;
    let mut window = PredictionBuffer::new(sequence_length)?;
    let mut summary = DriveSummary {
        steps: 0,
        class_counts: vec![0; model.num_classes()],
    };

    info!(classes = model.num_classes(), dry_run = rover.is_none(), "drive loop starting");
    writeln!(out, "Ctrl + c can be pressed to kill the program at any time.")?;

    while steps.map_or(true, |limit| summary.steps < limit) {
        let features = source.next_features(&mut extractor, config)?;
        window.push(features);

        let probs = model.predict(&window.as_sequence())?;
        let class = classifier::argmax(&probs);
        let direction = Direction::from_class(class);
        debug!(?probs, class, "prediction");

        writeln!(out, "{}", class)?;
        writeln!(out, "{}", direction.label())?;
        if let Some(rover) = rover.as_deref_mut() {
            rover.move_in(direction).context("Failed to command the rover")?;
        }

        summary.class_counts[class] += 1;
        summary.steps += 1;
    }

    Ok(summary)
}
