use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use classifier::{TrainingConfig, TrainingHistory};
use pipeline::build_training_set;
use tracing::info;

use crate::record::load_profile;

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub profile: PathBuf,
    pub model: PathBuf,
}

/// History is stored next to the model, `model.json` -> `model.history.json`.
pub fn history_path(model: &Path) -> PathBuf {
    model.with_extension("history.json")
}

/// Trains on a recorded profile and writes the model and its history.
pub fn run<W: Write>(config: &TrainingConfig, options: &TrainOptions, out: &mut W) -> Result<TrainingHistory> {
    let dataset = load_profile(&options.profile)?;
    let set = build_training_set(&dataset).context("Could not slice the profile into training windows")?;
    ensure!(
        !set.is_empty(),
        "profile '{}' is too short to produce a single training window",
        options.profile.display()
    );
    info!(
        "Training on {} windows from {} ({} actions)",
        set.len(),
        options.profile.display(),
        set.num_classes
    );

    let trained = classifier::train(&set, config)?;
    trained
        .model
        .save(&options.model)
        .with_context(|| format!("Could not save model to '{}'", options.model.display()))?;

    let path = history_path(&options.model);
    let file = File::create(&path)
        .with_context(|| format!("Could not create history file '{}'", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &trained.history)?;

    match trained.history.final_val_accuracy() {
        Some(accuracy) => writeln!(out, "Accuracy: {}%", accuracy * 100.0)?,
        None => writeln!(out, "No validation data held out, accuracy not measured")?,
    }
    Ok(trained.history)
}
