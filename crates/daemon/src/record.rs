//! Labeled recording session: one block of smoothed features per action

use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use eeg_types::ActionDataset;
use pipeline::FeatureExtractor;
use tracing::info;

use crate::config::AppConfig;
use crate::prompt::{ask, ask_positive, wait_for_enter};
use crate::source::Source;

#[derive(Debug, Clone, Default)]
pub struct RecordOptions {
    /// Number of actions; prompted for when unset
    pub actions: Option<usize>,
    /// Profile name or path without extension; prompted for when unset
    pub profile: Option<String>,
}

/// `<profile>.json`, unless the name already carries the extension.
pub fn profile_path(profile: &str) -> PathBuf {
    let path = PathBuf::from(profile);
    if path.extension().is_some_and(|ext| ext == "json") {
        path
    } else {
        PathBuf::from(format!("{}.json", profile))
    }
}

pub fn save_profile(dataset: &ActionDataset, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Could not create profile file '{}'", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), dataset)
        .with_context(|| format!("Could not write profile '{}'", path.display()))?;
    Ok(())
}

pub fn load_profile(path: &Path) -> Result<ActionDataset> {
    let file = File::open(path)
        .with_context(|| format!("Could not open profile '{}'", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("Could not parse profile '{}'", path.display()))
}

/// Records every action and saves the profile. Returns where it was written.
pub fn run<R: BufRead, W: Write>(
    config: &AppConfig,
    source: &mut Source,
    options: &RecordOptions,
    input: &mut R,
    out: &mut W,
) -> Result<PathBuf> {
    let mut extractor = FeatureExtractor::new(&config.features, source.info())
        .context("Stream does not fit the feature configuration")?;

    let num_actions = match options.actions {
        Some(n) if n > 0 => n,
        _ => {
            writeln!(out, "How many actions (including a null action) would you like to train?")?;
            ask_positive(input, out, "Num Actions: ")?
        }
    };
    let steps = config.steps_per_action();
    let mut dataset = ActionDataset::new(num_actions, source.info().sample_rate, config.features.clone());

    for action in 0..num_actions {
        writeln!(
            out,
            "Please begin envisioning action {}. Data will be collected for approx. {} seconds.",
            action + 1,
            config.record_seconds
        )?;
        wait_for_enter(input, out, "Press the enter key when ready.")?;
        writeln!(out, "\nCollecting Data...\n")?;
        source.begin_action(action);

        for _ in 0..steps {
            let features = source.next_features(&mut extractor, config)?;
            dataset.push(action, features);
        }
        info!(action, vectors = steps, "action recorded");
    }

    let name = match &options.profile {
        Some(name) => name.clone(),
        None => ask(input, out, "Please enter a profile name: ")?,
    };
    let path = profile_path(&name);
    writeln!(out, "Saving data and ending program")?;
    save_profile(&dataset, &path)?;
    writeln!(out, "Data saved")?;
    info!(
        "Saved {} vectors for {} actions to {}",
        dataset.total_vectors(),
        num_actions,
        path.display()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_names_gain_json_extension() {
        assert_eq!(profile_path("alice"), PathBuf::from("alice.json"));
        assert_eq!(profile_path("runs/bob.json"), PathBuf::from("runs/bob.json"));
        assert_eq!(profile_path("v1.2"), PathBuf::from("v1.2.json"));
    }
}
