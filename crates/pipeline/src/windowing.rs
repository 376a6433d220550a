//! Slicing recorded feature sequences into classifier training windows

use eeg_types::{ActionDataset, BandPowers, RecordingSettings};
use tracing::{debug, warn};

use crate::error::{PipelineError, PipelineResult};

/// Overlapping windows of `chunk_size` items, advancing `chunk_size - overlap`
/// items at a time. A trailing partial window is dropped.
pub fn chunk<T>(data: &[T], chunk_size: usize, overlap: usize) -> PipelineResult<Vec<&[T]>> {
    if chunk_size == 0 {
        return Err(PipelineError::InvalidWindow {
            message: "chunk size must be at least 1".into(),
        });
    }
    if overlap >= chunk_size {
        return Err(PipelineError::InvalidWindow {
            message: format!(
                "overlap {} must be smaller than chunk size {}",
                overlap, chunk_size
            ),
        });
    }
    let step = chunk_size - overlap;
    Ok(data.windows(chunk_size).step_by(step).collect())
}

/// Labeled sequences ready for the classifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    /// Each window holds `sequence_length` consecutive smoothed vectors
    pub windows: Vec<Vec<BandPowers>>,
    /// Action index of each window
    pub labels: Vec<usize>,
    pub num_classes: usize,
    /// Settings the windows were recorded with, when known
    pub recording: Option<RecordingSettings>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Number of windows per class.
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.num_classes];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }
}

/// Chunks every recorded action with the dataset's own timing, keeping
/// action order.
pub fn build_training_set(dataset: &ActionDataset) -> PipelineResult<TrainingSet> {
    dataset.features.validate()?;
    let size = dataset.features.sequence_length();
    let overlap = dataset.features.chunk_overlap();

    let mut set = TrainingSet {
        num_classes: dataset.num_actions(),
        recording: Some(dataset.settings()),
        ..TrainingSet::default()
    };
    for (label, vectors) in dataset.actions.iter().enumerate() {
        let windows = chunk(vectors, size, overlap)?;
        if windows.is_empty() {
            warn!(
                action = label,
                recorded = vectors.len(),
                needed = size,
                "action too short to yield a training window"
            );
        }
        for window in windows {
            set.windows.push(window.to_vec());
            set.labels.push(label);
        }
    }
    debug!(
        windows = set.len(),
        classes = set.num_classes,
        size,
        overlap,
        "built training set"
    );
    Ok(set)
}
