use std::collections::VecDeque;

use eeg_types::BandPowers;

use crate::error::{PipelineError, PipelineResult};

/// Sliding input sequence for real-time classification.
///
/// Holds the newest `length` smoothed vectors, oldest first. It starts filled
/// with ones so the classifier can run from the very first step.
#[derive(Debug, Clone)]
pub struct PredictionBuffer {
    length: usize,
    rows: VecDeque<BandPowers>,
    pushed: usize,
}

impl PredictionBuffer {
    pub fn new(length: usize) -> PipelineResult<Self> {
        if length == 0 {
            return Err(PipelineError::InvalidInput {
                message: "prediction sequence length must be at least 1".into(),
            });
        }
        Ok(Self {
            length,
            rows: std::iter::repeat(BandPowers([1.0; eeg_types::NUM_BANDS]))
                .take(length)
                .collect(),
            pushed: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// True once every placeholder row has been replaced.
    pub fn filled(&self) -> bool {
        self.pushed >= self.length
    }

    pub fn push(&mut self, powers: BandPowers) {
        self.rows.pop_front();
        self.rows.push_back(powers);
        self.pushed = self.pushed.saturating_add(1);
    }

    /// Current window in model input order.
    pub fn as_sequence(&self) -> Vec<BandPowers> {
        self.rows.iter().copied().collect()
    }
}
