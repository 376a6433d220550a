use std::collections::VecDeque;

use eeg_types::{BandPowers, NUM_BANDS};

use crate::error::{PipelineError, PipelineResult};

/// Rolling average over the last `depth` band-power vectors.
///
/// Starts out holding `depth` zero vectors, so early means are pulled toward
/// zero until the buffer has seen `depth` real estimates.
#[derive(Debug, Clone)]
pub struct SmoothingBuffer {
    depth: usize,
    rows: VecDeque<BandPowers>,
    pushed: usize,
}

impl SmoothingBuffer {
    pub fn new(depth: usize) -> PipelineResult<Self> {
        if depth == 0 {
            return Err(PipelineError::InvalidInput {
                message: "smoothing depth must be at least 1".into(),
            });
        }
        Ok(Self {
            depth,
            rows: std::iter::repeat(BandPowers::default()).take(depth).collect(),
            pushed: 0,
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// True once every zero row has been replaced by a real estimate.
    pub fn is_warm(&self) -> bool {
        self.pushed >= self.depth
    }

    pub fn push(&mut self, powers: BandPowers) {
        self.rows.pop_front();
        self.rows.push_back(powers);
        self.pushed = self.pushed.saturating_add(1);
    }

    /// Column mean over all rows.
    pub fn mean(&self) -> BandPowers {
        let mut sums = [0.0f32; NUM_BANDS];
        for row in &self.rows {
            for (sum, v) in sums.iter_mut().zip(row.0) {
                *sum += v;
            }
        }
        BandPowers(sums.map(|s| s / self.depth as f32))
    }
}
