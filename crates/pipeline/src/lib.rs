//! Streaming feature extraction for EEG sequence classification.
//!
//! Raw multichannel samples arrive in irregular chunks. They are rolled into a
//! fixed [`StreamBuffer`], the newest mini-batch is reduced to five band powers,
//! and a [`SmoothingBuffer`] averages recent estimates into the feature vector
//! the classifier consumes. Training slices recorded vectors into overlapping
//! windows; inference keeps a sliding [`PredictionBuffer`] instead.

pub mod error;
pub mod extractor;
pub mod prediction;
pub mod smoothing;
pub mod stages;
pub mod stream_buffer;
pub mod windowing;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use error::*;
pub use extractor::*;
pub use prediction::*;
pub use smoothing::*;
pub use stages::*;
pub use stream_buffer::*;
pub use windowing::*;
