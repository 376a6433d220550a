use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Input shape mismatch: expected {expected:?} (steps, features), got {got:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("Label {label} is out of range for {classes} classes")]
    InvalidLabel { label: usize, classes: usize },

    #[error("Got {labels} labels for {sequences} sequences")]
    LabelCountMismatch { labels: usize, sequences: usize },

    #[error("Training set is empty")]
    EmptyDataset,

    #[error("Invalid model configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported model format version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type ModelResult<T> = Result<T, ModelError>;
