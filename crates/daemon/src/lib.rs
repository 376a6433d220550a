//! Operator workflows for the EEG-driven rover: record labeled sessions,
//! train a classifier on them and drive the rover from live predictions.

pub mod config;
pub mod drive;
pub mod prompt;
pub mod record;
pub mod source;
pub mod train;

pub use config::AppConfig;
pub use source::Source;
