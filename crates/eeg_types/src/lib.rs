//! Shared types for the EEG rover workspace
//!
//! This crate contains the data model passed between the sample sources, the
//! feature pipeline, the classifier and the operator binary, together with the
//! timing configuration they all derive their buffer sizes from.

pub mod config;
pub mod data;
pub mod error;

// Re-export commonly used types
pub use config::*;
pub use data::*;
pub use error::*;
