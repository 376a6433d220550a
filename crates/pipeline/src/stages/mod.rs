//! Signal-processing building blocks used by the extractor

pub mod band_power;
pub mod filter;

// Re-export stage implementations
pub use band_power::*;
pub use filter::*;
