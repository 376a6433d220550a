pub mod types;
pub mod mock_eeg;
#[cfg(feature = "lsl")]
pub mod lsl_inlet;

// Re-export the main types that users need
pub use types::{resolve_stream, DriverError, StreamSource, NOT_FOUND_HINT};

// Optionally expose lower-level access through a raw module
pub mod raw {
    pub use crate::mock_eeg::*;
    #[cfg(feature = "lsl")]
    pub use crate::lsl_inlet::*;
}
