//! Background Buffer Error Types

use thiserror::Error;

/// Errors constructing a background buffer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackgroundError {
    /// Sample slice does not match the fixed window size
    #[error("Background window holds exactly {expected} samples, got {actual}")]
    CapacityMismatch { expected: usize, actual: usize },
}
