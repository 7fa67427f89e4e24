//! Detector Error Types

use background::BackgroundError;
use thiserror::Error;

/// Errors raised while configuring or running the detector
#[derive(Debug, Error)]
pub enum DetectorError {
    /// Start and end thresholds coincide, so no bubble direction can be derived
    #[error("Start and end thresholds for channel '{channel}' are both {value}")]
    AmbiguousThresholds { channel: String, value: i64 },

    /// Start offset points away from the bubble direction implied by start/end order
    #[error("Start offset {start} for channel '{channel}' is on the wrong side of end {end}")]
    OffsetDirection { channel: String, start: i32, end: i32 },

    /// Calibrated baseline already crosses the start threshold
    #[error("Baseline {baseline} for channel '{channel}' already crosses start {start}")]
    StartCrossedAtBaseline {
        channel: String,
        start: u16,
        baseline: u16,
    },

    /// Configuration lists no sensor channels
    #[error("At least one sensor channel must be configured")]
    NoChannels,

    /// Frame width does not match the configured channels
    #[error("Expected {expected} channel readings, got {actual}")]
    ChannelCountMismatch { expected: usize, actual: usize },

    /// Readings arrived before the background was calibrated
    #[error("Detector has not been calibrated")]
    NotCalibrated,

    /// Configuration source could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Background window could not be built
    #[error("Background error: {0}")]
    Background(#[from] BackgroundError),
}
