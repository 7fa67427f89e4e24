//! Background Ring Buffer
//!
//! Per-channel rolling window of recent sensor readings with cached
//! min/max/total and the two thresholds used for bubble start/end detection.

mod background;
mod error;

pub use background::BackgroundData;
pub use error::BackgroundError;

use serde::{Deserialize, Serialize};

/// Number of background points stored per sensor channel
pub const NUM_BKGD_POINTS: usize = 8;

// The running total must hold a full window of maximum readings.
const _: () = assert!(NUM_BKGD_POINTS as u64 * u16::MAX as u64 <= u32::MAX as u64);
// The write position is stored as a u8.
const _: () = assert!(NUM_BKGD_POINTS > 0 && NUM_BKGD_POINTS <= u8::MAX as usize + 1);

/// Bubble detection thresholds for one sensor channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Thresholds {
    /// Reading that signifies a bubble start event
    pub start: u16,
    /// Reading that signifies a bubble end event
    pub end: u16,
}

impl Thresholds {
    pub fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }
}
