//! Channel detection state

use background::Thresholds;
use serde::{Deserialize, Serialize};

/// Direction in which a bubble moves the sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    /// Bubble raises the reading (start above end)
    Rising,
    /// Bubble lowers the reading (start below end)
    Falling,
}

impl Polarity {
    /// Derive polarity from threshold ordering; equal thresholds have none
    pub fn from_thresholds(thresholds: Thresholds) -> Option<Self> {
        use std::cmp::Ordering;

        match thresholds.start.cmp(&thresholds.end) {
            Ordering::Greater => Some(Polarity::Rising),
            Ordering::Less => Some(Polarity::Falling),
            Ordering::Equal => None,
        }
    }

    /// Whether a reading crosses the start threshold
    pub fn starts(self, thresholds: Thresholds, reading: u16) -> bool {
        match self {
            Polarity::Rising => reading >= thresholds.start,
            Polarity::Falling => reading <= thresholds.start,
        }
    }

    /// Whether a reading crosses back over the end threshold
    pub fn ends(self, thresholds: Thresholds, reading: u16) -> bool {
        match self {
            Polarity::Rising => reading <= thresholds.end,
            Polarity::Falling => reading >= thresholds.end,
        }
    }

    /// The more extreme of two readings in the bubble direction
    pub fn peak(self, a: u16, b: u16) -> u16 {
        match self {
            Polarity::Rising => a.max(b),
            Polarity::Falling => a.min(b),
        }
    }
}

/// Per-channel detection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChannelState {
    /// Tracking background
    #[default]
    Idle,
    /// Bubble in progress
    InBubble {
        /// Sample index of the start event
        started_at: u64,
        /// Most extreme reading seen so far
        peak: u16,
    },
    /// Re-baselined past the start threshold; waiting for a reading beyond the end threshold
    Settling,
}

impl ChannelState {
    pub fn in_bubble(&self) -> bool {
        matches!(self, ChannelState::InBubble { .. })
    }
}
