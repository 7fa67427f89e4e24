//! Bubble events

use serde::{Deserialize, Serialize};

/// Event emitted when a channel enters or leaves a bubble
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BubbleEvent {
    /// Reading crossed the start threshold
    Start {
        channel: usize,
        sample_index: u64,
        reading: u16,
        baseline: u16,
    },

    /// Reading crossed back over the end threshold
    End {
        channel: usize,
        sample_index: u64,
        reading: u16,
        baseline: u16,
        duration_samples: u64,
        peak: u16,
    },

    /// Bubble exceeded the configured maximum length and the channel was re-baselined
    Timeout {
        channel: usize,
        sample_index: u64,
        reading: u16,
        baseline: u16,
        duration_samples: u64,
    },
}

impl BubbleEvent {
    pub fn channel(&self) -> usize {
        match self {
            BubbleEvent::Start { channel, .. }
            | BubbleEvent::End { channel, .. }
            | BubbleEvent::Timeout { channel, .. } => *channel,
        }
    }

    pub fn sample_index(&self) -> u64 {
        match self {
            BubbleEvent::Start { sample_index, .. }
            | BubbleEvent::End { sample_index, .. }
            | BubbleEvent::Timeout { sample_index, .. } => *sample_index,
        }
    }

    /// Short event name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            BubbleEvent::Start { .. } => "start",
            BubbleEvent::End { .. } => "end",
            BubbleEvent::Timeout { .. } => "timeout",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let event = BubbleEvent::End {
            channel: 1,
            sample_index: 42,
            reading: 118,
            baseline: 100,
            duration_samples: 6,
            peak: 190,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "end");
        assert_eq!(json["channel"], 1);
        assert_eq!(json["duration_samples"], 6);
        assert_eq!(json["peak"], 190);
        assert_eq!(event.kind(), "end");
        assert_eq!(event.sample_index(), 42);
    }
}
