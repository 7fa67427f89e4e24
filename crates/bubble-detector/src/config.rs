//! Detector configuration

use crate::DetectorError;
use background::Thresholds;
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "BUBBLE";

/// How a channel's detection thresholds are expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ThresholdSpec {
    /// Fixed readings, independent of the background
    Absolute { start: u16, end: u16 },
    /// Signed offsets from the background average at calibration time
    Offset { start: i32, end: i32 },
}

impl ThresholdSpec {
    /// Resolve into absolute thresholds against a baseline reading
    pub fn resolve(&self, baseline: u16) -> Thresholds {
        match *self {
            ThresholdSpec::Absolute { start, end } => Thresholds::new(start, end),
            ThresholdSpec::Offset { start, end } => {
                Thresholds::new(offset_from(baseline, start), offset_from(baseline, end))
            }
        }
    }

    fn check(&self, channel: &str) -> Result<(), DetectorError> {
        let (start, end) = match *self {
            ThresholdSpec::Absolute { start, end } => (i64::from(start), i64::from(end)),
            ThresholdSpec::Offset { start, end } => (i64::from(start), i64::from(end)),
        };
        if start == end {
            return Err(DetectorError::AmbiguousThresholds {
                channel: channel.to_string(),
                value: start,
            });
        }

        // Offsets must place the start threshold beyond the baseline in the bubble direction
        if let ThresholdSpec::Offset { start, end } = *self {
            if (start > end && start <= 0) || (start < end && start >= 0) {
                return Err(DetectorError::OffsetDirection {
                    channel: channel.to_string(),
                    start,
                    end,
                });
            }
        }
        Ok(())
    }
}

fn offset_from(baseline: u16, offset: i32) -> u16 {
    (i64::from(baseline) + i64::from(offset)).clamp(0, i64::from(u16::MAX)) as u16
}

/// Configuration for a single sensor channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Human readable channel name
    pub name: String,
    /// Bubble start/end thresholds
    pub thresholds: ThresholdSpec,
}

impl ChannelConfig {
    pub fn new(name: impl Into<String>, thresholds: ThresholdSpec) -> Self {
        Self {
            name: name.into(),
            thresholds,
        }
    }
}

/// Detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Sensor channels, in frame column order
    pub channels: Vec<ChannelConfig>,

    /// Longest bubble (in samples) before the channel is re-baselined; 0 disables
    pub max_bubble_samples: u64,

    /// Build the background from the first frames instead of waiting for `calibrate`
    pub auto_calibrate: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            channels: vec![ChannelConfig::new(
                "sensor0",
                ThresholdSpec::Offset { start: 50, end: 20 },
            )],
            max_bubble_samples: 1000,
            auto_calibrate: true,
        }
    }
}

impl DetectorConfig {
    /// Create config with `count` identically configured channels
    pub fn with_channels(count: usize, thresholds: ThresholdSpec) -> Self {
        Self {
            channels: (0..count)
                .map(|i| ChannelConfig::new(format!("sensor{i}"), thresholds))
                .collect(),
            ..Default::default()
        }
    }

    /// Create sensitive config (narrow offsets, short bubbles)
    pub fn sensitive(count: usize) -> Self {
        Self {
            max_bubble_samples: 250,
            ..Self::with_channels(count, ThresholdSpec::Offset { start: 20, end: 8 })
        }
    }

    /// Create robust config (wide offsets for noisy sensors)
    pub fn robust(count: usize) -> Self {
        Self {
            max_bubble_samples: 5000,
            ..Self::with_channels(count, ThresholdSpec::Offset { start: 120, end: 50 })
        }
    }

    /// Load from an optional TOML file layered under `BUBBLE_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, DetectorError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Parse from a TOML string
    pub fn from_toml_str(toml: &str) -> Result<Self, DetectorError> {
        let config: Self = config::Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check channel list and threshold specs
    pub fn validate(&self) -> Result<(), DetectorError> {
        if self.channels.is_empty() {
            return Err(DetectorError::NoChannels);
        }
        for channel in &self.channels {
            channel.thresholds.check(&channel.name)?;
        }
        Ok(())
    }
}
