//! Single-channel bubble detector

use crate::config::{ChannelConfig, ThresholdSpec};
use crate::state::{ChannelState, Polarity};
use crate::{BubbleEvent, DetectorError};
use background::{BackgroundData, Thresholds};
use tracing::{debug, info, warn};

/// Bubble detector for one sensor channel
///
/// Readings outside a bubble feed the background window; readings inside a
/// bubble are only compared against the thresholds so the bubble itself never
/// shifts the baseline.
#[derive(Debug, Clone)]
pub struct ChannelDetector {
    channel: usize,
    name: String,
    spec: ThresholdSpec,
    polarity: Polarity,
    background: BackgroundData,
    state: ChannelState,
    bubble_count: u64,
    max_bubble_samples: u64,
}

impl ChannelDetector {
    /// Calibrate from a single baseline reading
    pub fn new(
        channel: usize,
        config: &ChannelConfig,
        baseline: u16,
        max_bubble_samples: u64,
    ) -> Result<Self, DetectorError> {
        let thresholds = config.thresholds.resolve(baseline);
        let background = BackgroundData::new(baseline, thresholds);
        Self::build(channel, config, background, max_bubble_samples)
    }

    /// Calibrate from a full window of readings, oldest first
    pub fn from_window(
        channel: usize,
        config: &ChannelConfig,
        window: &[u16],
        max_bubble_samples: u64,
    ) -> Result<Self, DetectorError> {
        let mut background = BackgroundData::from_samples(window, Thresholds::default())?;
        background.set_thresholds(config.thresholds.resolve(background.average()));
        Self::build(channel, config, background, max_bubble_samples)
    }

    fn build(
        channel: usize,
        config: &ChannelConfig,
        background: BackgroundData,
        max_bubble_samples: u64,
    ) -> Result<Self, DetectorError> {
        let thresholds = background.thresholds();
        let polarity = Polarity::from_thresholds(thresholds).ok_or_else(|| {
            DetectorError::AmbiguousThresholds {
                channel: config.name.clone(),
                value: i64::from(thresholds.start),
            }
        })?;

        let baseline = background.average();
        if polarity.starts(thresholds, baseline) {
            return Err(DetectorError::StartCrossedAtBaseline {
                channel: config.name.clone(),
                start: thresholds.start,
                baseline,
            });
        }

        info!(
            "Calibrated channel {} ({}): baseline {}, start {}, end {}, {:?}",
            channel,
            config.name,
            background.average(),
            thresholds.start,
            thresholds.end,
            polarity
        );

        Ok(Self {
            channel,
            name: config.name.clone(),
            spec: config.thresholds,
            polarity,
            background,
            state: ChannelState::Idle,
            bubble_count: 0,
            max_bubble_samples,
        })
    }

    /// Feed one reading and report any start/end transition
    pub fn process(&mut self, sample_index: u64, reading: u16) -> Option<BubbleEvent> {
        let thresholds = self.background.thresholds();

        match self.state {
            ChannelState::Idle => {
                if self.polarity.starts(thresholds, reading) {
                    self.state = ChannelState::InBubble {
                        started_at: sample_index,
                        peak: reading,
                    };
                    self.bubble_count += 1;
                    debug!(
                        "Bubble start on {} at sample {}: {}",
                        self.name, sample_index, reading
                    );

                    Some(BubbleEvent::Start {
                        channel: self.channel,
                        sample_index,
                        reading,
                        baseline: self.background.average(),
                    })
                } else {
                    self.background.insert(reading);
                    None
                }
            }
            ChannelState::InBubble { started_at, peak } => {
                let peak = self.polarity.peak(peak, reading);
                let duration_samples = sample_index.saturating_sub(started_at);

                if self.polarity.ends(thresholds, reading) {
                    let baseline = self.background.average();
                    self.background.insert(reading);
                    self.state = ChannelState::Idle;
                    debug!(
                        "Bubble end on {} at sample {} after {} samples (peak {})",
                        self.name, sample_index, duration_samples, peak
                    );

                    Some(BubbleEvent::End {
                        channel: self.channel,
                        sample_index,
                        reading,
                        baseline,
                        duration_samples,
                        peak,
                    })
                } else if self.max_bubble_samples > 0
                    && duration_samples >= self.max_bubble_samples
                {
                    warn!(
                        "Bubble on {} exceeded {} samples, re-baselining at {}",
                        self.name, self.max_bubble_samples, reading
                    );
                    self.rebaseline(reading);

                    Some(BubbleEvent::Timeout {
                        channel: self.channel,
                        sample_index,
                        reading,
                        baseline: self.background.average(),
                        duration_samples,
                    })
                } else {
                    self.state = ChannelState::InBubble { started_at, peak };
                    None
                }
            }
            ChannelState::Settling => {
                if self.polarity.ends(thresholds, reading) {
                    info!(
                        "Channel {} recovered at sample {}: {}",
                        self.name, sample_index, reading
                    );
                    self.background.reset(reading);
                    self.state = ChannelState::Idle;
                } else {
                    self.background.insert(reading);
                }
                None
            }
        }
    }

    /// Reset the background at `baseline` and re-resolve relative thresholds
    ///
    /// When the new baseline already crosses the start threshold (absolute
    /// thresholds, or saturated offsets) the channel settles instead of going
    /// idle: no bubble can start until a reading crosses the end threshold.
    pub fn rebaseline(&mut self, baseline: u16) {
        self.background.reset(baseline);

        let thresholds = self.spec.resolve(baseline);
        if Polarity::from_thresholds(thresholds) == Some(self.polarity) {
            self.background.set_thresholds(thresholds);
        } else {
            // Offsets saturated at the edge of the range
            warn!(
                "Keeping previous thresholds on {}: {:?} unusable at baseline {}",
                self.name, thresholds, baseline
            );
        }

        if self.polarity.starts(self.background.thresholds(), baseline) {
            warn!(
                "Channel {} settling: baseline {} is past start {}",
                self.name,
                baseline,
                self.background.start_detection_value()
            );
            self.state = ChannelState::Settling;
        } else {
            self.state = ChannelState::Idle;
        }
    }

    pub fn channel(&self) -> usize {
        self.channel
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn background(&self) -> &BackgroundData {
        &self.background
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Number of bubbles started since calibration
    pub fn bubble_count(&self) -> u64 {
        self.bubble_count
    }
}
