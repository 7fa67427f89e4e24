//! Bubble Detection
//!
//! Multi-channel bubble detection on top of per-channel background windows:
//! - Calibration of each channel's background and thresholds
//! - Threshold comparison with hysteresis for start/end events
//! - Re-baselining when a bubble outlasts its configured maximum

pub mod config;
pub mod detector;
pub mod error;
pub mod event;
pub mod state;

pub use self::config::{ChannelConfig, DetectorConfig, ThresholdSpec};
pub use detector::ChannelDetector;
pub use error::DetectorError;
pub use event::BubbleEvent;
pub use state::{ChannelState, Polarity};

use background::{BackgroundData, NUM_BKGD_POINTS};
use tracing::{debug, info};

/// Bubble monitor for all configured sensor channels
pub struct BubbleMonitor {
    config: DetectorConfig,
    detectors: Vec<ChannelDetector>,
    /// Frames collected for auto-calibration, one column per channel
    warmup: Vec<Vec<u16>>,
}

impl BubbleMonitor {
    /// Create a new monitor with configuration
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorError> {
        config.validate()?;
        info!(
            "Creating bubble monitor with {} channel(s), auto-calibrate: {}",
            config.channels.len(),
            config.auto_calibrate
        );

        Ok(Self {
            warmup: (0..config.channels.len())
                .map(|_| Vec::with_capacity(NUM_BKGD_POINTS))
                .collect(),
            detectors: Vec::new(),
            config,
        })
    }

    /// Initialize every channel's background with a single baseline reading
    pub fn calibrate(&mut self, baselines: &[u16]) -> Result<(), DetectorError> {
        self.check_width(baselines.len())?;

        let max_bubble_samples = self.config.max_bubble_samples;
        self.detectors = self
            .config
            .channels
            .iter()
            .zip(baselines)
            .enumerate()
            .map(|(i, (channel, &baseline))| {
                ChannelDetector::new(i, channel, baseline, max_bubble_samples)
            })
            .collect::<Result<_, _>>()?;
        self.clear_warmup();

        Ok(())
    }

    /// Feed one reading per channel and collect the resulting events
    ///
    /// With auto-calibration enabled the first [`NUM_BKGD_POINTS`] frames
    /// build the background and produce no events.
    pub fn process_frame(
        &mut self,
        sample_index: u64,
        readings: &[u16],
    ) -> Result<Vec<BubbleEvent>, DetectorError> {
        self.check_width(readings.len())?;

        if self.detectors.is_empty() {
            if !self.config.auto_calibrate {
                return Err(DetectorError::NotCalibrated);
            }
            self.collect_warmup(readings)?;
            return Ok(Vec::new());
        }

        let events: Vec<BubbleEvent> = self
            .detectors
            .iter_mut()
            .zip(readings)
            .filter_map(|(detector, &reading)| detector.process(sample_index, reading))
            .collect();

        if !events.is_empty() {
            debug!("Frame {}: {} event(s)", sample_index, events.len());
        }
        Ok(events)
    }

    fn collect_warmup(&mut self, readings: &[u16]) -> Result<(), DetectorError> {
        for (column, &reading) in self.warmup.iter_mut().zip(readings) {
            column.push(reading);
        }

        if self.warmup[0].len() < NUM_BKGD_POINTS {
            return Ok(());
        }

        let max_bubble_samples = self.config.max_bubble_samples;
        let detectors = self
            .config
            .channels
            .iter()
            .zip(&self.warmup)
            .enumerate()
            .map(|(i, (channel, window))| {
                ChannelDetector::from_window(i, channel, window, max_bubble_samples)
            })
            .collect::<Result<Vec<_>, _>>();
        // A failed window is discarded so the next frames start a fresh one
        self.clear_warmup();
        self.detectors = detectors?;

        info!("Auto-calibration complete after {} frames", NUM_BKGD_POINTS);
        Ok(())
    }

    fn check_width(&self, actual: usize) -> Result<(), DetectorError> {
        let expected = self.config.channels.len();
        if actual != expected {
            return Err(DetectorError::ChannelCountMismatch { expected, actual });
        }
        Ok(())
    }

    fn clear_warmup(&mut self) {
        self.warmup.iter_mut().for_each(Vec::clear);
    }

    /// Whether all channels have a background
    pub fn is_calibrated(&self) -> bool {
        !self.detectors.is_empty()
    }

    pub fn channel_count(&self) -> usize {
        self.config.channels.len()
    }

    pub fn channel_name(&self, channel: usize) -> Option<&str> {
        self.config.channels.get(channel).map(|c| c.name.as_str())
    }

    pub fn background(&self, channel: usize) -> Option<&BackgroundData> {
        self.detectors.get(channel).map(ChannelDetector::background)
    }

    pub fn state(&self, channel: usize) -> Option<ChannelState> {
        self.detectors.get(channel).map(ChannelDetector::state)
    }

    pub fn bubble_count(&self, channel: usize) -> Option<u64> {
        self.detectors.get(channel).map(ChannelDetector::bubble_count)
    }

    pub fn detectors(&self) -> &[ChannelDetector] {
        &self.detectors
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Drop all calibration (on sensor change)
    pub fn reset(&mut self) {
        info!("Resetting bubble monitor");
        self.detectors.clear();
        self.clear_warmup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_channel_config() -> DetectorConfig {
        DetectorConfig {
            channels: vec![
                ChannelConfig::new("inlet", ThresholdSpec::Offset { start: 50, end: 20 }),
                ChannelConfig::new("outlet", ThresholdSpec::Absolute { start: 300, end: 340 }),
            ],
            max_bubble_samples: 0,
            auto_calibrate: false,
        }
    }

    #[test]
    fn test_requires_calibration() {
        let mut monitor = BubbleMonitor::new(two_channel_config()).unwrap();
        assert!(matches!(
            monitor.process_frame(0, &[100, 400]),
            Err(DetectorError::NotCalibrated)
        ));
    }

    #[test]
    fn test_channel_count_mismatch() {
        let mut monitor = BubbleMonitor::new(two_channel_config()).unwrap();
        assert!(matches!(
            monitor.calibrate(&[100]),
            Err(DetectorError::ChannelCountMismatch { expected: 2, actual: 1 })
        ));

        monitor.calibrate(&[100, 400]).unwrap();
        assert!(matches!(
            monitor.process_frame(0, &[100, 400, 7]),
            Err(DetectorError::ChannelCountMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_events_per_channel() {
        let mut monitor = BubbleMonitor::new(two_channel_config()).unwrap();
        monitor.calibrate(&[100, 400]).unwrap();
        assert!(monitor.is_calibrated());

        assert!(monitor.process_frame(0, &[101, 399]).unwrap().is_empty());

        let events = monitor.process_frame(1, &[170, 290]).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].channel(), 0);
        assert_eq!(events[0].kind(), "start");
        assert_eq!(events[1].channel(), 1);
        assert_eq!(events[1].kind(), "start");

        let events = monitor.process_frame(2, &[110, 320]).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].channel(), 0);
        assert_eq!(events[0].kind(), "end");

        assert!(!monitor.state(0).unwrap().in_bubble());
        assert!(monitor.state(1).unwrap().in_bubble());
        assert_eq!(monitor.bubble_count(1), Some(1));
        assert_eq!(monitor.channel_name(1), Some("outlet"));
    }

    #[test]
    fn test_auto_calibration_from_first_frames() {
        let config = DetectorConfig {
            auto_calibrate: true,
            ..two_channel_config()
        };
        let mut monitor = BubbleMonitor::new(config).unwrap();

        for i in 0..NUM_BKGD_POINTS as u64 {
            let events = monitor.process_frame(i, &[100 + i as u16, 400]).unwrap();
            assert!(events.is_empty());
        }
        assert!(monitor.is_calibrated());

        let background = monitor.background(0).unwrap();
        assert_eq!(background.min_value(), 100);
        assert_eq!(background.max_value(), 107);
        // (100 + ... + 107) / 8 = 103
        assert_eq!(background.average(), 103);
        assert_eq!(background.start_detection_value(), 153);
        assert_eq!(monitor.background(1).unwrap().start_detection_value(), 300);
    }

    #[test]
    fn test_start_on_wrong_side_of_baseline_rejected() {
        let config = DetectorConfig::with_channels(1, ThresholdSpec::Offset { start: 10, end: 20 });
        assert!(matches!(
            BubbleMonitor::new(config),
            Err(DetectorError::OffsetDirection { .. })
        ));

        let mut monitor = BubbleMonitor::new(two_channel_config()).unwrap();
        // Outlet falls on bubbles and starts at 300, so a 250 baseline is already inside one
        assert!(matches!(
            monitor.calibrate(&[100, 250]),
            Err(DetectorError::StartCrossedAtBaseline { .. })
        ));
        assert!(!monitor.is_calibrated());
    }

    #[test]
    fn test_warmup_columns_reserve_window() {
        let monitor = BubbleMonitor::new(DetectorConfig::robust(3)).unwrap();
        assert_eq!(monitor.warmup.len(), 3);
        assert!(monitor
            .warmup
            .iter()
            .all(|column| column.capacity() >= NUM_BKGD_POINTS));
    }

    #[test]
    fn test_reset_drops_calibration() {
        let mut monitor = BubbleMonitor::new(two_channel_config()).unwrap();
        monitor.calibrate(&[100, 400]).unwrap();
        monitor.reset();

        assert!(!monitor.is_calibrated());
        assert!(monitor.background(0).is_none());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = DetectorConfig {
            channels: vec![],
            ..Default::default()
        };
        assert!(matches!(BubbleMonitor::new(config), Err(DetectorError::NoChannels)));
    }
}
