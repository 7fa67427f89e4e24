//! Background Data Ring Buffer

use crate::{BackgroundError, Thresholds, NUM_BKGD_POINTS};
use serde::Serialize;

/// Rolling background window for a single sensor channel
///
/// Holds the last [`NUM_BKGD_POINTS`] readings in a circular buffer together
/// with their cached minimum, maximum and sum. Fields are only reachable
/// through methods, so the cached aggregates always describe the slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackgroundData {
    /// Circular storage for the window
    ring_buffer: [u16; NUM_BKGD_POINTS],
    /// Next write slot (0 to NUM_BKGD_POINTS - 1)
    position: u8,
    /// Minimum value in the ring buffer
    min_value: u16,
    /// Maximum value in the ring buffer
    max_value: u16,
    /// Sum of all values in the ring buffer
    total: u32,
    /// Reading required to signify a bubble start event
    start_detection_value: u16,
    /// Reading required to signify a bubble end event
    end_detection_value: u16,
}

impl BackgroundData {
    /// Create a window pre-filled with a baseline reading
    pub fn new(baseline: u16, thresholds: Thresholds) -> Self {
        Self {
            ring_buffer: [baseline; NUM_BKGD_POINTS],
            position: 0,
            min_value: baseline,
            max_value: baseline,
            total: u32::from(baseline) * NUM_BKGD_POINTS as u32,
            start_detection_value: thresholds.start,
            end_detection_value: thresholds.end,
        }
    }

    /// Create a window from an explicit set of readings
    ///
    /// The slice must hold exactly [`NUM_BKGD_POINTS`] values; the first one
    /// is treated as the oldest.
    pub fn from_samples(samples: &[u16], thresholds: Thresholds) -> Result<Self, BackgroundError> {
        let ring_buffer: [u16; NUM_BKGD_POINTS] =
            samples.try_into().map_err(|_| BackgroundError::CapacityMismatch {
                expected: NUM_BKGD_POINTS,
                actual: samples.len(),
            })?;

        let mut data = Self {
            ring_buffer,
            position: 0,
            min_value: 0,
            max_value: 0,
            total: ring_buffer.iter().map(|&v| u32::from(v)).sum(),
            start_detection_value: thresholds.start,
            end_detection_value: thresholds.end,
        };
        data.min_value = data.scan_min();
        data.max_value = data.scan_max();
        Ok(data)
    }

    /// Re-initialize in place with a new baseline, keeping the thresholds
    pub fn reset(&mut self, baseline: u16) {
        *self = Self::new(baseline, self.thresholds());
    }

    /// Insert a reading, overwriting the oldest one
    ///
    /// Returns the evicted reading.
    pub fn insert(&mut self, sample: u16) -> u16 {
        let slot = self.position as usize;
        let evicted = self.ring_buffer[slot];

        self.total = self.total - u32::from(evicted) + u32::from(sample);
        self.ring_buffer[slot] = sample;
        self.position = ((slot + 1) % NUM_BKGD_POINTS) as u8;

        // Only rescan when the evicted value may have been the sole extremum
        if sample <= self.min_value {
            self.min_value = sample;
        } else if evicted == self.min_value {
            self.min_value = self.scan_min();
        }

        if sample >= self.max_value {
            self.max_value = sample;
        } else if evicted == self.max_value {
            self.max_value = self.scan_max();
        }

        evicted
    }

    /// Rolling average (floor of total / window size)
    pub fn average(&self) -> u16 {
        // total <= NUM_BKGD_POINTS * u16::MAX, so the quotient fits
        (self.total / NUM_BKGD_POINTS as u32) as u16
    }

    /// Peak-to-peak spread of the window
    pub fn span(&self) -> u16 {
        self.max_value - self.min_value
    }

    pub fn min_value(&self) -> u16 {
        self.min_value
    }

    pub fn max_value(&self) -> u16 {
        self.max_value
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Next write slot
    pub fn position(&self) -> usize {
        self.position as usize
    }

    pub fn start_detection_value(&self) -> u16 {
        self.start_detection_value
    }

    pub fn end_detection_value(&self) -> u16 {
        self.end_detection_value
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.start_detection_value, self.end_detection_value)
    }

    /// Replace both detection thresholds
    pub fn set_thresholds(&mut self, thresholds: Thresholds) {
        self.start_detection_value = thresholds.start;
        self.end_detection_value = thresholds.end;
    }

    /// Raw slots in storage order
    pub fn samples(&self) -> &[u16; NUM_BKGD_POINTS] {
        &self.ring_buffer
    }

    /// Readings from oldest to newest
    pub fn iter_chronological(&self) -> impl Iterator<Item = u16> + '_ {
        let split = self.position as usize;
        self.ring_buffer[split..]
            .iter()
            .chain(self.ring_buffer[..split].iter())
            .copied()
    }

    /// Most recently inserted reading
    pub fn latest(&self) -> u16 {
        let slot = (self.position as usize + NUM_BKGD_POINTS - 1) % NUM_BKGD_POINTS;
        self.ring_buffer[slot]
    }

    fn scan_min(&self) -> u16 {
        self.ring_buffer.iter().copied().min().unwrap_or_default()
    }

    fn scan_max(&self) -> u16 {
        self.ring_buffer.iter().copied().max().unwrap_or_default()
    }
}

impl Default for BackgroundData {
    fn default() -> Self {
        Self::new(0, Thresholds::default())
    }
}
