//! Analog axis debouncing.
//!
//! Turns raw axis samples into press/release edges on the axis' two halves, so sticks can
//! drive digital inputs through the key mapping table.

use crate::config::DEFAULT_DEADZONE;
use crate::device::DeviceId;
use crate::event::{AxisHalf, ControllerAxis, PhysicalCode};
use std::collections::HashMap;

/// Discretized position of an axis relative to the deadzone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Zone {
    Negative,
    Neutral,
    Positive,
}

impl Zone {
    /// Classify `value` against a deadzone of `threshold`. Both bounds are exclusive.
    pub fn classify(value: i16, threshold: i16) -> Self {
        let value = i32::from(value);
        let threshold = i32::from(threshold);
        if value < -threshold {
            Zone::Negative
        } else if value > threshold {
            Zone::Positive
        } else {
            Zone::Neutral
        }
    }
}

/// A press or release of one axis half.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisEdge {
    pub code: PhysicalCode,
    pub pressed: bool,
}

impl AxisEdge {
    fn press(half: AxisHalf) -> Self {
        Self {
            code: PhysicalCode::Axis(half),
            pressed: true,
        }
    }

    fn release(half: AxisHalf) -> Self {
        Self {
            code: PhysicalCode::Axis(half),
            pressed: false,
        }
    }
}

/// Per-(device, axis) zone tracker.
#[derive(Debug)]
pub struct AxisDebouncer {
    threshold: i16,
    zones: HashMap<(DeviceId, ControllerAxis), Zone>,
}

impl Default for AxisDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEADZONE)
    }
}

impl AxisDebouncer {
    pub fn new(threshold: i16) -> Self {
        Self {
            threshold,
            zones: HashMap::new(),
        }
    }

    pub fn threshold(&self) -> i16 {
        self.threshold
    }

    /// Change the deadzone. Takes effect from the next sample.
    pub fn set_threshold(&mut self, threshold: i16) {
        self.threshold = threshold;
    }

    /// Forget every axis' last zone (e.g. when a device disconnects).
    pub fn reset(&mut self) {
        self.zones.clear();
    }

    /// Feed one sample and return the edges it causes.
    ///
    /// Releases always come before the press in the returned list, so the two halves of an
    /// axis are never pressed at the same time. A sample that lands in the same zone as the
    /// previous one yields nothing. The first sample for an axis releases every inactive
    /// half and presses the active one.
    pub fn feed(&mut self, device: DeviceId, axis: ControllerAxis, value: i16) -> Vec<AxisEdge> {
        let zone = Zone::classify(value, self.threshold);
        let previous = self.zones.insert((device, axis), zone);
        if previous == Some(zone) {
            return Vec::new();
        }

        let negative = AxisHalf::negative(axis);
        let positive = AxisHalf::positive(axis);
        let was = |z: Zone| previous.map_or(true, |p| p == z);

        let mut edges = Vec::with_capacity(2);
        if zone != Zone::Negative && was(Zone::Negative) {
            edges.push(AxisEdge::release(negative));
        }
        if zone != Zone::Positive && was(Zone::Positive) {
            edges.push(AxisEdge::release(positive));
        }
        match zone {
            Zone::Negative => edges.push(AxisEdge::press(negative)),
            Zone::Positive => edges.push(AxisEdge::press(positive)),
            Zone::Neutral => {}
        }
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAD: DeviceId = DeviceId(1);
    const X: ControllerAxis = ControllerAxis::LeftX;

    fn neg() -> PhysicalCode {
        PhysicalCode::Axis(AxisHalf::negative(X))
    }

    fn pos() -> PhysicalCode {
        PhysicalCode::Axis(AxisHalf::positive(X))
    }

    fn press(code: PhysicalCode) -> AxisEdge {
        AxisEdge {
            code,
            pressed: true,
        }
    }

    fn release(code: PhysicalCode) -> AxisEdge {
        AxisEdge {
            code,
            pressed: false,
        }
    }

    #[test]
    fn classify_uses_exclusive_bounds() {
        assert_eq!(Zone::classify(-8000, 8000), Zone::Neutral);
        assert_eq!(Zone::classify(-8001, 8000), Zone::Negative);
        assert_eq!(Zone::classify(8000, 8000), Zone::Neutral);
        assert_eq!(Zone::classify(8001, 8000), Zone::Positive);
        assert_eq!(Zone::classify(i16::MIN, 8000), Zone::Negative);
        assert_eq!(Zone::classify(i16::MAX, 8000), Zone::Positive);
    }

    #[test]
    fn repeated_values_do_not_re_emit() {
        let mut axes = AxisDebouncer::new(8000);
        let samples = [0, -9000, -9000, 0, 9000];
        let out: Vec<Vec<AxisEdge>> = samples.iter().map(|&v| axes.feed(PAD, X, v)).collect();

        assert_eq!(
            out,
            vec![
                vec![release(neg()), release(pos())],
                vec![press(neg())],
                vec![],
                vec![release(neg())],
                vec![press(pos())],
            ]
        );
    }

    #[test]
    fn crossing_extremes_releases_before_pressing() {
        let mut axes = AxisDebouncer::new(8000);
        axes.feed(PAD, X, -30000);
        assert_eq!(
            axes.feed(PAD, X, 30000),
            vec![release(neg()), press(pos())]
        );
        assert_eq!(
            axes.feed(PAD, X, -30000),
            vec![release(pos()), press(neg())]
        );
    }

    #[test]
    fn first_sample_outside_deadzone_syncs_both_halves() {
        let mut axes = AxisDebouncer::new(8000);
        assert_eq!(
            axes.feed(PAD, X, 20000),
            vec![release(neg()), press(pos())]
        );
    }

    #[test]
    fn axes_and_devices_are_tracked_independently() {
        let mut axes = AxisDebouncer::new(8000);
        axes.feed(PAD, X, -9000);
        assert_eq!(axes.feed(DeviceId(2), X, -9000).len(), 2);
        assert_eq!(axes.feed(PAD, ControllerAxis::LeftY, 0).len(), 2);
        assert!(axes.feed(PAD, X, -12000).is_empty());
    }

    #[test]
    fn threshold_changes_apply_to_next_sample() {
        let mut axes = AxisDebouncer::default();
        assert_eq!(axes.threshold(), 8000);
        axes.feed(PAD, X, 5000);
        axes.set_threshold(4000);
        assert_eq!(axes.feed(PAD, X, 5000), vec![press(pos())]);

        axes.reset();
        assert_eq!(axes.feed(PAD, X, 5000).len(), 2);
    }
}
