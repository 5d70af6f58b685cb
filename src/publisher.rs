//! Conversion of fused radians into published integer degrees

use crate::math::RAD_TO_DEG;
use crate::types::{Orientation, PublishedOrientation};

/// Hysteresis gate for the approximate pitch channel
///
/// The gated value only follows the input once it deviates by more than the
/// threshold.
///
/// # Example
/// ```
/// use orientation_fusion::publisher::PitchGate;
///
/// let mut gate = PitchGate::with_initial(2, 10);
/// let gated: Vec<i32> = [10, 11, 9, 13].iter().map(|&p| gate.update(p)).collect();
/// assert_eq!(gated, [10, 10, 10, 13]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PitchGate {
    threshold: i32,
    value: i32,
}

impl PitchGate {
    pub fn new(threshold: i32) -> Self {
        Self::with_initial(threshold, 0)
    }

    pub fn with_initial(threshold: i32, value: i32) -> Self {
        Self { threshold, value }
    }

    pub fn update(&mut self, accurate: i32) -> i32 {
        if (self.value - accurate).abs() > self.threshold {
            self.value = accurate;
        }
        self.value
    }

    pub fn value(&self) -> i32 {
        self.value
    }
}

/// Publishes orientation in degrees and tracks the "new orientation" flag
#[derive(Debug, Clone)]
pub struct OrientationPublisher {
    current: PublishedOrientation,
    pitch_gate: PitchGate,
    ready: bool,
}

impl OrientationPublisher {
    pub fn new(pitch_hysteresis_deg: i32) -> Self {
        Self {
            current: PublishedOrientation::default(),
            pitch_gate: PitchGate::new(pitch_hysteresis_deg),
            ready: false,
        }
    }

    /// Convert and store a new orientation, raising the ready flag
    pub fn publish(&mut self, orientation: &Orientation) -> PublishedOrientation {
        let azimuth_deg = to_whole_degrees(orientation.azimuth).rem_euclid(360);
        let roll_deg = (to_whole_degrees(orientation.roll) + 90).rem_euclid(360);
        let accurate_pitch_deg = to_whole_degrees(orientation.pitch) + 180;
        let approx_pitch_deg = self.pitch_gate.update(accurate_pitch_deg);

        self.current = PublishedOrientation {
            azimuth_deg,
            roll_deg,
            accurate_pitch_deg,
            approx_pitch_deg,
        };
        self.ready = true;

        log::trace!("Published {:?}", self.current);
        self.current
    }

    pub fn current(&self) -> PublishedOrientation {
        self.current
    }

    /// Clear the ready flag, returning the orientation if it was set
    pub fn take_ready(&mut self) -> Option<PublishedOrientation> {
        if core::mem::take(&mut self.ready) {
            Some(self.current)
        } else {
            None
        }
    }
}

fn to_whole_degrees(radians: f32) -> i32 {
    (radians * RAD_TO_DEG).round() as i32
}
