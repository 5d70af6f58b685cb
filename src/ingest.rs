//! Latest raw reading per sensor

use nalgebra::Vector3;

use crate::types::{SensorKind, SensorSample};

/// Holds the most recent sample of each sensor kind, last write wins
#[derive(Debug, Clone, Default)]
pub struct SampleIngest {
    accelerometer: Option<SensorSample>,
    magnetic: Option<SensorSample>,
    gyroscope: Option<SensorSample>,
}

impl SampleIngest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the stored sample for `sample.kind`
    pub fn record(&mut self, sample: SensorSample) {
        *self.slot_mut(sample.kind) = Some(sample);
    }

    pub fn latest(&self, kind: SensorKind) -> Option<SensorSample> {
        match kind {
            SensorKind::Accelerometer => self.accelerometer,
            SensorKind::Magnetic => self.magnetic,
            SensorKind::Gyroscope => self.gyroscope,
        }
    }

    /// Accelerometer and magnetic vectors, once both have been seen
    pub fn tilt_compass_inputs(&self) -> Option<(Vector3<f32>, Vector3<f32>)> {
        let accelerometer = self.latest(SensorKind::Accelerometer)?;
        let magnetic = self.latest(SensorKind::Magnetic)?;
        Some((accelerometer.vector, magnetic.vector))
    }

    fn slot_mut(&mut self, kind: SensorKind) -> &mut Option<SensorSample> {
        match kind {
            SensorKind::Accelerometer => &mut self.accelerometer,
            SensorKind::Magnetic => &mut self.magnetic,
            SensorKind::Gyroscope => &mut self.gyroscope,
        }
    }
}
