//! Core types for the orientation fusion engine

use std::time::Duration;

use nalgebra::Vector3;
use serde::Deserialize;

/// Motion sensor delivering samples to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    /// Accelerometer (gravity plus linear acceleration)
    Accelerometer,
    /// Magnetic field sensor
    Magnetic,
    /// Gyroscope (angular velocity in rad/s)
    Gyroscope,
}

/// A single timestamped raw sensor reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    pub kind: SensorKind,
    pub vector: Vector3<f32>,
    /// Sensor timestamp in nanoseconds
    pub timestamp_nanos: i64,
}

impl SensorSample {
    pub fn new(kind: SensorKind, vector: Vector3<f32>, timestamp_nanos: i64) -> Self {
        Self {
            kind,
            vector,
            timestamp_nanos,
        }
    }
}

/// Euler orientation in radians, each angle in (-π, π]
///
/// The axis order matches [`crate::math::to_euler`]: azimuth about Z,
/// pitch about X, roll about Y.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Orientation {
    pub azimuth: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl Orientation {
    pub fn new(azimuth: f32, pitch: f32, roll: f32) -> Self {
        Self {
            azimuth,
            pitch,
            roll,
        }
    }

    /// `[azimuth, pitch, roll]`
    pub fn to_vector(&self) -> Vector3<f32> {
        Vector3::new(self.azimuth, self.pitch, self.roll)
    }

    pub fn from_vector(vector: Vector3<f32>) -> Self {
        Self::new(vector.x, vector.y, vector.z)
    }

    pub fn is_finite(&self) -> bool {
        self.azimuth.is_finite() && self.pitch.is_finite() && self.roll.is_finite()
    }
}

/// Orientation as published to consumers, in integer degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublishedOrientation {
    /// Heading in [0, 360)
    pub azimuth_deg: i32,
    /// Roll shifted by 90° in [0, 360)
    pub roll_deg: i32,
    /// Pitch shifted by 180°
    pub accurate_pitch_deg: i32,
    /// Pitch with sub-threshold jitter suppressed
    pub approx_pitch_deg: i32,
}

/// Shortest fuser period; a zero period would keep the fuser thread spinning
pub const MIN_FUSER_PERIOD: Duration = Duration::from_millis(1);

/// Fuser cadence presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FuserRate {
    /// 30 ms
    #[default]
    High,
    /// 100 ms
    Mid,
    /// 250 ms
    Low,
}

impl FuserRate {
    pub fn period(self) -> Duration {
        match self {
            FuserRate::High => Duration::from_millis(30),
            FuserRate::Mid => Duration::from_millis(100),
            FuserRate::Low => Duration::from_millis(250),
        }
    }
}

/// Operating mode, fixed when the engine is configured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusionMode {
    /// Gyroscope present: periodic complementary filter
    Fused,
    /// No gyroscope: orientation straight from accelerometer and compass
    TiltCompassOnly,
}

/// Engine settings
///
/// Can be deserialized from any serde format; missing fields take their
/// defaults.
///
/// # Example
/// ```
/// use orientation_fusion::{FusionSettings, FuserRate};
///
/// let settings = FusionSettings {
///     fuser_period_ms: FuserRate::Mid.period().as_millis() as u64,
///     filter_coefficient: 0.95,
///     ..Default::default()
/// };
/// assert!(settings.has_gyroscope);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct FusionSettings {
    /// Whether a gyroscope delivers samples
    ///
    /// Without one the periodic fuser is never scheduled and every
    /// tilt-compass recompute is published directly.
    pub has_gyroscope: bool,
    /// Fuser period in milliseconds
    pub fuser_period_ms: u64,
    /// Delay before the first fuser tick in milliseconds
    ///
    /// Gives the tilt-compass estimate time to seed the gyroscope integrator.
    pub fuser_start_delay_ms: u64,
    /// Weight of the gyroscope orientation in the blend (typically 0.98)
    ///
    /// The tilt-compass orientation gets `1 - filter_coefficient`, which is
    /// also the rate at which gyroscope drift is pulled back each tick.
    pub filter_coefficient: f32,
    /// Published pitch deviation in degrees tolerated before the
    /// approximate pitch follows
    pub pitch_hysteresis_deg: i32,
}

impl FusionSettings {
    /// Fuser period, never shorter than [`MIN_FUSER_PERIOD`]
    pub fn fuser_period(&self) -> Duration {
        Duration::from_millis(self.fuser_period_ms).max(MIN_FUSER_PERIOD)
    }

    pub fn fuser_start_delay(&self) -> Duration {
        Duration::from_millis(self.fuser_start_delay_ms)
    }

    pub fn mode(&self) -> FusionMode {
        if self.has_gyroscope {
            FusionMode::Fused
        } else {
            FusionMode::TiltCompassOnly
        }
    }
}

impl Default for FusionSettings {
    fn default() -> Self {
        Self {
            has_gyroscope: true,
            fuser_period_ms: FuserRate::default().period().as_millis() as u64,
            fuser_start_delay_ms: 1000,
            filter_coefficient: 0.98,
            pitch_hysteresis_deg: 2,
        }
    }
}

/// Engine status flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FusionFlags {
    pub mode: FusionMode,
    /// Sample delivery is active
    pub running: bool,
    /// A tilt-compass estimate has been produced at least once
    pub gyro_ready: bool,
    /// The gyroscope integrator has been seeded from that estimate
    pub gyro_seeded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = FusionSettings::default();
        assert!(settings.has_gyroscope);
        assert_eq!(settings.fuser_period(), Duration::from_millis(30));
        assert_eq!(settings.fuser_start_delay(), Duration::from_secs(1));
        assert_eq!(settings.filter_coefficient, 0.98);
        assert_eq!(settings.pitch_hysteresis_deg, 2);
        assert_eq!(settings.mode(), FusionMode::Fused);
    }

    #[test]
    fn test_zero_period_is_clamped() {
        let settings = FusionSettings {
            fuser_period_ms: 0,
            ..Default::default()
        };
        assert_eq!(settings.fuser_period(), MIN_FUSER_PERIOD);
    }

    #[test]
    fn test_fuser_rates() {
        assert_eq!(FuserRate::High.period(), Duration::from_millis(30));
        assert_eq!(FuserRate::Mid.period(), Duration::from_millis(100));
        assert_eq!(FuserRate::Low.period(), Duration::from_millis(250));
    }

    #[test]
    fn test_orientation_vector_order() {
        let orientation = Orientation::new(0.1, 0.2, 0.3);
        let vector = orientation.to_vector();
        assert_eq!(vector, Vector3::new(0.1, 0.2, 0.3));
        assert_eq!(Orientation::from_vector(vector), orientation);
        assert!(orientation.is_finite());
        assert!(!Orientation::new(f32::NAN, 0.0, 0.0).is_finite());
    }
}
