//! Gyroscope integration into an accumulated rotation matrix

use nalgebra::{Matrix3, Vector3};

use crate::math::{from_orientation, quaternion_to_matrix, to_euler};
use crate::types::Orientation;

/// Angular rates below this magnitude (rad/s) contribute no rotation
const EPSILON: f32 = 1e-9;

/// Nanoseconds to seconds
const NS2S: f64 = 1e-9;

/// Integrates angular velocity samples using axis-angle increments
///
/// The integrator must be seeded once from a tilt-compass orientation so that
/// both estimates share a reference frame. The complementary fuser then
/// re-seeds it on every tick, which bounds the accumulated drift.
#[derive(Debug, Clone)]
pub struct GyroscopeIntegrator {
    matrix: Matrix3<f32>,
    orientation: Orientation,
    last_timestamp: Option<i64>,
    seeded: bool,
}

impl GyroscopeIntegrator {
    pub fn new() -> Self {
        Self {
            matrix: Matrix3::identity(),
            orientation: Orientation::default(),
            last_timestamp: None,
            seeded: false,
        }
    }

    /// Apply one gyroscope sample
    ///
    /// `reference` is the current tilt-compass orientation; samples arriving
    /// before one exists are ignored. The first sample after construction
    /// only records its timestamp and applies no rotation.
    ///
    /// # Arguments
    /// * `angular_velocity` - Gyroscope reading in rad/s
    /// * `timestamp_nanos` - Sensor timestamp in nanoseconds
    /// * `reference` - Current tilt-compass orientation, if any
    ///
    /// # Returns
    /// The updated gyroscope orientation, or `None` if the sample was ignored
    pub fn integrate(
        &mut self,
        angular_velocity: Vector3<f32>,
        timestamp_nanos: i64,
        reference: Option<Orientation>,
    ) -> Option<Orientation> {
        let reference = reference?;

        if !self.seeded {
            // Identity times the reference rotation
            self.matrix = Matrix3::<f32>::identity() * from_orientation(&reference);
            self.seeded = true;
            log::debug!("Gyroscope integrator seeded from {:?}", reference);
        }

        let delta_time = match self.last_timestamp {
            Some(last) if timestamp_nanos > last => ((timestamp_nanos - last) as f64 * NS2S) as f32,
            Some(last) => {
                log::trace!(
                    "Gyroscope timestamp {} not after {}, no rotation applied",
                    timestamp_nanos,
                    last
                );
                0.0
            }
            // TODO: the first sample's rotation is discarded; revisit once sensor
            // start-up timestamps are known to be trustworthy
            None => 0.0,
        };
        self.last_timestamp = Some(timestamp_nanos);

        let delta = delta_rotation(angular_velocity, delta_time);
        self.matrix *= delta;
        self.orientation = to_euler(&self.matrix);

        Some(self.orientation)
    }

    /// Replace the accumulated rotation with the given orientation
    pub fn reseed(&mut self, orientation: Orientation) {
        self.matrix = from_orientation(&orientation);
        self.orientation = orientation;
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn matrix(&self) -> Matrix3<f32> {
        self.matrix
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }
}

impl Default for GyroscopeIntegrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Rotation over `delta_time` seconds at constant `angular_velocity`
fn delta_rotation(angular_velocity: Vector3<f32>, delta_time: f32) -> Matrix3<f32> {
    let omega = angular_velocity.norm();
    let axis = angular_velocity
        .try_normalize(EPSILON)
        .unwrap_or_else(Vector3::zeros);

    let half_angle = omega * delta_time / 2.0;
    let (sin_half, cos_half) = half_angle.sin_cos();
    let vector = axis * sin_half;

    quaternion_to_matrix(cos_half, vector.x, vector.y, vector.z)
}
