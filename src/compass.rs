//! Tilt-compensated compass orientation from accelerometer and magnetometer

use nalgebra::{Matrix3, Vector3};

use crate::error::{FusionError, Result};
use crate::math::to_euler;
use crate::types::Orientation;

/// Standard gravity in m/s²
const STANDARD_GRAVITY: f32 = 9.806_65;

/// Below a tenth of standard gravity the device is treated as in free fall
const FREE_FALL_GRAVITY_SQUARED: f32 = 0.01 * STANDARD_GRAVITY * STANDARD_GRAVITY;

/// Minimum magnitude of magnetic × gravity (µT·m/s²)
const MIN_EAST_MAGNITUDE: f32 = 0.1;

/// Minimum sine of the angle between gravity and magnetic field
const MIN_SIN_ANGLE: f32 = 1e-3;

/// Build the device rotation matrix from gravity and magnetic field
///
/// Gravity defines "up", magnetic × gravity defines "east" and
/// gravity × east defines "north". Rows of the result are east, north and up
/// expressed in device coordinates.
///
/// # Arguments
/// * `accelerometer` - Accelerometer reading in m/s²
/// * `magnetometer` - Magnetometer reading in µT
///
/// # Errors
/// [`FusionError::DegenerateOrientation`] when the device is in free fall or
/// the two vectors are zero or (nearly) collinear.
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use orientation_fusion::compass::rotation_matrix;
///
/// let level = Vector3::new(0.0, 0.0, 9.81);
/// let north = Vector3::new(0.0, 22.0, -40.0);
/// assert!(rotation_matrix(level, north).is_ok());
/// assert!(rotation_matrix(Vector3::zeros(), north).is_err());
/// ```
pub fn rotation_matrix(
    accelerometer: Vector3<f32>,
    magnetometer: Vector3<f32>,
) -> Result<Matrix3<f32>> {
    let gravity_squared = accelerometer.norm_squared();
    if gravity_squared < FREE_FALL_GRAVITY_SQUARED {
        return Err(FusionError::DegenerateOrientation);
    }

    let east = magnetometer.cross(&accelerometer);
    let east_magnitude = east.norm();
    let collinear_bound = MIN_SIN_ANGLE * gravity_squared.sqrt() * magnetometer.norm();
    if east_magnitude < MIN_EAST_MAGNITUDE || east_magnitude < collinear_bound {
        return Err(FusionError::DegenerateOrientation);
    }

    let east = east / east_magnitude;
    let up = accelerometer / gravity_squared.sqrt();
    let north = up.cross(&east);

    Ok(Matrix3::from_rows(&[
        east.transpose(),
        north.transpose(),
        up.transpose(),
    ]))
}

/// Baseline orientation estimate from accelerometer and magnetometer
///
/// Keeps the last good estimate when an input pair is degenerate so that a
/// bad reading never propagates as NaN.
#[derive(Debug, Clone, Default)]
pub struct TiltCompassEstimator {
    orientation: Option<Orientation>,
    degenerate: bool,
}

impl TiltCompassEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the estimate from a new input pair
    ///
    /// On [`FusionError::DegenerateOrientation`] the previous estimate is
    /// retained unchanged.
    pub fn update(
        &mut self,
        accelerometer: Vector3<f32>,
        magnetometer: Vector3<f32>,
    ) -> Result<Orientation> {
        match rotation_matrix(accelerometer, magnetometer) {
            Ok(matrix) => {
                let orientation = to_euler(&matrix);
                if self.degenerate {
                    log::info!("Tilt-compass input usable again");
                    self.degenerate = false;
                }
                self.orientation = Some(orientation);
                Ok(orientation)
            }
            Err(err) => {
                if !self.degenerate {
                    log::warn!(
                        "Dropping tilt-compass input (accel={:?}, mag={:?}): {}",
                        accelerometer.as_slice(),
                        magnetometer.as_slice(),
                        err
                    );
                    self.degenerate = true;
                }
                Err(err)
            }
        }
    }

    /// Last good orientation, `None` until the first successful estimate
    pub fn orientation(&self) -> Option<Orientation> {
        self.orientation
    }

    /// Whether the latest input pair was rejected
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::FRAC_PI_2;

    fn level() -> Vector3<f32> {
        Vector3::new(0.0, 0.0, 9.81)
    }

    #[test]
    fn test_level_device_pointing_north() {
        let north_mag = Vector3::new(0.0, 20.0, -40.0);
        let orientation = to_euler(&rotation_matrix(level(), north_mag).unwrap());

        assert!(orientation.azimuth.abs() < 1e-5, "{:?}", orientation);
        assert!(orientation.pitch.abs() < 1e-5, "{:?}", orientation);
        assert!(orientation.roll.abs() < 1e-5, "{:?}", orientation);
    }

    #[test]
    fn test_cardinal_directions() {
        // Device Y axis pointing east means magnetic north lies along -X
        let east_mag = Vector3::new(-20.0, 0.0, -40.0);
        let orientation = to_euler(&rotation_matrix(level(), east_mag).unwrap());
        assert!(
            (orientation.azimuth - FRAC_PI_2).abs() < 1e-5,
            "East azimuth should be ~π/2, got {}",
            orientation.azimuth
        );

        let west_mag = Vector3::new(20.0, 0.0, -40.0);
        let orientation = to_euler(&rotation_matrix(level(), west_mag).unwrap());
        assert!(
            (orientation.azimuth + FRAC_PI_2).abs() < 1e-5,
            "West azimuth should be ~-π/2, got {}",
            orientation.azimuth
        );

        let south_mag = Vector3::new(0.0, -20.0, -40.0);
        let orientation = to_euler(&rotation_matrix(level(), south_mag).unwrap());
        assert!(
            (orientation.azimuth.abs() - core::f32::consts::PI).abs() < 1e-5,
            "South azimuth should be ±π, got {}",
            orientation.azimuth
        );
    }

    #[test]
    fn test_tilted_pitch() {
        // Top edge raised by 30°: gravity shifts onto +Y
        let tilted = Vector3::new(0.0, 4.905, 8.496);
        let matrix = rotation_matrix(tilted, Vector3::new(0.0, 20.0, -40.0)).unwrap();
        let orientation = to_euler(&matrix);

        assert!(
            (orientation.pitch + 30f32.to_radians()).abs() < 1e-3,
            "pitch {}",
            orientation.pitch
        );
        assert!(orientation.azimuth.abs() < 1e-3);
    }

    #[test]
    fn test_result_is_orthonormal() {
        let accel = Vector3::new(1.2, -0.8, 9.6);
        let mag = Vector3::new(5.0, 18.0, -42.0);
        let matrix = rotation_matrix(accel, mag).unwrap();
        assert!((matrix * matrix.transpose() - Matrix3::identity()).amax() < 1e-5);
        assert!((matrix.determinant() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_degenerate_inputs() {
        let mag = Vector3::new(0.0, 20.0, -40.0);

        // free fall
        assert!(matches!(
            rotation_matrix(Vector3::zeros(), mag),
            Err(FusionError::DegenerateOrientation)
        ));
        // no magnetic field
        assert!(matches!(
            rotation_matrix(level(), Vector3::zeros()),
            Err(FusionError::DegenerateOrientation)
        ));
        // field parallel to gravity
        assert!(matches!(
            rotation_matrix(level(), Vector3::new(0.0, 0.0, -45.0)),
            Err(FusionError::DegenerateOrientation)
        ));
    }

    #[test]
    fn test_estimator_keeps_last_good_estimate() {
        let mut estimator = TiltCompassEstimator::new();
        assert!(estimator.orientation().is_none());

        let mag = Vector3::new(-20.0, 0.0, -40.0);
        let good = estimator.update(level(), mag).unwrap();
        assert_eq!(estimator.orientation(), Some(good));
        assert!(!estimator.is_degenerate());

        let err = estimator.update(Vector3::zeros(), mag);
        assert!(err.is_err());
        assert!(estimator.is_degenerate());
        assert_eq!(estimator.orientation(), Some(good));
        assert!(good.is_finite());

        estimator.update(level(), mag).unwrap();
        assert!(!estimator.is_degenerate());
    }
}
