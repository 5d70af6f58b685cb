//! Rotation math shared by the estimators and the fuser
//!
//! Matrices are 3x3 rotation matrices laid out row-major. The Euler
//! decomposition uses the device convention: roll about local Y, pitch about X
//! and azimuth about Z, composed as azimuth ∘ pitch ∘ roll.

use core::f32::consts::{PI, TAU};

use nalgebra::{DMatrix, Matrix3, Quaternion, UnitQuaternion};

use crate::error::{FusionError, Result};
use crate::types::Orientation;

/// Mathematical constants
pub const DEG_TO_RAD: f32 = PI / 180.0;
pub const RAD_TO_DEG: f32 = 180.0 / PI;

/// Build an `n`x`n` identity matrix flattened row-major
pub fn identity(n: usize) -> Vec<f32> {
    let mut matrix = vec![0.0; n * n];
    for i in 0..n {
        matrix[i * n + i] = 1.0;
    }
    matrix
}

/// Multiply two flattened row-major square matrices of equal dimension
///
/// # Errors
/// [`FusionError::DimensionMismatch`] when the operands differ in length and
/// [`FusionError::NotSquare`] when the length is not a perfect square.
///
/// # Example
/// ```
/// use orientation_fusion::math::{identity, multiply};
///
/// let a = [1.0, 2.0, 3.0, 4.0];
/// let product = multiply(&identity(2), &a).unwrap();
/// assert_eq!(product, a);
///
/// assert!(multiply(&identity(3), &a).is_err());
/// ```
pub fn multiply(a: &[f32], b: &[f32]) -> Result<Vec<f32>> {
    if a.len() != b.len() {
        return Err(FusionError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let dimension = square_dimension(a.len())?;
    let lhs = DMatrix::from_row_slice(dimension, dimension, a);
    let rhs = DMatrix::from_row_slice(dimension, dimension, b);

    // nalgebra stores column-major, the transpose's storage is our row-major layout
    Ok((lhs * rhs).transpose().as_slice().to_vec())
}

fn square_dimension(len: usize) -> Result<usize> {
    let dimension = (len as f64).sqrt().round() as usize;
    if dimension * dimension == len {
        Ok(dimension)
    } else {
        Err(FusionError::NotSquare { len })
    }
}

/// Combined rotation matrix for the given Euler angles (radians)
pub fn from_orientation(orientation: &Orientation) -> Matrix3<f32> {
    let (sin_x, cos_x) = orientation.pitch.sin_cos();
    let (sin_y, cos_y) = orientation.roll.sin_cos();
    let (sin_z, cos_z) = orientation.azimuth.sin_cos();

    #[rustfmt::skip]
    let pitch = Matrix3::new(
        1.0, 0.0, 0.0,
        0.0, cos_x, sin_x,
        0.0, -sin_x, cos_x,
    );
    #[rustfmt::skip]
    let roll = Matrix3::new(
        cos_y, 0.0, sin_y,
        0.0, 1.0, 0.0,
        -sin_y, 0.0, cos_y,
    );
    #[rustfmt::skip]
    let azimuth = Matrix3::new(
        cos_z, sin_z, 0.0,
        -sin_z, cos_z, 0.0,
        0.0, 0.0, 1.0,
    );

    azimuth * (pitch * roll)
}

/// Decompose a rotation matrix into Euler angles (radians)
///
/// Inverse of [`from_orientation`] away from pitch = ±π/2.
pub fn to_euler(matrix: &Matrix3<f32>) -> Orientation {
    // Clamp so accumulated rounding never pushes asin out of its domain
    let sin_pitch = (-matrix[(2, 1)]).clamp(-1.0, 1.0);

    Orientation {
        azimuth: matrix[(0, 1)].atan2(matrix[(1, 1)]),
        pitch: sin_pitch.asin(),
        roll: (-matrix[(2, 0)]).atan2(matrix[(2, 2)]),
    }
}

/// Rotation matrix of a quaternion given as vector part and scalar part
pub fn quaternion_to_matrix(w: f32, x: f32, y: f32, z: f32) -> Matrix3<f32> {
    UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z))
        .to_rotation_matrix()
        .into_inner()
}

/// Wrap an angle into (-π, π]
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}
