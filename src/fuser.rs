//! Complementary filter blending gyroscope and tilt-compass orientation

use core::f32::consts::{FRAC_PI_2, PI, TAU};

use crate::types::Orientation;

/// Default weight of the gyroscope orientation
pub const DEFAULT_FILTER_COEFFICIENT: f32 = 0.98;

/// Blend one Euler angle, unwrapping across the ±π seam
///
/// When one angle sits just below -π/2 and the other is positive, the
/// negative one is shifted by 2π before blending so that the two are averaged
/// along the short arc. Results above π are wrapped back.
///
/// # Example
/// ```
/// use orientation_fusion::fuser::fuse_axis;
///
/// let fused = fuse_axis(-3.0, 0.1, 0.98);
/// assert!(fused > -core::f32::consts::PI && fused <= core::f32::consts::PI);
/// ```
pub fn fuse_axis(gyro: f32, tilt: f32, coefficient: f32) -> f32 {
    let one_minus_coefficient = 1.0 - coefficient;

    if gyro < -FRAC_PI_2 && tilt > 0.0 {
        let fused = coefficient * (gyro + TAU) + one_minus_coefficient * tilt;
        unwrap_above_pi(fused)
    } else if tilt < -FRAC_PI_2 && gyro > 0.0 {
        let fused = coefficient * gyro + one_minus_coefficient * (tilt + TAU);
        unwrap_above_pi(fused)
    } else {
        coefficient * gyro + one_minus_coefficient * tilt
    }
}

fn unwrap_above_pi(angle: f32) -> f32 {
    if angle > PI { angle - TAU } else { angle }
}

/// Periodic complementary filter
///
/// Each call to [`ComplementaryFuser::fuse`] blends the two estimates per
/// axis and remembers the result as the latest fused orientation.
#[derive(Debug, Clone, Copy)]
pub struct ComplementaryFuser {
    coefficient: f32,
    fused: Orientation,
}

impl ComplementaryFuser {
    pub fn new(coefficient: f32) -> Self {
        Self {
            coefficient,
            fused: Orientation::default(),
        }
    }

    /// Blend gyroscope and tilt-compass orientations axis by axis
    pub fn fuse(&mut self, gyro: Orientation, tilt: Orientation) -> Orientation {
        let blended = gyro
            .to_vector()
            .zip_map(&tilt.to_vector(), |g, t| fuse_axis(g, t, self.coefficient));

        self.fused = Orientation::from_vector(blended);
        self.fused
    }

    /// Latest fused orientation
    pub fn fused(&self) -> Orientation {
        self.fused
    }

    pub fn coefficient(&self) -> f32 {
        self.coefficient
    }
}

impl Default for ComplementaryFuser {
    fn default() -> Self {
        Self::new(DEFAULT_FILTER_COEFFICIENT)
    }
}
