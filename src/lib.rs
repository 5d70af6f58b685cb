//! Orientation Fusion - device azimuth, pitch and roll from three motion sensors
//!
//! This library estimates a device's orientation by fusing an accelerometer,
//! a magnetic field sensor and, when present, a gyroscope. It is aimed at
//! platforms where the magnetometer is disturbed (for example by nearby
//! motors), so the plain accelerometer + compass estimate is noisy, while a
//! gyroscope integral alone drifts over time.
//!
//! # Features
//!
//! - Tilt-compensated compass orientation from accelerometer and magnetometer
//! - Gyroscope integration with axis-angle increments
//! - Periodic complementary filter with angle wraparound handling that
//!   re-seeds the gyroscope integral to cancel drift
//! - Published integer-degree orientation with a hysteresis-gated pitch
//! - Accelerometer + compass only mode when no gyroscope is available
//! - Degenerate sensor input never produces NaN, the last good estimate is kept
//!
//! # Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use nalgebra::Vector3;
//! use orientation_fusion::{MotionEngine, PublishedOrientation, SensorKind};
//!
//! let engine = MotionEngine::configure(true, Duration::from_millis(30));
//! engine.set_listener(|orientation: PublishedOrientation| {
//!     println!("azimuth {}°", orientation.azimuth_deg)
//! });
//! engine.start().unwrap();
//!
//! // Forward sensor readings as they arrive
//! engine.submit_sample(SensorKind::Magnetic, Vector3::new(0.0, 20.0, -40.0), 0);
//! engine.submit_sample(SensorKind::Accelerometer, Vector3::new(0.0, 0.0, 9.81), 1_000_000);
//! engine.submit_sample(SensorKind::Gyroscope, Vector3::new(0.0, 0.0, 0.1), 2_000_000);
//!
//! println!("{:?}", engine.current_orientation());
//! engine.stop();
//! ```

pub mod compass;
mod engine;
mod error;
pub mod fuser;
pub mod gyro;
mod ingest;
pub mod math;
pub mod publisher;
mod scheduler;
mod types;

// Re-export all public types and functions
pub use compass::TiltCompassEstimator;
pub use engine::{MotionEngine, OrientationListener};
pub use error::{FusionError, Result};
pub use fuser::ComplementaryFuser;
pub use gyro::GyroscopeIntegrator;
pub use ingest::SampleIngest;
pub use math::{DEG_TO_RAD, RAD_TO_DEG};
pub use publisher::{OrientationPublisher, PitchGate};
pub use scheduler::PeriodicTask;
pub use types::*;
