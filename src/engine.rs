//! Orientation engine tying the estimators, fuser and publisher together
//!
//! Sample delivery and the periodic fuser run on different threads. Shared
//! state is split into three lock groups: raw samples, fusion state and
//! published output. Where two are held at once the order is always fusion
//! state before published output. The listener is invoked with no lock held.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use nalgebra::Vector3;
use parking_lot::Mutex;

use crate::compass::TiltCompassEstimator;
use crate::error::Result;
use crate::fuser::ComplementaryFuser;
use crate::gyro::GyroscopeIntegrator;
use crate::ingest::SampleIngest;
use crate::publisher::OrientationPublisher;
use crate::scheduler::PeriodicTask;
use crate::types::{
    FusionFlags, FusionMode, FusionSettings, MIN_FUSER_PERIOD, Orientation, PublishedOrientation,
    SensorKind, SensorSample,
};

/// Receives a notification each time a new orientation has been published
pub trait OrientationListener: Send + Sync {
    fn on_orientation_changed(&self, orientation: PublishedOrientation);
}

impl<F> OrientationListener for F
where
    F: Fn(PublishedOrientation) + Send + Sync,
{
    fn on_orientation_changed(&self, orientation: PublishedOrientation) {
        self(orientation)
    }
}

/// Estimator state mutated by gyroscope samples and fuser ticks
struct FusionState {
    tilt: TiltCompassEstimator,
    gyro: GyroscopeIntegrator,
    fuser: ComplementaryFuser,
}

impl FusionState {
    fn new(settings: &FusionSettings) -> Self {
        Self {
            tilt: TiltCompassEstimator::new(),
            gyro: GyroscopeIntegrator::new(),
            fuser: ComplementaryFuser::new(settings.filter_coefficient),
        }
    }
}

struct Shared {
    settings: FusionSettings,
    running: AtomicBool,
    samples: Mutex<SampleIngest>,
    state: Mutex<FusionState>,
    output: Mutex<OrientationPublisher>,
    listener: Mutex<Option<Arc<dyn OrientationListener>>>,
}

impl Shared {
    /// Discard everything learned during a previous run
    fn reset(&self) {
        *self.samples.lock() = SampleIngest::new();
        *self.state.lock() = FusionState::new(&self.settings);
        *self.output.lock() = OrientationPublisher::new(self.settings.pitch_hysteresis_deg);
    }

    fn submit(&self, sample: SensorSample) {
        let tilt_inputs = {
            let mut samples = self.samples.lock();
            samples.record(sample);
            match sample.kind {
                SensorKind::Accelerometer => samples.tilt_compass_inputs(),
                _ => None,
            }
        };

        match sample.kind {
            SensorKind::Accelerometer => {
                if let Some((accelerometer, magnetometer)) = tilt_inputs {
                    self.update_tilt_compass(accelerometer, magnetometer);
                }
            }
            // Stored only, the next accelerometer sample picks it up
            SensorKind::Magnetic => {}
            SensorKind::Gyroscope => self.integrate_gyroscope(sample),
        }

        self.notify_listener();
    }

    fn update_tilt_compass(&self, accelerometer: Vector3<f32>, magnetometer: Vector3<f32>) {
        let mut state = self.state.lock();
        let was_ready = state.tilt.orientation().is_some();

        // Degenerate input keeps the previous estimate and has already been logged
        let Ok(orientation) = state.tilt.update(accelerometer, magnetometer) else {
            return;
        };

        if !was_ready {
            log::debug!("First tilt-compass estimate {:?}", orientation);
        }
        if self.settings.mode() == FusionMode::TiltCompassOnly {
            self.output.lock().publish(&orientation);
        }
    }

    fn integrate_gyroscope(&self, sample: SensorSample) {
        if self.settings.mode() == FusionMode::TiltCompassOnly {
            log::trace!("Ignoring gyroscope sample, engine configured without gyroscope");
            return;
        }

        let mut state = self.state.lock();
        let reference = state.tilt.orientation();
        state
            .gyro
            .integrate(sample.vector, sample.timestamp_nanos, reference);
    }

    fn tick(&self) {
        if self.settings.mode() == FusionMode::TiltCompassOnly {
            return;
        }

        {
            let mut state = self.state.lock();
            let Some(tilt) = state.tilt.orientation() else {
                log::trace!("Fuser tick skipped, no tilt-compass estimate yet");
                return;
            };
            if !state.gyro.is_seeded() {
                log::trace!("Fuser tick skipped, gyroscope not seeded yet");
                return;
            }

            let gyro = state.gyro.orientation();
            let fused = state.fuser.fuse(gyro, tilt);
            state.gyro.reseed(fused);
            log::trace!("Fused {:?} (gyro {:?}, tilt {:?})", fused, gyro, tilt);

            self.output.lock().publish(&fused);
        }

        self.notify_listener();
    }

    fn notify_listener(&self) {
        let Some(listener) = self.listener.lock().clone() else {
            return;
        };

        let ready = self.output.lock().take_ready();
        if let Some(orientation) = ready {
            listener.on_orientation_changed(orientation);
        }
    }
}

/// Orientation fusion engine
///
/// Feed it raw samples with [`MotionEngine::submit_sample`] and read the
/// result with [`MotionEngine::current_orientation`] or through an
/// [`OrientationListener`].
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use orientation_fusion::{MotionEngine, SensorKind};
///
/// let engine = MotionEngine::configure(false, std::time::Duration::from_millis(30));
/// engine.start().unwrap();
///
/// engine.submit_sample(SensorKind::Magnetic, Vector3::new(0.0, 20.0, -40.0), 0);
/// engine.submit_sample(SensorKind::Accelerometer, Vector3::new(0.0, 0.0, 9.81), 1);
///
/// let orientation = engine.current_orientation();
/// assert_eq!(orientation.azimuth_deg, 0);
/// assert_eq!(orientation.accurate_pitch_deg, 180);
/// engine.stop();
/// ```
pub struct MotionEngine {
    shared: Arc<Shared>,
    fuser_task: Mutex<Option<PeriodicTask>>,
}

impl MotionEngine {
    /// Create a new engine with default settings
    pub fn new() -> Self {
        Self::with_settings(FusionSettings::default())
    }

    /// Create a new engine with the given sensor capability and fuser period
    pub fn configure(has_gyroscope: bool, fuser_period: Duration) -> Self {
        Self::with_settings(FusionSettings {
            has_gyroscope,
            fuser_period_ms: fuser_period.max(MIN_FUSER_PERIOD).as_millis() as u64,
            ..Default::default()
        })
    }

    /// Create a new engine with specified settings
    pub fn with_settings(settings: FusionSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                settings,
                running: AtomicBool::new(false),
                samples: Mutex::new(SampleIngest::new()),
                state: Mutex::new(FusionState::new(&settings)),
                output: Mutex::new(OrientationPublisher::new(settings.pitch_hysteresis_deg)),
                listener: Mutex::new(None),
            }),
            fuser_task: Mutex::new(None),
        }
    }

    /// Start accepting samples and, with a gyroscope, schedule the fuser
    ///
    /// Each start begins from fresh estimator state: the gyroscope must be
    /// seeded again and its first sample applies no rotation.
    ///
    /// # Errors
    /// [`crate::FusionError::SchedulerSpawn`] if the fuser thread cannot start.
    pub fn start(&self) -> Result<()> {
        let mut fuser_task = self.fuser_task.lock();
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.shared.reset();

        let settings = self.shared.settings;
        match settings.mode() {
            FusionMode::Fused => {
                let shared = Arc::clone(&self.shared);
                let task = PeriodicTask::spawn(
                    "fuser",
                    settings.fuser_start_delay(),
                    settings.fuser_period(),
                    move || shared.tick(),
                );
                match task {
                    Ok(task) => *fuser_task = Some(task),
                    Err(err) => {
                        self.shared.running.store(false, Ordering::SeqCst);
                        return Err(err);
                    }
                }
            }
            FusionMode::TiltCompassOnly => {
                log::info!("No gyroscope, publishing tilt-compass orientation directly");
            }
        }

        log::info!("Motion engine started in {:?} mode", settings.mode());
        Ok(())
    }

    /// Stop sample delivery and cancel the fuser, waiting for an in-flight tick
    ///
    /// The last published orientation stays readable until the next start.
    /// Called from a listener on the fuser thread, the fuser is cancelled
    /// without waiting for the tick that invoked the listener.
    pub fn stop(&self) {
        let fuser_task = {
            let mut fuser_task = self.fuser_task.lock();
            if !self.shared.running.swap(false, Ordering::SeqCst) {
                return;
            }
            fuser_task.take()
        };

        // Joined outside the lock so a listener stopping the engine cannot block on it
        if let Some(mut task) = fuser_task {
            task.stop();
        }
        log::info!("Motion engine stopped");
    }

    /// Deliver one raw sensor reading
    ///
    /// Ignored while the engine is stopped.
    ///
    /// # Arguments
    /// * `kind` - Which sensor produced the reading
    /// * `vector` - Accelerometer in m/s², magnetometer in µT, gyroscope in rad/s
    /// * `timestamp_nanos` - Sensor timestamp in nanoseconds
    pub fn submit_sample(&self, kind: SensorKind, vector: Vector3<f32>, timestamp_nanos: i64) {
        if !self.shared.running.load(Ordering::SeqCst) {
            log::trace!("Dropping {:?} sample, engine not running", kind);
            return;
        }

        self.shared
            .submit(SensorSample::new(kind, vector, timestamp_nanos));
    }

    /// Run one fuser cycle now
    ///
    /// The periodic task calls this; hosts with their own scheduler may call
    /// it directly. Does nothing without a gyroscope.
    pub fn tick(&self) {
        self.shared.tick();
    }

    /// Latest published orientation
    pub fn current_orientation(&self) -> PublishedOrientation {
        self.shared.output.lock().current()
    }

    pub fn set_listener<L>(&self, listener: L)
    where
        L: OrientationListener + 'static,
    {
        *self.shared.listener.lock() = Some(Arc::new(listener));
    }

    pub fn reset_listener(&self) {
        self.shared.listener.lock().take();
    }

    /// Latest fused orientation in radians
    pub fn fused_orientation(&self) -> Orientation {
        self.shared.state.lock().fuser.fused()
    }

    /// Latest tilt-compass orientation in radians
    pub fn tilt_compass_orientation(&self) -> Option<Orientation> {
        self.shared.state.lock().tilt.orientation()
    }

    /// Current gyroscope-integrated orientation in radians
    pub fn gyro_orientation(&self) -> Orientation {
        self.shared.state.lock().gyro.orientation()
    }

    pub fn flags(&self) -> FusionFlags {
        let state = self.shared.state.lock();
        FusionFlags {
            mode: self.shared.settings.mode(),
            running: self.shared.running.load(Ordering::SeqCst),
            gyro_ready: state.tilt.orientation().is_some(),
            gyro_seeded: state.gyro.is_seeded(),
        }
    }

    pub fn settings(&self) -> FusionSettings {
        self.shared.settings
    }
}

impl Default for MotionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MotionEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_settings() -> FusionSettings {
        // Long delay so only explicit ticks run during the test
        FusionSettings {
            fuser_start_delay_ms: 60_000,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_engine() {
        let engine = MotionEngine::new();
        let flags = engine.flags();
        assert_eq!(flags.mode, FusionMode::Fused);
        assert!(!flags.running);
        assert!(!flags.gyro_ready);
        assert!(!flags.gyro_seeded);
        assert_eq!(engine.current_orientation(), PublishedOrientation::default());
    }

    #[test]
    fn test_samples_ignored_while_stopped() {
        let engine = MotionEngine::configure(false, Duration::from_millis(30));
        engine.submit_sample(SensorKind::Magnetic, Vector3::new(0.0, 20.0, -40.0), 0);
        engine.submit_sample(SensorKind::Accelerometer, Vector3::new(0.0, 0.0, 9.81), 1);

        assert!(!engine.flags().gyro_ready);
    }

    #[test]
    fn test_start_stop_idempotent() {
        let engine = MotionEngine::with_settings(manual_settings());
        engine.start().unwrap();
        engine.start().unwrap();
        assert!(engine.flags().running);

        engine.stop();
        engine.stop();
        assert!(!engine.flags().running);
    }

    #[test]
    fn test_sub_millisecond_period_is_clamped() {
        let engine = MotionEngine::configure(true, Duration::from_micros(500));
        assert_eq!(engine.settings().fuser_period_ms, 1);
        assert_eq!(engine.settings().fuser_period(), MIN_FUSER_PERIOD);
    }

    #[test]
    fn test_tick_before_estimate_is_noop() {
        let engine = MotionEngine::with_settings(manual_settings());
        engine.start().unwrap();

        engine.tick();
        assert_eq!(engine.fused_orientation(), Orientation::default());
        assert_eq!(engine.current_orientation(), PublishedOrientation::default());
    }

    #[test]
    fn test_gyro_seeded_from_tilt_compass() {
        let engine = MotionEngine::with_settings(manual_settings());
        engine.start().unwrap();

        engine.submit_sample(SensorKind::Gyroscope, Vector3::zeros(), 0);
        assert!(!engine.flags().gyro_seeded);

        engine.submit_sample(SensorKind::Magnetic, Vector3::new(-20.0, 0.0, -40.0), 1);
        engine.submit_sample(SensorKind::Accelerometer, Vector3::new(0.0, 0.0, 9.81), 2);
        assert!(engine.flags().gyro_ready);

        engine.submit_sample(SensorKind::Gyroscope, Vector3::zeros(), 3);
        assert!(engine.flags().gyro_seeded);

        let tilt = engine.tilt_compass_orientation().unwrap();
        assert!((engine.gyro_orientation().azimuth - tilt.azimuth).abs() < 1e-5);
    }
}
