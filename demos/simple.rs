use std::thread;
use std::time::Duration;

use nalgebra::Vector3;
use orientation_fusion::{FuserRate, MotionEngine, PublishedOrientation, SensorKind};

const SAMPLE_PERIOD: Duration = Duration::from_millis(10); // 100 Hz

fn main() -> orientation_fusion::Result<()> {
    env_logger::init();

    let engine = MotionEngine::configure(true, FuserRate::High.period());
    engine.set_listener(|orientation: PublishedOrientation| {
        println!(
            "Azimuth: {:3}°, Pitch: {:3}° (approx {:3}°), Roll: {:3}°",
            orientation.azimuth_deg,
            orientation.accurate_pitch_deg,
            orientation.approx_pitch_deg,
            orientation.roll_deg
        );
    });
    engine.start()?;

    // Simulated device slowly turning about its Z axis with a biased gyroscope
    let rate = 0.5f32; // rad/s
    let bias = Vector3::new(0.0, 0.0, 0.02);

    for step in 0..300i64 {
        let timestamp = step * SAMPLE_PERIOD.as_nanos() as i64;
        let heading = -rate * step as f32 * SAMPLE_PERIOD.as_secs_f32();

        // replace these with actual sensor readings
        let magnetometer = Vector3::new(-20.0 * heading.sin(), 20.0 * heading.cos(), -40.0);
        let accelerometer = Vector3::new(0.0, 0.0, 9.81);
        let gyroscope = Vector3::new(0.0, 0.0, rate) + bias;

        engine.submit_sample(SensorKind::Magnetic, magnetometer, timestamp);
        engine.submit_sample(SensorKind::Accelerometer, accelerometer, timestamp);
        engine.submit_sample(SensorKind::Gyroscope, gyroscope, timestamp);

        thread::sleep(SAMPLE_PERIOD);
    }

    engine.stop();
    println!("Final: {:?}", engine.current_orientation());
    Ok(())
}
