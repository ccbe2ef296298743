use std::f64::consts::PI;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use simcore::TelemetryFrame;

/// A subscriber to one of a source's delivery channels. Shared ownership so
/// registration lists can be snapshotted without holding locks during
/// delivery.
pub type FrameCallback = Arc<dyn Fn(&TelemetryFrame) + Send + Sync>;

/// Handle returned by the `subscribe_*` operations; pass it to
/// [`TelemetrySource::unsubscribe`] to remove the registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(raw: u64) -> Self {
        SubscriptionId(raw)
    }
}

/// A provider of telemetry frames: synthetic, polled from hardware, or any
/// future transport. Variants are selected via configuration, not
/// inheritance.
pub trait TelemetrySource {
    /// All frames currently available (the source's retained window).
    fn initial_data(&self) -> Vec<TelemetryFrame>;

    /// Register for frames accepted into the stream. Sources without live
    /// delivery ignore registrations.
    fn subscribe_accepted(&self, callback: FrameCallback) -> SubscriptionId;

    /// Register for frames rejected as out-of-order (observability only).
    fn subscribe_ignored(&self, callback: FrameCallback) -> SubscriptionId;

    /// Remove a previously registered callback. Unknown or already-removed
    /// ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);

    /// Stop any live delivery. Must be safe to call repeatedly.
    fn disconnect(&self);
}

/// Invoke every callback with the frame, isolating panics per callback so
/// one failing subscriber cannot starve the rest.
pub(crate) fn deliver(callbacks: &[FrameCallback], frame: &TelemetryFrame, channel: &str) {
    for callback in callbacks {
        if panic::catch_unwind(AssertUnwindSafe(|| callback(frame))).is_err() {
            warn!("telemetry {channel} subscriber panicked, continuing with remaining subscribers");
        }
    }
}

/// Parameters for the synthetic open-loop dataset.
#[derive(Debug, Clone, Copy)]
pub struct MockTelemetryConfig {
    pub duration_seconds: f64,
    pub sample_rate_hz: f64,
    pub seed: u64,
}

impl Default for MockTelemetryConfig {
    fn default() -> Self {
        MockTelemetryConfig {
            duration_seconds: 30.0,
            sample_rate_hz: 10.0,
            seed: 0,
        }
    }
}

/// Telemetry source backed by a fixed synthetic dataset.
///
/// The generated motion is open loop: sinusoidal roll/yaw oscillation,
/// gyro rates that are the analytic derivatives plus noise, and servo
/// commands proportionally counteracting the motion. Useful for exercising
/// a display layer without hardware or a simulation running.
pub struct MockTelemetrySource {
    data: Vec<TelemetryFrame>,
}

impl MockTelemetrySource {
    pub fn new(data: Vec<TelemetryFrame>) -> Self {
        MockTelemetrySource { data }
    }

    /// Generate the standard synthetic dataset.
    pub fn generate(config: MockTelemetryConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let dt = 1.0 / config.sample_rate_hz;
        let samples = (config.duration_seconds * config.sample_rate_hz) as usize;
        let base_rpm = 3000.0;

        let mut noise = move |amplitude: f64| rng.gen_range(-0.5..=0.5) * amplitude;

        let mut data = Vec::with_capacity(samples);
        for i in 0..samples {
            let t = i as f64 * dt;

            // Roll: ~4 s period; yaw: ~6 s period, offset phase
            let (roll_amp, roll_freq) = (5.0, 0.25);
            let (yaw_amp, yaw_freq) = (3.0, 0.167);
            let roll = roll_amp * (2.0 * PI * roll_freq * t).sin();
            let yaw = yaw_amp * (2.0 * PI * yaw_freq * t + PI / 4.0).sin();
            let pitch = 0.5 * (2.0 * PI * 0.1 * t).sin() + noise(0.5);

            // Gyro rates: analytic derivatives of the angles, plus jitter
            let gyro_x = 2.0 * PI * roll_freq * roll_amp * (2.0 * PI * roll_freq * t).cos() + noise(2.0);
            let gyro_y = 2.0 * PI * 0.1 * 0.5 * (2.0 * PI * 0.1 * t).cos() + noise(1.0);
            let gyro_z =
                2.0 * PI * yaw_freq * yaw_amp * (2.0 * PI * yaw_freq * t + PI / 4.0).cos() + noise(1.5);

            data.push(TelemetryFrame {
                t,
                roll,
                pitch,
                yaw,
                gyro_x,
                gyro_y,
                gyro_z,
                // Servos counteract the motion proportionally
                servo_roll_angle: -roll * 0.8 + noise(1.0),
                servo_yaw_angle: -yaw * 0.8 + noise(1.0),
                disk_roll_rpm: base_rpm + noise(50.0),
                disk_yaw_rpm: base_rpm + noise(50.0),
            });
        }
        MockTelemetrySource { data }
    }
}

impl Default for MockTelemetrySource {
    fn default() -> Self {
        Self::generate(MockTelemetryConfig::default())
    }
}

impl TelemetrySource for MockTelemetrySource {
    fn initial_data(&self) -> Vec<TelemetryFrame> {
        self.data.clone()
    }

    fn subscribe_accepted(&self, _callback: FrameCallback) -> SubscriptionId {
        SubscriptionId::new(0)
    }

    fn subscribe_ignored(&self, _callback: FrameCallback) -> SubscriptionId {
        SubscriptionId::new(0)
    }

    fn unsubscribe(&self, _id: SubscriptionId) {}

    fn disconnect(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn panicking_subscriber_does_not_block_the_rest() {
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::new(|_: &TelemetryFrame| -> () {
            panic!("subscriber bug");
        }) as FrameCallback;
        let second = {
            let seen = Arc::clone(&seen);
            Arc::new(move |frame: &TelemetryFrame| seen.lock().unwrap().push(frame.t)) as FrameCallback
        };

        let frame = TelemetryFrame { t: 1.0, ..Default::default() };
        deliver(&[first, second], &frame, "accepted");

        assert_eq!(*seen.lock().unwrap(), vec![1.0]);
    }

    #[test]
    fn mock_dataset_shape() {
        let source = MockTelemetrySource::generate(MockTelemetryConfig {
            duration_seconds: 10.0,
            sample_rate_hz: 10.0,
            seed: 42,
        });
        let data = source.initial_data();
        assert_eq!(data.len(), 100);

        // Strictly increasing time at the sample rate
        for pair in data.windows(2) {
            assert!(pair[1].t > pair[0].t);
        }
        // Bounded oscillation, RPM near base
        for frame in &data {
            assert!(frame.roll.abs() <= 5.0);
            assert!(frame.yaw.abs() <= 3.0);
            assert!((frame.disk_roll_rpm - 3000.0).abs() <= 25.0);
        }
    }

    #[test]
    fn mock_generation_is_seed_deterministic() {
        let config = MockTelemetryConfig { seed: 7, ..Default::default() };
        let a = MockTelemetrySource::generate(config).initial_data();
        let b = MockTelemetrySource::generate(config).initial_data();
        assert_eq!(a, b);
    }
}
