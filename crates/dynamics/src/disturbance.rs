use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Synthetic wave forcing applied to the boat, one sinusoid per axis.
///
/// A pure function of elapsed time: no state, no side effects. The defaults
/// reproduce the tuning the control gains were chosen against, so change
/// them together.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WaveDisturbance {
    /// Roll forcing amplitude (deg/s^2 equivalent torque units).
    pub roll_amplitude: f64,
    /// Roll wave frequency in Hz.
    pub roll_frequency_hz: f64,
    /// Roll wave phase offset in radians.
    pub roll_phase: f64,
    /// Yaw forcing amplitude.
    pub yaw_amplitude: f64,
    /// Yaw wave frequency in Hz.
    pub yaw_frequency_hz: f64,
    /// Yaw wave phase offset in radians.
    pub yaw_phase: f64,
}

impl Default for WaveDisturbance {
    fn default() -> Self {
        WaveDisturbance {
            roll_amplitude: 3.0,
            roll_frequency_hz: 0.25, // ~4 s wave period
            roll_phase: 0.0,
            yaw_amplitude: 2.5,
            yaw_frequency_hz: 0.2, // ~5 s wave period
            yaw_phase: PI / 4.0,
        }
    }
}

impl WaveDisturbance {
    /// A flat sea: zero forcing on both axes.
    pub fn none() -> Self {
        WaveDisturbance {
            roll_amplitude: 0.0,
            yaw_amplitude: 0.0,
            ..Default::default()
        }
    }

    /// Roll forcing at time `t` seconds.
    pub fn roll(&self, t: f64) -> f64 {
        self.roll_amplitude * (2.0 * PI * self.roll_frequency_hz * t + self.roll_phase).sin()
    }

    /// Yaw forcing at time `t` seconds.
    pub fn yaw(&self, t: f64) -> f64 {
        self.yaw_amplitude * (2.0 * PI * self.yaw_frequency_hz * t + self.yaw_phase).sin()
    }
}
