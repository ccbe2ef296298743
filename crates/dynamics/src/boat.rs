use serde::{Deserialize, Serialize};

use crate::WaveDisturbance;

/// Internal state of the boat simulation.
///
/// Angles in degrees, rates in degrees per second, disk speeds in RPM.
/// Owned exclusively by one [`CmgSimulation`](crate::CmgSimulation); callers
/// only ever see copies.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BoatState {
    /// Simulation time in seconds.
    pub t: f64,
    pub roll: f64,
    pub roll_rate: f64,
    /// Pitch is settable for manual control/testing only; nothing drives it.
    pub pitch: f64,
    pub yaw: f64,
    pub yaw_rate: f64,
    /// Gimbal angle currently commanded to the roll CMG.
    pub servo_roll_angle: f64,
    /// Gimbal angle currently commanded to the yaw CMG.
    pub servo_yaw_angle: f64,
    /// Flywheel speed of the roll CMG.
    pub disk_roll_rpm: f64,
    /// Flywheel speed of the yaw CMG.
    pub disk_yaw_rpm: f64,
}

/// PID gains for one axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

/// Tuning parameters for the boat simulation. Immutable once the engine is
/// constructed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Damping coefficient for roll (cR).
    pub roll_damping: f64,
    /// Stiffness coefficient for roll (kR).
    pub roll_stiffness: f64,
    /// Damping coefficient for yaw (cY).
    pub yaw_damping: f64,
    /// Stiffness coefficient for yaw (kY).
    pub yaw_stiffness: f64,
    /// Control torque per degree of roll gimbal angle.
    pub roll_control_gain: f64,
    /// Control torque per degree of yaw gimbal angle.
    pub yaw_control_gain: f64,
    pub roll_pid: PidGains,
    pub yaw_pid: PidGains,
    /// Maximum gimbal deflection, degrees (lower bound).
    pub servo_angle_min: f64,
    /// Maximum gimbal deflection, degrees (upper bound).
    pub servo_angle_max: f64,
    /// Nominal flywheel speed for both disks.
    pub base_rpm: f64,
    /// Peak-to-peak-ish amplitude of the flywheel speed noise.
    pub rpm_noise: f64,
    /// Wave forcing applied each step.
    pub disturbance: WaveDisturbance,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            roll_damping: 0.5,    // moderate damping
            roll_stiffness: 0.1,  // low stiffness, the hull likes to oscillate
            yaw_damping: 0.4,
            yaw_stiffness: 0.08,
            roll_control_gain: 0.3,
            yaw_control_gain: 0.25,
            roll_pid: PidGains { kp: 4.0, ki: 1.0, kd: 2.5 },
            yaw_pid: PidGains { kp: 3.5, ki: 0.8, kd: 2.0 },
            servo_angle_min: -30.0,
            servo_angle_max: 30.0,
            base_rpm: 6000.0,
            rpm_noise: 50.0,
            disturbance: WaveDisturbance::default(),
        }
    }
}
