use control::{PidConfig, PidController, PidError};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use simcore::{Model, TelemetryFrame};
use thiserror::Error;

use crate::{BoatState, SimulationConfig};

/// Errors from violating the engine's stepping contract.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    /// `step` was called with `dt <= 0`. State is left untouched.
    #[error("non-positive time step: {0}")]
    NonPositiveDt(f64),
    #[error(transparent)]
    Pid(#[from] PidError),
}

/// Closed-loop CMG boat stabilization simulation.
///
/// Each axis is a damped spring:
///
/// ```text
/// rate_dot = -c * rate - k * angle + u + disturbance
/// ```
///
/// where `u` is the control torque, approximated as proportional to the CMG
/// gimbal angle commanded by that axis's PID controller (setpoint 0, hold
/// attitude level). Integration is explicit Euler, which is adequate at the
/// step sizes a display tick produces.
pub struct CmgSimulation {
    config: SimulationConfig,
    state: BoatState,
    roll_pid: PidController,
    yaw_pid: PidController,
    rng: StdRng,
}

impl CmgSimulation {
    /// The state a freshly constructed or reset engine starts from: level,
    /// at rest, disks at the nominal flywheel speed.
    pub fn initial_state(config: &SimulationConfig) -> BoatState {
        BoatState {
            disk_roll_rpm: config.base_rpm,
            disk_yaw_rpm: config.base_rpm,
            ..Default::default()
        }
    }

    pub fn new(config: SimulationConfig) -> Self {
        let initial = Self::initial_state(&config);
        Self::with_initial_state(config, initial)
    }

    /// Start from a caller-supplied state, e.g. an initial roll/yaw offset:
    ///
    /// ```
    /// use dynamics::{BoatState, CmgSimulation, SimulationConfig};
    ///
    /// let config = SimulationConfig::default();
    /// let seed = BoatState { roll: 5.0, ..CmgSimulation::initial_state(&config) };
    /// let sim = CmgSimulation::with_initial_state(config, seed);
    /// assert_eq!(sim.state().roll, 5.0);
    /// ```
    pub fn with_initial_state(config: SimulationConfig, initial: BoatState) -> Self {
        let roll_pid = PidController::new(Self::axis_pid(&config, config.roll_pid.kp, config.roll_pid.ki, config.roll_pid.kd));
        let yaw_pid = PidController::new(Self::axis_pid(&config, config.yaw_pid.kp, config.yaw_pid.ki, config.yaw_pid.kd));
        CmgSimulation {
            config,
            state: initial,
            roll_pid,
            yaw_pid,
            rng: StdRng::from_entropy(),
        }
    }

    /// Pin the RPM-noise RNG for reproducible runs.
    pub fn with_seed(config: SimulationConfig, seed: u64) -> Self {
        let mut sim = Self::new(config);
        sim.rng = StdRng::seed_from_u64(seed);
        sim
    }

    fn axis_pid(config: &SimulationConfig, kp: f64, ki: f64, kd: f64) -> PidConfig {
        PidConfig::pid(kp, ki, kd).with_limits(config.servo_angle_min, config.servo_angle_max)
    }

    /// Current simulation state (a copy; the engine's own state cannot be
    /// mutated through it).
    pub fn state(&self) -> BoatState {
        self.state
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Manually set the boat attitude. An external override discards the
    /// angular velocity, not just the position, so both rates are zeroed.
    pub fn set_attitude(&mut self, roll: f64, pitch: f64, yaw: f64) {
        self.state.roll = roll;
        self.state.pitch = pitch;
        self.state.yaw = yaw;
        self.state.roll_rate = 0.0;
        self.state.yaw_rate = 0.0;
    }

    /// Reinitialize to a caller-supplied state and clear both controllers.
    pub fn reset_to(&mut self, initial: BoatState) {
        debug!("simulation reset at t={:.3}", self.state.t);
        self.state = initial;
        self.roll_pid.reset();
        self.yaw_pid.reset();
    }

    /// Advance the simulation by `dt` seconds and return a copy of the
    /// updated state.
    pub fn step(&mut self, dt: f64) -> Result<BoatState, SimError> {
        if dt <= 0.0 {
            return Err(SimError::NonPositiveDt(dt));
        }

        let waves = &self.config.disturbance;
        let roll_disturbance = waves.roll(self.state.t);
        let yaw_disturbance = waves.yaw(self.state.t);

        // Setpoint is always 0: the control objective is to hold level.
        let servo_roll_angle = self.roll_pid.update(self.state.roll, 0.0, dt)?;
        let servo_yaw_angle = self.yaw_pid.update(self.state.yaw, 0.0, dt)?;

        let roll_torque = self.config.roll_control_gain * servo_roll_angle;
        let yaw_torque = self.config.yaw_control_gain * servo_yaw_angle;

        let roll_rate_dot = -self.config.roll_damping * self.state.roll_rate
            - self.config.roll_stiffness * self.state.roll
            + roll_torque
            + roll_disturbance;
        let yaw_rate_dot = -self.config.yaw_damping * self.state.yaw_rate
            - self.config.yaw_stiffness * self.state.yaw
            + yaw_torque
            + yaw_disturbance;

        // Explicit Euler: rate first, then angle from the new rate.
        self.state.roll_rate += roll_rate_dot * dt;
        self.state.roll += self.state.roll_rate * dt;
        self.state.yaw_rate += yaw_rate_dot * dt;
        self.state.yaw += self.state.yaw_rate * dt;

        self.state.servo_roll_angle = servo_roll_angle;
        self.state.servo_yaw_angle = servo_yaw_angle;

        // Flywheels hold nominal speed with a little measurement jitter.
        self.state.disk_roll_rpm =
            self.config.base_rpm + self.rng.gen_range(-0.5..=0.5) * self.config.rpm_noise;
        self.state.disk_yaw_rpm =
            self.config.base_rpm + self.rng.gen_range(-0.5..=0.5) * self.config.rpm_noise;

        self.state.t += dt;

        Ok(self.state)
    }

    /// Map the current state to the shared telemetry record.
    ///
    /// `gyro_y` is always 0: pitch has no dynamic model, intentionally.
    pub fn telemetry_frame(&self) -> TelemetryFrame {
        TelemetryFrame {
            t: self.state.t,
            roll: self.state.roll,
            pitch: self.state.pitch,
            yaw: self.state.yaw,
            gyro_x: self.state.roll_rate,
            gyro_y: 0.0,
            gyro_z: self.state.yaw_rate,
            servo_roll_angle: self.state.servo_roll_angle,
            servo_yaw_angle: self.state.servo_yaw_angle,
            disk_roll_rpm: self.state.disk_roll_rpm,
            disk_yaw_rpm: self.state.disk_yaw_rpm,
        }
    }
}

impl Model for CmgSimulation {
    /// Reset to the default initial state for the engine's configuration.
    fn reset(&mut self) {
        self.reset_to(Self::initial_state(&self.config));
    }
}
