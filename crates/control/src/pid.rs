//! PID (Proportional-Integral-Derivative) controller
//!
//! Stateful control law with output saturation and anti-windup applied to
//! the integral accumulator itself, not just the final output.

use serde::{Deserialize, Serialize};
use simcore::Model;
use thiserror::Error;

/// Guards the anti-windup bound against division by zero when `ki == 0`.
/// With a zero integral gain the accumulator clamp becomes
/// `|output range| / 1e-6` — finite but effectively unbounded, which is
/// harmless since the accumulator then contributes nothing to the output.
pub const ANTI_WINDUP_EPS: f64 = 1e-6;

/// Errors from violating the controller's calling contract.
#[derive(Debug, Error, PartialEq)]
pub enum PidError {
    /// `update` was called with `dt <= 0`; the derivative term would divide
    /// by zero. Controller state is left untouched.
    #[error("non-positive time step: {0}")]
    NonPositiveDt(f64),
}

/// Configuration for a PID controller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PidConfig {
    /// Proportional gain
    pub kp: f64,
    /// Integral gain
    pub ki: f64,
    /// Derivative gain
    pub kd: f64,
    /// Minimum output value
    pub output_min: f64,
    /// Maximum output value
    pub output_max: f64,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            output_min: f64::NEG_INFINITY,
            output_max: f64::INFINITY,
        }
    }
}

impl PidConfig {
    /// Create a PID configuration with the three gains and no output limits.
    pub fn pid(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd, ..Default::default() }
    }

    /// Set output limits.
    pub fn with_limits(mut self, min: f64, max: f64) -> Self {
        self.output_min = min;
        self.output_max = max;
        self
    }

    /// The magnitude the integral accumulator is clamped to.
    pub fn integrator_bound(&self) -> f64 {
        ((self.output_max - self.output_min) / (self.ki + ANTI_WINDUP_EPS)).abs()
    }
}

/// PID controller with state.
#[derive(Debug, Clone)]
pub struct PidController {
    config: PidConfig,
    integrator: f64,
    prev_error: Option<f64>,
}

impl PidController {
    /// Create a new controller with a zeroed accumulator and no error
    /// history.
    pub fn new(config: PidConfig) -> Self {
        Self {
            config,
            integrator: 0.0,
            prev_error: None,
        }
    }

    /// Update the controller with a new measurement and return the control
    /// output, clamped to the configured limits.
    ///
    /// The derivative term is zero on the first call after construction or
    /// `reset` (there is no previous error to difference against).
    pub fn update(&mut self, measurement: f64, setpoint: f64, dt: f64) -> Result<f64, PidError> {
        if dt <= 0.0 {
            return Err(PidError::NonPositiveDt(dt));
        }

        let error = setpoint - measurement;

        let p_term = self.config.kp * error;

        // Anti-windup: the accumulator itself is bounded, so a long stretch
        // of saturated output cannot wind it up past what the output range
        // can ever use.
        self.integrator += error * dt;
        let bound = self.config.integrator_bound();
        self.integrator = self.integrator.clamp(-bound, bound);
        let i_term = self.config.ki * self.integrator;

        let d_term = match self.prev_error {
            Some(prev) => self.config.kd * (error - prev) / dt,
            None => 0.0,
        };
        self.prev_error = Some(error);

        let output = p_term + i_term + d_term;
        Ok(output.clamp(self.config.output_min, self.config.output_max))
    }

    /// Get the current integral accumulator value.
    pub fn integral(&self) -> f64 {
        self.integrator
    }

    /// Get the error from the previous update, if any.
    pub fn prev_error(&self) -> Option<f64> {
        self.prev_error
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &PidConfig {
        &self.config
    }
}

impl Model for PidController {
    /// Clear the accumulator and error history; gains and limits stay.
    fn reset(&mut self) {
        self.integrator = 0.0;
        self.prev_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn proportional_output() {
        let mut ctrl = PidController::new(PidConfig::pid(2.0, 0.0, 0.0));
        // error = 10 - 4 = 6, P output 12
        let output = ctrl.update(4.0, 10.0, 0.01).unwrap();
        assert_relative_eq!(output, 12.0);
    }

    #[test]
    fn output_saturation() {
        let config = PidConfig::pid(1.0, 0.0, 0.0).with_limits(-30.0, 30.0);
        let mut ctrl = PidController::new(config);

        // Raw P term is -50, must clamp to the lower limit
        let output = ctrl.update(50.0, 0.0, 1.0).unwrap();
        assert_relative_eq!(output, -30.0);

        let output = ctrl.update(-50.0, 0.0, 1.0).unwrap();
        assert_relative_eq!(output, 30.0);
    }

    #[test]
    fn zero_error_fixed_point() {
        let mut ctrl = PidController::new(PidConfig::pid(3.0, 0.0, 1.5).with_limits(-30.0, 30.0));

        ctrl.update(5.0, 5.0, 0.1).unwrap();
        assert_eq!(ctrl.prev_error(), Some(0.0));

        // Identical call: error still zero, derivative of zero, no output
        let output = ctrl.update(5.0, 5.0, 0.1).unwrap();
        assert_relative_eq!(output, 0.0);
    }

    #[test]
    fn derivative_zero_on_first_call() {
        let mut ctrl = PidController::new(PidConfig::pid(0.0, 0.0, 10.0));
        let output = ctrl.update(5.0, 0.0, 0.01).unwrap();
        assert_relative_eq!(output, 0.0);

        // Second call with a changed error produces a derivative
        let output = ctrl.update(4.0, 0.0, 0.01).unwrap();
        assert_relative_eq!(output, 10.0 * 1.0 / 0.01);
    }

    #[test]
    fn anti_windup_bounds_integrator() {
        let config = PidConfig::pid(0.0, 2.0, 0.0).with_limits(-10.0, 10.0);
        let mut ctrl = PidController::new(config);
        let bound = config.integrator_bound();

        // Hold a large error long enough to saturate many times over
        for _ in 0..1000 {
            ctrl.update(0.0, 100.0, 0.1).unwrap();
        }
        assert!(ctrl.integral() <= bound);
        assert!(ctrl.integral() >= -bound);
        // And the bound is what the config formula says: 20 / (2 + eps)
        assert_relative_eq!(bound, 20.0 / (2.0 + ANTI_WINDUP_EPS));
    }

    #[test]
    fn zero_ki_clamp_is_finite() {
        let config = PidConfig::pid(1.0, 0.0, 0.0).with_limits(-30.0, 30.0);
        assert!(config.integrator_bound().is_finite());

        let mut ctrl = PidController::new(config);
        for _ in 0..100 {
            ctrl.update(0.0, 1.0, 0.1).unwrap();
        }
        assert!(ctrl.integral().is_finite());
    }

    #[test]
    fn rejects_non_positive_dt() {
        let mut ctrl = PidController::new(PidConfig::pid(1.0, 1.0, 1.0));
        ctrl.update(0.0, 1.0, 0.1).unwrap();
        let integral_before = ctrl.integral();

        assert_eq!(ctrl.update(0.0, 1.0, 0.0), Err(PidError::NonPositiveDt(0.0)));
        assert_eq!(ctrl.update(0.0, 1.0, -0.5), Err(PidError::NonPositiveDt(-0.5)));

        // Rejected calls leave state untouched
        assert_relative_eq!(ctrl.integral(), integral_before);
        assert_eq!(ctrl.prev_error(), Some(1.0));
    }

    #[test]
    fn reset_clears_state_keeps_gains() {
        let mut ctrl = PidController::new(PidConfig::pid(1.0, 1.0, 1.0).with_limits(-5.0, 5.0));
        for _ in 0..10 {
            ctrl.update(0.0, 10.0, 0.1).unwrap();
        }
        assert!(ctrl.integral() > 0.0);
        assert!(ctrl.prev_error().is_some());

        ctrl.reset();
        assert_relative_eq!(ctrl.integral(), 0.0);
        assert_eq!(ctrl.prev_error(), None);
        assert_relative_eq!(ctrl.config().kp, 1.0);
        assert_relative_eq!(ctrl.config().output_max, 5.0);
    }

    #[test]
    fn pi_eliminates_steady_state_error() {
        let config = PidConfig::pid(1.0, 5.0, 0.0).with_limits(-100.0, 100.0);
        let mut ctrl = PidController::new(config);

        // Simple integrating plant: measurement += output * dt
        let mut measurement = 0.0;
        let dt = 0.01;
        for _ in 0..500 {
            let output = ctrl.update(measurement, 10.0, dt).unwrap();
            measurement += output * dt;
        }
        assert!((measurement - 10.0).abs() < 1.0, "expected ~10.0, got {measurement}");
    }
}
