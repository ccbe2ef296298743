//! Closed-loop control for the CMG gimbal servos.
//!
//! This crate provides the PID controller used once per stabilized axis
//! (roll and yaw), with output saturation and anti-windup on the integral
//! accumulator.

pub mod pid;

pub use pid::*;
