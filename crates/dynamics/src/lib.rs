//! Boat attitude dynamics and the closed-loop CMG stabilization engine.
//!
//! The model is two uncoupled damped-spring rotational axes (roll and yaw)
//! driven by sinusoidal wave disturbances, with one PID controller per axis
//! commanding a CMG gimbal angle against them. Pitch is carried through the
//! state for manual control but has no dynamic model.

pub mod boat;
pub mod disturbance;
pub mod engine;

pub use boat::*;
pub use disturbance::*;
pub use engine::*;
