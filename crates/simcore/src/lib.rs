//! Shared core types for the CMG boat stabilization system.
//!
//! This crate holds the record format exchanged between the simulation
//! engine, the telemetry ingestion pipeline, and any display layer, plus the
//! small traits the model crates implement.

pub mod frame;
pub mod traits;

pub use frame::*;
pub use traits::*;
