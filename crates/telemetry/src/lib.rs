//! Real-time telemetry ingestion.
//!
//! Converts an unreliable, possibly-reordering external feed (HTTP polling
//! of a latest-frame resource) into a strictly ordered, deduplicated,
//! bounded stream of [`simcore::TelemetryFrame`]s, fanned out to local
//! subscribers on separate "accepted" and "ignored" channels.
//!
//! The dedup/order/validation rules live in [`IngestFilter`], free of any
//! transport, so they can be exercised directly; [`HttpTelemetrySource`]
//! drives the filter from a single polling thread.

pub mod buffer;
pub mod clock;
pub mod filter;
pub mod http;
pub mod source;
pub mod wire;

pub use buffer::*;
pub use clock::*;
pub use filter::*;
pub use http::*;
pub use source::*;
pub use wire::*;
