//! Read-only diagnostics listener.
//!
//! The loop publishes a [`FrameTelemetry`] snapshot after every frame; a
//! small HTTP listener on its own thread serves the latest one as JSON.
//! Nothing flows back into the loop.

mod server;
mod telemetry;

pub use server::{spawn, DiagnosticsHandle, TelemetryPublisher};
pub use telemetry::FrameTelemetry;
