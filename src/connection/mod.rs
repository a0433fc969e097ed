//! Connections that turn device datagrams into record streams

mod telemetry;

pub use telemetry::TelemetryConnection;
