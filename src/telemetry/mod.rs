pub mod publisher;
pub mod telemetry_sink;
pub mod telemetry_source;
