//! Metrics sink adapters.

pub mod line_protocol_sink;

pub use line_protocol_sink::LineProtocolSink;
