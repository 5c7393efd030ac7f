//! Re-exports the shared `SinkError` type; sinkd has no error variants of
//! its own beyond what `sink-proto` already defines.

pub use sink_proto::error::SinkError;
