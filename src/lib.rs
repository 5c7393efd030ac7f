//! A mixing sink core: the control/IO-thread split, per-stream PCM mixing
//! with volume and mute, the sink state machine, attach/detach discipline,
//! the rewind protocol, and ghost-stream move-with-buffering.
//!
//! A driver wires this up by building a [`Sink`] with [`Sink::builder`],
//! handing the returned [`thread_info::SinkThreadInfo`] to its realtime IO
//! loop, and implementing [`Driver`] for whatever hardware capabilities it
//! actually has.

#![doc(html_root_url = "https://docs.rs/sinkd/0.1.0")]
#![warn(missing_debug_implementations)]

#[macro_use] extern crate log;
#[macro_use] extern crate bitflags;

pub mod config;
pub mod driver;
pub mod error;
pub mod ghost;
pub mod hooks;
pub mod memblockq;
pub mod message;
pub mod mixer;
pub mod sink;
pub mod sink_input;
pub mod source;
pub mod state;
pub mod thread_info;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use config::SinkDefaults;
pub use driver::Driver;
pub use error::SinkError;
pub use sink::{Sink, SinkBuilder};
pub use sink_input::{PeekOutcome, SinkInput};
pub use source::{MonitorSink, Source};
pub use state::{SinkFlags, SinkState};
pub use thread_info::SinkThreadInfo;
