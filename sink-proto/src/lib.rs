//! Shared primitive types for the sink core: sample specs, channel maps,
//! volumes, property lists, and ref-counted memory chunks.

#![doc(html_root_url = "https://docs.rs/sinkd/0.1.0")]
#![warn(missing_debug_implementations)]

#[macro_use] extern crate log;
#[macro_use] extern crate num_derive;
#[macro_use] extern crate failure;
#[macro_use] extern crate bitflags;
extern crate num_traits;

pub mod error;
pub mod idxset;
pub mod memchunk;
pub mod time;
mod types;
pub mod string;

pub use types::*;
pub use error::*;
pub use memchunk::{Memblock, Memchunk, SilenceCache};
