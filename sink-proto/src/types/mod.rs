pub mod channel_map;
pub mod cvolume;
pub mod proplist;
pub mod sample_spec;

pub use channel_map::{ChannelMap, ChannelPosition};
pub use cvolume::{CVolume, Volume};
pub use proplist::{Prop, PropList};
pub use sample_spec::{SampleSpec, SampleFormat};
