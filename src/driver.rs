//! The capability interface a driver implements to back a sink with real
//! hardware (or anything else that can play PCM).
//!
//! PulseAudio models this with a struct of nullable function pointers set by
//! whichever module owns the sink. A capability interface is the same idea
//! without the unsafety: a driver overrides only the methods it supports,
//! and the default implementations report "not supported" so the sink can
//! fall back to its software path.

use std::fmt::Debug;

use sink_proto::CVolume;
use sink_proto::time::Microseconds;

use crate::state::SinkState;

/// Hooks a driver may implement to take over a capability the sink would
/// otherwise handle in software.
///
/// Every method is optional. A driver that returns `Err` from a hook that
/// previously succeeded causes the sink to mark that capability as failed
/// in its [`DriverFailures`] and fall back to software for the remainder of
/// the sink's lifetime — drivers are not retried after a failure.
pub trait Driver: Debug + Send + Sync {
    /// Pushes a state change down to hardware. Returning `Ok(())` commits the
    /// transition; `Err` aborts it (the sink's state does not change).
    fn set_state(&self, _state: SinkState) -> Result<(), String> {
        Ok(())
    }

    /// Reads the current hardware volume, if the driver has
    /// `SinkFlags::HW_VOLUME_CTRL`.
    fn get_volume(&self) -> Option<CVolume> {
        None
    }

    /// Pushes a volume change to hardware. Only called when the driver has
    /// `SinkFlags::HW_VOLUME_CTRL`.
    fn set_volume(&self, _volume: &CVolume) -> Result<(), String> {
        Ok(())
    }

    fn get_mute(&self) -> Option<bool> {
        None
    }

    fn set_mute(&self, _muted: bool) -> Result<(), String> {
        Ok(())
    }

    /// Hardware-reported output latency, if queryable.
    fn get_latency(&self) -> Option<Microseconds> {
        None
    }

    /// Asks the driver to rewind `nbytes` of already-submitted audio.
    /// Returns the number of bytes the driver could actually rewind.
    fn request_rewind(&self, nbytes: usize) -> Option<usize> {
        let _ = nbytes;
        None
    }

    /// Notifies the driver that the negotiated requested latency changed.
    fn update_requested_latency(&self, _latency: Microseconds) {}
}

/// Tracks which [`Driver`] hooks have permanently failed and should no
/// longer be called.
#[derive(Debug, Default)]
pub struct DriverFailures {
    pub set_state: bool,
    pub get_volume: bool,
    pub set_volume: bool,
    pub get_mute: bool,
    pub set_mute: bool,
    pub get_latency: bool,
    pub request_rewind: bool,
}
