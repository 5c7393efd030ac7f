//! Sink state machine and capability flags.

use std::fmt;

bitflags! {
    pub struct SinkFlags: u32 {
        /// Supports hardware volume control. Dynamic; may change at runtime.
        const HW_VOLUME_CTRL = 0x0001;
        /// Supports latency querying.
        const LATENCY = 0x0002;
        /// Is a hardware sink, as opposed to a virtual/software one.
        const HARDWARE = 0x0004;
        /// Is a networked sink.
        const NETWORK = 0x0008;
        /// Supports hardware mute control. Dynamic.
        const HW_MUTE_CTRL = 0x0010;
        /// Volume can be translated to dB.
        const DECIBEL_VOLUME = 0x0020;
        /// The latency can be adjusted dynamically depending on the needs of
        /// the connected streams.
        const DYNAMIC_LATENCY = 0x0080;
    }
}

/// Lifecycle state of a sink, as observed from the control side.
///
/// Transitions: `Init -> Idle|Running -> Suspended -> Idle|Running -> ... -> Unlinked`.
/// `Unlinked` is terminal; nothing transitions out of it.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum SinkState {
    /// Constructed but not yet `put()` — not visible to inputs or the core.
    Init,
    /// Linked and accepting inputs, but none are currently producing audio.
    Idle,
    /// Linked, with at least one unmuted, uncorked input attached.
    Running,
    /// Explicitly suspended (e.g. by `pasuspender`/power management); the
    /// driver's IO loop may stop polling entirely.
    Suspended,
    /// Unlinked and in the process of, or finished, tearing down. Terminal.
    Unlinked,
}

impl SinkState {
    /// Whether the sink is still linked into the core (i.e. not `Init` and
    /// not `Unlinked`).
    pub fn is_linked(&self) -> bool {
        matches!(self, SinkState::Idle | SinkState::Running | SinkState::Suspended)
    }

    /// Whether the IO thread should be rendering audio in this state.
    pub fn is_opened(&self) -> bool {
        matches!(self, SinkState::Idle | SinkState::Running)
    }
}

impl fmt::Display for SinkState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match *self {
            SinkState::Init => "INIT",
            SinkState::Idle => "IDLE",
            SinkState::Running => "RUNNING",
            SinkState::Suspended => "SUSPENDED",
            SinkState::Unlinked => "UNLINKED",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlinked_is_not_linked() {
        assert!(!SinkState::Unlinked.is_linked());
        assert!(!SinkState::Init.is_linked());
        assert!(SinkState::Suspended.is_linked());
    }

    #[test]
    fn only_idle_and_running_are_opened() {
        assert!(SinkState::Idle.is_opened());
        assert!(SinkState::Running.is_opened());
        assert!(!SinkState::Suspended.is_opened());
        assert!(!SinkState::Init.is_opened());
        assert!(!SinkState::Unlinked.is_opened());
    }
}
