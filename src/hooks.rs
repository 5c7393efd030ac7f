//! Hook/event publishing.
//!
//! The core's hook dispatcher itself is an external collaborator — only the
//! interface a sink uses to fire events into it is modeled here. A real
//! core would fan these out to extensions, introspection clients, and
//! subscription-event delivery; that machinery lives outside this crate.

use std::fmt::Debug;

use crate::state::SinkState;

/// A point in the sink lifecycle hooks can observe or veto.
#[derive(Debug)]
pub enum SinkEvent<'a> {
    /// Fired right after construction, before the sink is usable.
    /// Vetoing aborts construction entirely.
    New(&'a crate::sink::Sink),
    /// Fired just before `put()` makes the sink live, letting a subscriber
    /// make last adjustments. Vetoing aborts `put()`.
    Fixate(&'a crate::sink::Sink),
    /// Fired once the sink is live and visible to the rest of the core.
    Put(&'a crate::sink::Sink),
    /// Fired at the start of `unlink()`, while the sink is still valid.
    Unlink(&'a crate::sink::Sink),
    /// Fired at the end of `unlink()`, after the sink has been torn down.
    UnlinkPost,
    StateChanged(SinkState),
    ProplistChanged,
}

/// Whether a hook subscriber allows an event to proceed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum HookResult {
    Ok,
    /// Vetoes the operation. Only meaningful for `New` and `Fixate`; ignored
    /// for every other event.
    Veto,
}

/// The NEW/CHANGE/REMOVE taxonomy delivered to introspection clients,
/// separate from the vetoable lifecycle hooks in [`SinkEvent`]. A sink fires
/// `New` from `put`, `Remove` from `unlink`, and `Change` from `set_volume`/
/// `set_mute`/`get_volume`/`get_mute` whenever the observed value actually
/// changed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SubscriptionEvent {
    New,
    Change,
    Remove,
}

/// Something that wants to observe (and, for `New`/`Fixate`, potentially
/// veto) a sink's lifecycle events.
pub trait SinkEventSink: Debug + Send + Sync {
    fn handle(&self, event: &SinkEvent) -> HookResult;

    /// Delivers a subscription event for the sink at `index`. Default is a
    /// no-op so existing `SinkEventSink` implementors don't have to care.
    fn subscription(&self, _event: SubscriptionEvent, _index: u32) {}
}

/// A no-op subscriber that never vetoes, used as the default when a sink is
/// built without an explicit hook sink.
#[derive(Debug)]
pub struct NullEventSink;

impl SinkEventSink for NullEventSink {
    fn handle(&self, _event: &SinkEvent) -> HookResult {
        HookResult::Ok
    }
}
