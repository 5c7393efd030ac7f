//! The monitor source every sink owns.
//!
//! The monitor *source object* — its name, properties, and sample spec — is
//! in scope here. Monitor *rendering* (resampling the post-mix signal for
//! recording clients, buffering, etc.) is an external collaborator; this
//! module only models the interface the sink pushes post-mix audio through.

use std::fmt::Debug;
use std::sync::Arc;

use sink_proto::{ChannelMap, Memchunk, PropList, Prop, SampleSpec};

/// Receives the sink's post-mix audio. Implemented by whatever owns actual
/// monitor-source rendering/buffering.
pub trait MonitorSink: Debug + Send + Sync {
    fn push(&self, chunk: &Memchunk);

    /// Rewinds the monitor's own history by `nbytes`, mirroring the sink's
    /// `process_rewind`. Default is a no-op for monitors with no history.
    fn process_rewind(&self, _nbytes: usize) {}

    /// Informs the monitor how much rewind history the sink can support.
    fn update_max_rewind(&self, _nbytes: usize) {}
}

/// The monitor source owned by a sink.
///
/// Always present — PulseAudio sinks without `SinkFlags::LATENCY`-style
/// opt-outs still expose a monitor, and this crate doesn't model the
/// `suspend-on-idle`-driven "no monitor" case as a Non-goal exclusion.
#[derive(Debug)]
pub struct Source {
    name: String,
    props: PropList,
    sample_spec: SampleSpec,
    channel_map: ChannelMap,
    monitor: Option<Arc<dyn MonitorSink>>,
    /// Clients listening to this monitor directly (not sink inputs). Counts
    /// toward the owning sink's `linked_by` but never its `used_by` — see
    /// `spec.md` §4.1's asymmetric `linked_by`/`used_by` note.
    clients: usize,
}

impl Source {
    pub fn new(sink_name: &str, sink_description: &str, sample_spec: SampleSpec, channel_map: ChannelMap) -> Self {
        let mut props = PropList::new();
        props.set(Prop::DeviceClass, b"monitor\0".as_ref());
        props.set(Prop::DeviceDescription, format!("Monitor of {}\0", sink_description).into_bytes());

        Source {
            name: format!("{}.monitor", sink_name),
            props,
            sample_spec,
            channel_map,
            monitor: None,
            clients: 0,
        }
    }

    /// Registers a client recording this monitor. Returns the new count.
    pub fn add_client(&mut self) -> usize {
        self.clients += 1;
        self.clients
    }

    /// Unregisters a client recording this monitor.
    pub fn remove_client(&mut self) {
        self.clients = self.clients.saturating_sub(1);
    }

    /// Clients currently recording this monitor — the monitor's own
    /// contribution to the owning sink's `linked_by`.
    pub fn linked_by(&self) -> usize {
        self.clients
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn props(&self) -> &PropList {
        &self.props
    }

    pub fn sample_spec(&self) -> &SampleSpec {
        &self.sample_spec
    }

    pub fn channel_map(&self) -> &ChannelMap {
        &self.channel_map
    }

    /// Registers (or replaces) the monitor-rendering collaborator.
    pub fn set_monitor_sink(&mut self, sink: Arc<dyn MonitorSink>) {
        self.monitor = Some(sink);
    }

    /// Called by the sink's IO thread immediately after a successful
    /// render, with the exact bytes that were produced.
    pub fn push_postmix(&self, chunk: &Memchunk) {
        if let Some(ref monitor) = self.monitor {
            monitor.push(chunk);
        }
    }

    /// Mirrors the owning sink's `process_rewind`: the hardware rewound by
    /// `nbytes`, so the monitor's own history must rewind by the same count.
    pub fn process_rewind(&self, nbytes: usize) {
        if let Some(ref monitor) = self.monitor {
            monitor.process_rewind(nbytes);
        }
    }

    /// Propagates the owning sink's rewind capacity to the monitor.
    pub fn set_max_rewind(&self, nbytes: usize) {
        if let Some(ref monitor) = self.monitor {
            monitor.update_max_rewind(nbytes);
        }
    }

    /// Re-derives `DEVICE_DESCRIPTION` when the owning sink's description
    /// changes (the sink fires `SINK_PROPLIST_CHANGED` for this).
    pub fn update_description(&mut self, sink_description: &str) {
        self.props.set(Prop::DeviceDescription, format!("Monitor of {}\0", sink_description).into_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sink_proto::SampleFormat;

    fn spec() -> SampleSpec {
        SampleSpec::new_checked(SampleFormat::S16Le, 2, 44100).unwrap()
    }

    #[test]
    fn monitor_name_and_device_class() {
        let source = Source::new("analog-out", "Analog Output", spec(), ChannelMap::new());
        assert_eq!(source.name(), "analog-out.monitor");
        let class = source.props().get_string(Prop::DeviceClass).unwrap();
        assert_eq!(class.to_str().unwrap(), "monitor");
    }

    #[derive(Debug)]
    struct RecordingMonitor {
        received: std::sync::Mutex<Vec<u8>>,
    }

    impl MonitorSink for RecordingMonitor {
        fn push(&self, chunk: &Memchunk) {
            self.received.lock().unwrap().extend_from_slice(chunk.as_slice());
        }
    }

    #[test]
    fn push_postmix_forwards_to_registered_monitor() {
        let mut source = Source::new("analog-out", "Analog Output", spec(), ChannelMap::new());
        let monitor = Arc::new(RecordingMonitor { received: std::sync::Mutex::new(Vec::new()) });
        source.set_monitor_sink(monitor.clone());

        source.push_postmix(&Memchunk::from_vec(vec![1, 2, 3, 4]));
        assert_eq!(*monitor.received.lock().unwrap(), vec![1, 2, 3, 4]);
    }
}
