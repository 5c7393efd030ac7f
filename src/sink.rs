//! The control-thread view of a sink: the half of the object that other
//! control-thread code (the core, clients, extensions) actually talks to.
//!
//! Nothing here touches audio data. Every operation either updates
//! control-side bookkeeping directly or posts/sends a [`crate::message::Message`]
//! to the IO thread, which is the only thing allowed to mutate
//! [`crate::thread_info::SinkThreadInfo`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use parking_lot::RwLock;

use sink_proto::idxset::IdxSet;
use sink_proto::time::Microseconds;
use sink_proto::{ChannelMap, CVolume, SampleSpec, SinkError, Volume};

use crate::config::SinkDefaults;
use crate::driver::{Driver, DriverFailures};
use crate::hooks::{HookResult, NullEventSink, SinkEvent, SinkEventSink, SubscriptionEvent};
use crate::message::{self, Message, MessageReceiver, MessageSender};
use crate::sink_input::SinkInput;
use crate::source::Source;
use crate::state::{SinkFlags, SinkState};
use crate::thread_info::InputIdx;

/// Control-side bookkeeping for an attached input — not the input itself
/// (which the IO thread owns exclusively once attached).
struct InputHandle {
    corked: Arc<AtomicBool>,
    /// Sync-group neighbors, patched in only at attach time (see
    /// `Sink::attach_input`). Dynamic re-grouping of already-attached
    /// streams isn't modeled.
    sync_prev: Option<InputIdx>,
    sync_next: Option<InputIdx>,
}

/// Compares two volumes for equality, since `CVolume`/`Volume` have no
/// `PartialEq` of their own.
fn cvolume_eq(a: &CVolume, b: &CVolume) -> bool {
    a.len() == b.len() && a.volumes().iter().zip(b.volumes().iter()).all(|(x, y)| x.as_u32() == y.as_u32())
}

struct Shared {
    state: SinkState,
    name: String,
    description: String,
    sample_spec: SampleSpec,
    channel_map: ChannelMap,
    volume: CVolume,
    muted: bool,
    attached: bool,
    inputs: IdxSet<InputHandle>,
    driver_failures: DriverFailures,
}

/// A mixing sink: the control-side handle. Cloning a `Sink` is cheap (it's
/// a handle around shared state) and all clones refer to the same sink.
pub struct Sink {
    index: u32,
    flags: SinkFlags,
    n_volume_steps: u32,
    base_volume: Volume,
    defaults: SinkDefaults,
    driver: Option<Arc<dyn Driver>>,
    hooks: Arc<dyn SinkEventSink>,
    shared: RwLock<Shared>,
    source: Arc<Mutex<Source>>,
    tx: MessageSender,
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let shared = self.shared.read();
        f.debug_struct("Sink")
            .field("index", &self.index)
            .field("name", &shared.name)
            .field("state", &shared.state)
            .field("inputs", &shared.inputs.len())
            .finish()
    }
}

/// Builder for a new [`Sink`]. Mirrors the teacher crate's `Sink::new_dummy`
/// convenience constructor, generalized into a proper builder since real
/// sinks need a driver, flags, and defaults a dummy sink doesn't.
pub struct SinkBuilder {
    index: u32,
    name: String,
    description: Option<String>,
    sample_spec: SampleSpec,
    channel_map: ChannelMap,
    flags: SinkFlags,
    defaults: SinkDefaults,
    driver: Option<Arc<dyn Driver>>,
    hooks: Option<Arc<dyn SinkEventSink>>,
}

impl SinkBuilder {
    pub fn new(index: u32, name: impl Into<String>, sample_spec: SampleSpec, channel_map: ChannelMap) -> Self {
        SinkBuilder {
            index,
            name: name.into(),
            description: None,
            sample_spec,
            channel_map,
            flags: SinkFlags::empty(),
            defaults: SinkDefaults::default(),
            driver: None,
            hooks: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn flags(mut self, flags: SinkFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn defaults(mut self, defaults: SinkDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn driver(mut self, driver: Arc<dyn Driver>) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn SinkEventSink>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Builds the sink and its IO-thread counterpart.
    ///
    /// The sink starts in `SinkState::Init`: it exists and is addressable,
    /// but isn't attached to anything or visible to the rest of the core
    /// until [`Sink::put`] is called. Fires `SINK_NEW`; a veto from a hook
    /// subscriber fails construction.
    pub fn build(self) -> Result<(Sink, crate::thread_info::SinkThreadInfo, MessageReceiver), SinkError> {
        if self.channel_map.len() != self.sample_spec.channels() {
            return Err(SinkError::InvalidSpec(format!(
                "channel map has {} channels but sample spec has {}",
                self.channel_map.len(),
                self.sample_spec.channels()
            )));
        }
        if !crate::mixer::is_supported(self.sample_spec.format()) {
            return Err(SinkError::InvalidSpec(format!(
                "sample format {:?} is not supported by the mixer",
                self.sample_spec.format()
            )));
        }

        let description = self.description.clone().unwrap_or_else(|| self.name.clone());
        let hooks = self.hooks.unwrap_or_else(|| Arc::new(NullEventSink));
        let (tx, rx) = message::channel();

        let mut volume = CVolume::new();
        for _ in 0..self.sample_spec.channels() {
            volume.push(Volume::NORM).unwrap();
        }

        let source = Arc::new(Mutex::new(Source::new(
            &self.name,
            &description,
            self.sample_spec.clone(),
            self.channel_map.clone(),
        )));

        let thread_info = crate::thread_info::SinkThreadInfo::new(
            self.sample_spec.clone(),
            volume.clone(),
            self.defaults.max_mixed_inputs,
            self.defaults.min_latency(),
            self.defaults.max_latency(),
            source.clone(),
        );

        let sink = Sink {
            index: self.index,
            flags: self.flags,
            n_volume_steps: 65,
            base_volume: Volume::NORM,
            defaults: self.defaults,
            driver: self.driver,
            hooks: hooks.clone(),
            shared: RwLock::new(Shared {
                state: SinkState::Init,
                name: self.name,
                description,
                sample_spec: self.sample_spec,
                channel_map: self.channel_map,
                volume,
                muted: false,
                attached: true,
                inputs: IdxSet::new(),
                driver_failures: DriverFailures::default(),
            }),
            source,
            tx,
        };

        if hooks.handle(&SinkEvent::New(&sink)) == HookResult::Veto {
            return Err(SinkError::Vetoed);
        }

        Ok((sink, thread_info, rx))
    }
}

impl Sink {
    pub fn builder(index: u32, name: impl Into<String>, sample_spec: SampleSpec, channel_map: ChannelMap) -> SinkBuilder {
        SinkBuilder::new(index, name, sample_spec, channel_map)
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn name(&self) -> String {
        self.shared.read().name.clone()
    }

    pub fn description(&self) -> String {
        self.shared.read().description.clone()
    }

    /// Changes the sink's human-readable description, firing
    /// `SINK_PROPLIST_CHANGED` and syncing the monitor source's
    /// `DEVICE_DESCRIPTION` to match.
    pub fn set_description(&self, description: impl Into<String>) {
        let description = description.into();
        {
            let mut shared = self.shared.write();
            shared.description = description.clone();
        }
        self.source.lock().unwrap().update_description(&description);
        self.hooks.handle(&SinkEvent::ProplistChanged);
    }

    pub fn state(&self) -> SinkState {
        self.shared.read().state
    }

    pub fn sample_spec(&self) -> SampleSpec {
        self.shared.read().sample_spec.clone()
    }

    pub fn channel_map(&self) -> ChannelMap {
        self.shared.read().channel_map.clone()
    }

    pub fn flags(&self) -> SinkFlags {
        self.flags
    }

    pub fn n_volume_steps(&self) -> u32 {
        self.n_volume_steps
    }

    pub fn base_volume(&self) -> Volume {
        self.base_volume
    }

    /// Makes the sink live: visible to the rest of the core and ready to
    /// accept inputs. Fires `SINK_FIXATE` (vetoable) then `SINK_PUT`.
    /// No-op if already put.
    pub fn put(&self) -> Result<(), SinkError> {
        {
            let state = self.shared.read().state;
            if state != SinkState::Init {
                return Ok(());
            }
        }

        if self.hooks.handle(&SinkEvent::Fixate(self)) == HookResult::Veto {
            return Err(SinkError::Vetoed);
        }

        self.set_state(SinkState::Idle)?;
        self.hooks.handle(&SinkEvent::Put(self));
        self.hooks.subscription(SubscriptionEvent::New, self.index);
        info!("sink {:?} ({}): put", self.index, self.name());
        Ok(())
    }

    /// Tears the sink down: detaches every input, transitions to
    /// `Unlinked`, and fires `SINK_UNLINK`/`SINK_UNLINK_POST`. Idempotent —
    /// calling `unlink` on an already-unlinked sink is a no-op, matching the
    /// PulseAudio behavior this is grounded on.
    pub fn unlink(&self) {
        {
            let state = self.shared.read().state;
            if state == SinkState::Unlinked {
                return;
            }
        }

        self.hooks.handle(&SinkEvent::Unlink(self));

        let indices: Vec<InputIdx> = {
            let shared = self.shared.read();
            shared.inputs.indices().map(|idx| InputIdx::from_raw(idx.value())).collect()
        };
        for idx in indices {
            let _ = self.kill_input(idx);
        }

        {
            let mut shared = self.shared.write();
            shared.state = SinkState::Unlinked;
        }
        let _ = self.tx.post(Message::SetState(SinkState::Unlinked));

        self.hooks.handle(&SinkEvent::UnlinkPost);
        self.hooks.subscription(SubscriptionEvent::Remove, self.index);
        info!("sink {:?}: unlinked", self.index);
    }

    /// Requests a state transition, pushing it to the driver first (which
    /// may veto it) and to the IO thread on success.
    pub fn set_state(&self, state: SinkState) -> Result<(), SinkError> {
        let can_call_driver = {
            let shared = self.shared.read();
            !shared.driver_failures.set_state
        };

        if can_call_driver {
            if let Some(ref driver) = self.driver {
                if let Err(reason) = driver.set_state(state) {
                    warn!("sink {:?}: driver set_state failed, falling back to software: {}", self.index, reason);
                    self.shared.write().driver_failures.set_state = true;
                }
            }
        }

        {
            let mut shared = self.shared.write();
            if shared.state == state {
                return Ok(());
            }
            shared.state = state;
        }

        self.tx
            .post(Message::SetState(state))
            .map_err(|e| SinkError::QueueFailed(e.to_string()))?;
        self.hooks.handle(&SinkEvent::StateChanged(state));
        debug!("sink {:?}: state -> {}", self.index, state);
        Ok(())
    }

    /// Suspends or resumes the sink (`Suspended` <-> `Idle`). A no-op if the
    /// sink isn't currently linked.
    pub fn suspend(&self, suspend: bool) -> Result<(), SinkError> {
        let state = self.shared.read().state;
        if !state.is_linked() {
            return Ok(());
        }
        if suspend {
            self.set_state(SinkState::Suspended)
        } else {
            self.set_state(SinkState::Idle)
        }
    }

    /// Detaches the sink from its driver without touching attached inputs —
    /// used while the driver is being reconfigured. The IO thread keeps
    /// running (inputs are still drained via `skip`), it just stops handing
    /// rendered audio to hardware.
    pub fn detach(&self) -> Result<(), SinkError> {
        self.shared.write().attached = false;
        self.tx.post(Message::Detach).map_err(|e| SinkError::QueueFailed(e.to_string()))
    }

    pub fn attach(&self) -> Result<(), SinkError> {
        self.shared.write().attached = true;
        self.tx.post(Message::Attach).map_err(|e| SinkError::QueueFailed(e.to_string()))
    }

    pub fn is_attached(&self) -> bool {
        self.shared.read().attached
    }

    /// Sets the sink's master volume. Pushes to hardware first if the
    /// driver supports `HW_VOLUME_CTRL`; a driver failure here disables
    /// that hook permanently and falls back to the software mixer.
    pub fn set_volume(&self, volume: CVolume) -> Result<(), SinkError> {
        let can_call_driver = {
            let shared = self.shared.read();
            self.flags.contains(SinkFlags::HW_VOLUME_CTRL) && !shared.driver_failures.set_volume
        };
        if can_call_driver {
            if let Some(ref driver) = self.driver {
                if let Err(reason) = driver.set_volume(&volume) {
                    warn!("sink {:?}: driver set_volume failed, falling back to software: {}", self.index, reason);
                    self.shared.write().driver_failures.set_volume = true;
                }
            }
        }

        let changed = {
            let mut shared = self.shared.write();
            let changed = !cvolume_eq(&shared.volume, &volume);
            shared.volume = volume.clone();
            changed
        };
        self.tx
            .post(Message::SetVolume(volume))
            .map_err(|e| SinkError::QueueFailed(e.to_string()))?;
        if changed {
            self.hooks.subscription(SubscriptionEvent::Change, self.index);
        }
        Ok(())
    }

    /// Reads the sink's volume. Queries the driver synchronously if it has
    /// hardware volume control and that hook hasn't failed; otherwise
    /// queries the IO thread for the software volume currently in effect.
    pub fn get_volume(&self) -> Result<CVolume, SinkError> {
        let can_call_driver = {
            let shared = self.shared.read();
            self.flags.contains(SinkFlags::HW_VOLUME_CTRL) && !shared.driver_failures.get_volume
        };
        if can_call_driver {
            if let Some(ref driver) = self.driver {
                if let Some(vol) = driver.get_volume() {
                    self.refresh_volume(vol.clone());
                    return Ok(vol);
                }
                self.shared.write().driver_failures.get_volume = true;
            }
        }
        let vol = self.tx.get_volume().map_err(|_| SinkError::QueueFailed("IO thread gone".into()))?;
        self.refresh_volume(vol.clone());
        Ok(vol)
    }

    /// Updates cached `shared.volume` to a freshly observed value, firing a
    /// CHANGE subscription event iff it actually differs from what was
    /// cached before (e.g. the hardware volume drifted out of band).
    fn refresh_volume(&self, vol: CVolume) {
        let changed = {
            let mut shared = self.shared.write();
            let changed = !cvolume_eq(&shared.volume, &vol);
            shared.volume = vol;
            changed
        };
        if changed {
            self.hooks.subscription(SubscriptionEvent::Change, self.index);
        }
    }

    pub fn set_mute(&self, muted: bool) -> Result<(), SinkError> {
        let can_call_driver = {
            let shared = self.shared.read();
            self.flags.contains(SinkFlags::HW_MUTE_CTRL) && !shared.driver_failures.set_mute
        };
        if can_call_driver {
            if let Some(ref driver) = self.driver {
                if let Err(reason) = driver.set_mute(muted) {
                    warn!("sink {:?}: driver set_mute failed, falling back to software: {}", self.index, reason);
                    self.shared.write().driver_failures.set_mute = true;
                }
            }
        }
        let changed = {
            let mut shared = self.shared.write();
            let changed = shared.muted != muted;
            shared.muted = muted;
            changed
        };
        self.tx.post(Message::SetMute(muted)).map_err(|e| SinkError::QueueFailed(e.to_string()))?;
        if changed {
            self.hooks.subscription(SubscriptionEvent::Change, self.index);
        }
        Ok(())
    }

    pub fn get_mute(&self) -> Result<bool, SinkError> {
        let can_call_driver = {
            let shared = self.shared.read();
            self.flags.contains(SinkFlags::HW_MUTE_CTRL) && !shared.driver_failures.get_mute
        };
        if can_call_driver {
            if let Some(ref driver) = self.driver {
                if let Some(muted) = driver.get_mute() {
                    self.refresh_mute(muted);
                    return Ok(muted);
                }
                self.shared.write().driver_failures.get_mute = true;
            }
        }
        let muted = self.tx.get_mute().map_err(|_| SinkError::QueueFailed("IO thread gone".into()))?;
        self.refresh_mute(muted);
        Ok(muted)
    }

    fn refresh_mute(&self, muted: bool) {
        let changed = {
            let mut shared = self.shared.write();
            let changed = shared.muted != muted;
            shared.muted = muted;
            changed
        };
        if changed {
            self.hooks.subscription(SubscriptionEvent::Change, self.index);
        }
    }

    pub fn get_latency(&self) -> Result<Microseconds, SinkError> {
        let can_call_driver = {
            let shared = self.shared.read();
            self.flags.contains(SinkFlags::LATENCY) && !shared.driver_failures.get_latency
        };
        if can_call_driver {
            if let Some(ref driver) = self.driver {
                if let Some(latency) = driver.get_latency() {
                    return Ok(latency);
                }
                self.shared.write().driver_failures.get_latency = true;
            }
        }
        self.tx.get_latency().map_err(|_| SinkError::QueueFailed("IO thread gone".into()))
    }

    pub fn requested_latency(&self) -> Result<Microseconds, SinkError> {
        self.tx.get_requested_latency().map_err(|_| SinkError::QueueFailed("IO thread gone".into()))
    }

    /// Number of inputs linked to this sink, plus the monitor source's own
    /// client count — `linked_by(s) = |inputs| + monitor.linked_by`.
    pub fn linked_by(&self) -> usize {
        self.shared.read().inputs.len() + self.source.lock().unwrap().linked_by()
    }

    /// Number of linked, uncorked inputs actually contributing audio right
    /// now. Unlike `linked_by`, a client merely recording the monitor
    /// doesn't count — it doesn't make the sink "in use" by itself.
    pub fn used_by(&self) -> usize {
        let shared = self.shared.read();
        shared.inputs.iter().filter(|h| !h.corked.load(Ordering::SeqCst)).count()
    }

    /// Moves the sink between `IDLE` and `RUNNING` according to `used_by()`.
    /// Called after every attach/detach/cork-state change that could affect
    /// whether the sink has anything to pull. A no-op outside IDLE/RUNNING
    /// (e.g. while SUSPENDED, a used_by change doesn't resume the sink).
    pub fn update_status(&self) {
        let state = self.shared.read().state;
        if !matches!(state, SinkState::Idle | SinkState::Running) {
            return;
        }
        let target = if self.used_by() > 0 { SinkState::Running } else { SinkState::Idle };
        if target != state {
            let _ = self.set_state(target);
        }
    }

    /// Registers a client recording the monitor source directly (not a sink
    /// input). Counts toward `linked_by` but never `used_by`.
    pub fn monitor_attach_client(&self) -> usize {
        self.source.lock().unwrap().add_client()
    }

    pub fn monitor_detach_client(&self) {
        self.source.lock().unwrap().remove_client();
    }

    /// Attaches a new input to the sink, posting `ADD_INPUT` to the IO
    /// thread. `corked` is a flag shared with the input's own
    /// implementation of `SinkInput::corked`, so control-side `used_by()`
    /// bookkeeping doesn't have to cross threads to stay current.
    /// `sync_prev`/`sync_next` patch the input into a sync group at attach
    /// time only; re-grouping an already-attached input isn't supported.
    pub fn attach_input(
        &self,
        input: Box<dyn SinkInput>,
        corked: Arc<AtomicBool>,
        sync_prev: Option<InputIdx>,
        sync_next: Option<InputIdx>,
    ) -> Result<InputIdx, SinkError> {
        {
            let state = self.shared.read().state;
            if !state.is_linked() {
                return Err(SinkError::BadState { state: state_name(state), op: "attach_input" });
            }
        }

        let raw_idx = {
            let mut shared = self.shared.write();
            shared.inputs.alloc(|_| InputHandle { corked, sync_prev, sync_next }).idx()
        };
        let io_idx = InputIdx::from_raw(raw_idx.value());

        self.tx
            .post(Message::AddInput { idx: io_idx, input, sync_prev, sync_next })
            .map_err(|e| SinkError::QueueFailed(e.to_string()))?;
        debug!("sink {:?}: attached input {:?}", self.index, io_idx);
        self.update_status();
        Ok(io_idx)
    }

    /// Detaches an input normally: the IO thread drops it outright, no
    /// audio continuity is preserved.
    pub fn remove_input(&self, idx: InputIdx) -> Result<(), SinkError> {
        let control_idx = sink_proto::idxset::Idx::from_raw(idx.value());
        {
            let mut shared = self.shared.write();
            shared.inputs.remove(control_idx);
        }
        self.tx
            .post(Message::RemoveInput { idx })
            .map_err(|e| SinkError::QueueFailed(e.to_string()))?;
        self.update_status();
        Ok(())
    }

    /// Forcibly disconnects an input, e.g. as part of draining every input
    /// during `unlink()`. Unlike `remove_input`, the IO thread calls
    /// `SinkInput::kill` rather than `detach`.
    fn kill_input(&self, idx: InputIdx) -> Result<(), SinkError> {
        let control_idx = sink_proto::idxset::Idx::from_raw(idx.value());
        {
            let mut shared = self.shared.write();
            shared.inputs.remove(control_idx);
        }
        self.tx
            .post(Message::KillInput { idx })
            .map_err(|e| SinkError::QueueFailed(e.to_string()))
    }

    /// Detaches an input as part of a move to another sink: the IO thread
    /// peeks/drops up to `buffer_bytes` of the input's own queued audio
    /// (applying its volume/mute), splices on anything it had already
    /// buffered ahead, and installs a [`crate::ghost::GhostSinkInput`] in
    /// its place so the sink keeps rendering continuous audio while the
    /// input is re-attached elsewhere. Fails without posting anything if the
    /// input belongs to a sync group — synchronized streams may not be
    /// moved.
    pub fn remove_input_and_buffer(&self, idx: InputIdx, buffer_bytes: usize) -> Result<(), SinkError> {
        let control_idx = sink_proto::idxset::Idx::from_raw(idx.value());
        {
            let shared = self.shared.read();
            if let Some(handle) = shared.inputs.get(control_idx) {
                if handle.sync_prev.is_some() || handle.sync_next.is_some() {
                    return Err(SinkError::Synchronized { op: "remove_input_and_buffer" });
                }
            }
        }
        {
            let mut shared = self.shared.write();
            shared.inputs.remove(control_idx);
        }
        self.tx
            .post(Message::RemoveInputAndBuffer { idx, buffer_bytes })
            .map_err(|e| SinkError::QueueFailed(e.to_string()))?;
        self.update_status();
        Ok(())
    }

    /// Requests that up to `nbytes` of already-rendered audio be rewound.
    /// Asks the driver first (it may only be able to rewind a shorter run of
    /// already-submitted audio); the IO thread's own rewind always runs
    /// regardless, since it operates on buffered input data the driver never
    /// sees.
    pub fn request_rewind(&self, nbytes: usize) -> Result<(), SinkError> {
        let can_call_driver = {
            let shared = self.shared.read();
            !shared.driver_failures.request_rewind
        };
        if can_call_driver {
            if let Some(ref driver) = self.driver {
                if driver.request_rewind(nbytes).is_none() {
                    self.shared.write().driver_failures.request_rewind = true;
                }
            }
        }
        self.tx
            .post(Message::RequestRewind(nbytes))
            .map_err(|e| SinkError::QueueFailed(e.to_string()))
    }

    pub fn defaults(&self) -> &SinkDefaults {
        &self.defaults
    }
}

fn state_name(state: SinkState) -> &'static str {
    match state {
        SinkState::Init => "INIT",
        SinkState::Idle => "IDLE",
        SinkState::Running => "RUNNING",
        SinkState::Suspended => "SUSPENDED",
        SinkState::Unlinked => "UNLINKED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sink_proto::{ChannelPosition, SampleFormat};
    use crate::testutil::FakeSinkInput;

    fn stereo() -> (SampleSpec, ChannelMap) {
        let spec = SampleSpec::new_checked(SampleFormat::S16Le, 2, 44100).unwrap();
        let mut map = ChannelMap::new();
        map.push(ChannelPosition::FrontLeft).unwrap();
        map.push(ChannelPosition::FrontRight).unwrap();
        (spec, map)
    }

    #[test]
    fn new_sink_starts_in_init_and_put_moves_to_idle() {
        let (spec, map) = stereo();
        let (sink, _ti, _rx) = Sink::builder(0, "test", spec, map).build().unwrap();
        assert_eq!(sink.state(), SinkState::Init);
        sink.put().unwrap();
        assert_eq!(sink.state(), SinkState::Idle);
    }

    #[test]
    fn unlink_is_idempotent() {
        let (spec, map) = stereo();
        let (sink, _ti, _rx) = Sink::builder(0, "test", spec, map).build().unwrap();
        sink.put().unwrap();
        sink.unlink();
        sink.unlink();
        assert_eq!(sink.state(), SinkState::Unlinked);
    }

    #[test]
    fn mismatched_channel_map_is_rejected() {
        let spec = SampleSpec::new_checked(SampleFormat::S16Le, 2, 44100).unwrap();
        let mut map = ChannelMap::new();
        map.push(ChannelPosition::Mono).unwrap();
        let result = Sink::builder(0, "test", spec, map).build();
        assert!(result.is_err());
    }

    #[test]
    fn used_by_excludes_monitor_clients_and_corked() {
        let (spec, map) = stereo();
        let (sink, _ti, _rx) = Sink::builder(0, "test", spec.clone(), map).build().unwrap();
        sink.put().unwrap();

        let corked = Arc::new(AtomicBool::new(false));
        sink.attach_input(Box::new(FakeSinkInput::new(spec.clone(), vec![0u8; 4])), corked.clone(), None, None).unwrap();
        // A client recording the monitor directly, not a sink input.
        sink.monitor_attach_client();

        assert_eq!(sink.linked_by(), 2);
        assert_eq!(sink.used_by(), 1);

        corked.store(true, Ordering::SeqCst);
        assert_eq!(sink.used_by(), 0);
        assert_eq!(sink.linked_by(), 2);
    }

    #[test]
    fn update_status_moves_idle_to_running_and_back() {
        let (spec, map) = stereo();
        let (sink, _ti, _rx) = Sink::builder(0, "test", spec.clone(), map).build().unwrap();
        sink.put().unwrap();
        assert_eq!(sink.state(), SinkState::Idle);

        let corked = Arc::new(AtomicBool::new(false));
        let idx = sink.attach_input(Box::new(FakeSinkInput::new(spec.clone(), vec![0u8; 4])), corked, None, None).unwrap();
        assert_eq!(sink.state(), SinkState::Running);

        sink.remove_input(idx).unwrap();
        assert_eq!(sink.state(), SinkState::Idle);
    }

    #[test]
    fn remove_input_and_buffer_rejects_synchronized_input() {
        let (spec, map) = stereo();
        let (sink, _ti, _rx) = Sink::builder(0, "test", spec.clone(), map).build().unwrap();
        sink.put().unwrap();

        let corked = Arc::new(AtomicBool::new(false));
        let a = sink.attach_input(Box::new(FakeSinkInput::new(spec.clone(), vec![0u8; 4])), corked.clone(), None, None).unwrap();
        let b = sink
            .attach_input(Box::new(FakeSinkInput::new(spec.clone(), vec![0u8; 4])), corked, Some(a), None)
            .unwrap();

        let result = sink.remove_input_and_buffer(b, 64);
        assert!(matches!(result, Err(SinkError::Synchronized { .. })));
    }

    #[test]
    fn driver_failure_falls_back_to_software() {
        let (spec, map) = stereo();
        let driver = crate::testutil::FakeDriver::new();
        let (sink, _ti, _rx) = Sink::builder(0, "test", spec, map)
            .flags(SinkFlags::HW_VOLUME_CTRL)
            .driver(driver.clone())
            .build()
            .unwrap();
        sink.put().unwrap();

        driver.fail_set_volume.store(true, Ordering::SeqCst);
        let mut vol = CVolume::new();
        vol.push(Volume::NORM).unwrap();
        vol.push(Volume::NORM).unwrap();
        // First call fails at the driver but still succeeds overall
        // (falls back to software) and disables the hook for next time.
        sink.set_volume(vol.clone()).unwrap();
        // The hook is now disabled; a second call must not attempt the
        // (still-failing) driver call again, and still succeeds.
        sink.set_volume(vol).unwrap();
    }
}
