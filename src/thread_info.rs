//! The IO-thread view of a sink: the part of the state that is only ever
//! touched from the realtime rendering loop.
//!
//! Nothing here is shared with the control thread directly — all
//! cross-thread communication flows through the [`crate::message`] queue.
//! A driver's poll loop owns a `SinkThreadInfo` and calls [`SinkThreadInfo::render`]
//! (or one of its variants) once per iteration, first draining pending
//! messages with [`SinkThreadInfo::process_messages`].

use std::sync::{Arc, Mutex};

use sink_proto::idxset::{Idx, IdxSet};
use sink_proto::time::Microseconds;
use sink_proto::{CVolume, Memchunk, SampleSpec, SilenceCache, Volume};

use crate::ghost::GhostSinkInput;
use crate::memblockq::MemBlockQ;
use crate::message::{Message, MessageReceiver};
use crate::mixer::{self, MixInput};
use crate::sink_input::{PeekOutcome, SinkInput};
use crate::source::Source;
use crate::state::SinkState;

/// An input attached to the IO thread's rendering set.
pub struct InputSlot {
    input: Box<dyn SinkInput>,
    /// Sync-group neighbors, patched in only at attach time. `None` for an
    /// input with no sync group.
    sync_prev: Option<InputIdx>,
    sync_next: Option<InputIdx>,
}

pub type InputIdx = Idx<InputSlot>;

/// Which inputs contributed to the most recently rendered chunk, so
/// `inputs_drop` knows who to advance.
struct LastMix {
    participants: Vec<InputIdx>,
    length: usize,
}

/// The realtime-side state of a sink.
pub struct SinkThreadInfo {
    sample_spec: SampleSpec,
    inputs: IdxSet<InputSlot>,
    state: SinkState,
    attached: bool,
    silence: SilenceCache,
    master_volume: CVolume,
    muted: bool,
    min_latency: Microseconds,
    max_latency: Microseconds,
    requested_latency_cache: Option<Microseconds>,
    max_rewind: usize,
    rewind_requested: usize,
    mix_cap: usize,
    last_mix: Option<LastMix>,
    /// Rotates across `inputs_drop` calls so no single low-index input is
    /// always first to pay for any O(n) bookkeeping.
    drop_cursor: usize,
    /// Shared with the control-side `Sink`. Post-mix audio and rewind/
    /// max-rewind propagation flow through here; never locked across a
    /// potentially-blocking call.
    monitor: Arc<Mutex<Source>>,
}

impl SinkThreadInfo {
    pub fn new(
        sample_spec: SampleSpec,
        master_volume: CVolume,
        mix_cap: usize,
        min_latency: Microseconds,
        max_latency: Microseconds,
        monitor: Arc<Mutex<Source>>,
    ) -> Self {
        SinkThreadInfo {
            sample_spec,
            inputs: IdxSet::new(),
            state: SinkState::Init,
            attached: true,
            silence: SilenceCache::new(),
            master_volume,
            muted: false,
            min_latency,
            max_latency,
            requested_latency_cache: None,
            max_rewind: 0,
            rewind_requested: 0,
            mix_cap,
            last_mix: None,
            drop_cursor: 0,
            monitor,
        }
    }

    pub fn state(&self) -> SinkState {
        self.state
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Drains and applies every message currently queued. Must be called
    /// before `render`/`skip` on each iteration of the IO loop.
    pub fn process_messages(&mut self, queue: &MessageReceiver) {
        for msg in queue.drain() {
            self.apply(msg);
        }
    }

    fn apply(&mut self, msg: Message) {
        match msg {
            Message::AddInput { idx, input, sync_prev, sync_next } => {
                trace!("sink: attaching input {:?}", idx);
                let mut input = input;
                input.attach();
                input.update_max_rewind(self.max_rewind);
                self.inputs.insert(idx, InputSlot { input, sync_prev, sync_next });
                self.invalidate_requested_latency();
                self.request_rewind(0);
            }
            Message::RemoveInput { idx } => {
                if let Some(mut slot) = self.inputs.remove(idx) {
                    slot.input.detach();
                }
                self.invalidate_requested_latency();
                self.request_rewind(0);
            }
            Message::KillInput { idx } => {
                if let Some(mut slot) = self.inputs.remove(idx) {
                    slot.input.kill();
                }
                self.invalidate_requested_latency();
                self.request_rewind(0);
            }
            Message::RemoveInputAndBuffer { idx, buffer_bytes } => {
                if let Some(mut slot) = self.inputs.remove(idx) {
                    let ghost_buffer = drain_into_ghost_buffer(&self.sample_spec, &mut *slot.input, buffer_bytes);
                    debug!("sink: removing input {:?}, {} bytes handed off to move buffer", idx, ghost_buffer.len());
                    slot.input.detach();
                    let ghost = GhostSinkInput::from_buffer(self.sample_spec.clone(), ghost_buffer);
                    self.inputs.insert(idx, InputSlot { input: Box::new(ghost), sync_prev: None, sync_next: None });
                }
                self.invalidate_requested_latency();
                self.request_rewind(0);
            }
            Message::SetState(state) => {
                debug!("sink: IO thread observed state change to {}", state);
                self.state = state;
            }
            Message::SetVolume(vol) => {
                trace!("sink: adjusting volume");
                self.master_volume = vol;
                self.request_rewind(0);
            }
            Message::SetMute(muted) => {
                self.muted = muted;
                self.request_rewind(0);
            }
            Message::Detach => {
                self.attached = false;
            }
            Message::Attach => {
                self.attached = true;
            }
            Message::RequestRewind(nbytes) => {
                self.request_rewind(nbytes);
            }
            Message::GetVolume(reply) => {
                let _ = reply.send(self.master_volume.clone());
            }
            Message::GetMute(reply) => {
                let _ = reply.send(self.muted);
            }
            Message::GetLatency(reply) => {
                let _ = reply.send(Microseconds(0));
            }
            Message::GetRequestedLatency(reply) => {
                let _ = reply.send(self.requested_latency());
            }
            Message::Flush(reply) => {
                let _ = reply.send(());
            }
        }
    }

    /// The minimum of every attached input's requested latency, clamped to
    /// `[min_latency, max_latency]`. Cached until an input attaches,
    /// detaches, or requests a different latency.
    pub fn requested_latency(&mut self) -> Microseconds {
        if let Some(cached) = self.requested_latency_cache {
            return cached;
        }
        let min_of_inputs = self
            .inputs
            .iter()
            .filter_map(|slot| slot.input.requested_latency())
            .map(|l| l.0)
            .min();

        let clamped = match min_of_inputs {
            Some(usec) => usec.max(self.min_latency.0).min(self.max_latency.0),
            None => self.min_latency.0,
        };
        let result = Microseconds(clamped);
        self.requested_latency_cache = Some(result);
        result
    }

    fn invalidate_requested_latency(&mut self) {
        self.requested_latency_cache = None;
    }

    /// Gathers up to `mix_cap` uncorked inputs with audio available for
    /// `length` bytes. Corked inputs are skipped entirely; inputs that
    /// return [`PeekOutcome::Remove`] are detached immediately.
    fn fill_mix_info(&mut self, length: usize) -> Vec<InputIdx> {
        let mut to_remove = Vec::new();
        let mut participants = Vec::new();

        for (idx, slot) in self.inputs.iter_mut() {
            if participants.len() >= self.mix_cap {
                break;
            }
            if slot.input.corked() {
                continue;
            }
            match slot.input.peek(length) {
                PeekOutcome::Chunk(_) | PeekOutcome::Silence => participants.push(idx),
                PeekOutcome::Remove => to_remove.push(idx),
            }
        }

        for idx in to_remove {
            if let Some(mut slot) = self.inputs.remove(idx) {
                slot.input.kill();
            }
        }

        participants
    }

    /// Renders exactly `length` bytes, returning a chunk that may share
    /// storage with an input's own buffer (zero-copy passthrough) when
    /// there is exactly one contributing input at unity volume and the sink
    /// isn't muted.
    pub fn render(&mut self, length: usize) -> Memchunk {
        let chunk = self.render_inner(length);
        self.monitor.lock().unwrap().push_postmix(&chunk);
        chunk
    }

    /// Does the actual rendering; `render` wraps this to push the result to
    /// the monitor source on every path, including the early-outs.
    fn render_inner(&mut self, length: usize) -> Memchunk {
        // spec.md §4.3: outside IDLE/RUNNING the sink is not "open" and must
        // behave as though it had zero inputs.
        if !self.state.is_opened() {
            self.last_mix = None;
            return self.silence.get(length);
        }

        let participants = self.fill_mix_info(length);

        if participants.is_empty() {
            self.last_mix = None;
            return self.silence.get(length);
        }

        if participants.len() == 1 && !self.muted && is_master_unity(&self.master_volume) {
            let idx = participants[0];
            let slot = self.inputs.get_mut(idx).expect("participant vanished mid-render");
            if let PeekOutcome::Chunk(chunk) = slot.input.peek(length) {
                if chunk.len() == length && is_input_unity(&slot.input.volume()) && !slot.input.muted() {
                    self.last_mix = Some(LastMix { participants, length: chunk.len() });
                    return chunk;
                }
            }
        }

        let chunk = self.mix_participants(&participants, length);
        self.last_mix = Some(LastMix { participants, length: chunk.len() });
        chunk
    }

    fn mix_participants(&mut self, participants: &[InputIdx], length: usize) -> Memchunk {
        let mut owned_chunks = Vec::with_capacity(participants.len());
        let mut min_len = length;
        for &idx in participants {
            let slot = self.inputs.get_mut(idx).expect("participant vanished mid-render");
            let chunk = match slot.input.peek(length) {
                PeekOutcome::Chunk(c) => {
                    min_len = min_len.min(c.len());
                    c
                }
                PeekOutcome::Silence => self.silence.get(length),
                PeekOutcome::Remove => self.silence.get(length),
            };
            owned_chunks.push((slot.input.volume(), slot.input.muted(), chunk));
        }

        // The mix length is the minimum of every participant's actually
        // returned chunk length — an underrunning input narrows the whole
        // render rather than being silently dropped with its index left
        // dangling in `last_mix.participants`.
        let mut buf = vec![0u8; min_len];
        let inputs: Vec<MixInput> = owned_chunks
            .iter()
            .filter(|(_, muted, _)| !muted)
            .map(|(volume, _, chunk)| {
                let bytes = chunk.as_slice();
                MixInput { samples: &bytes[..min_len], volume }
            })
            .collect();

        mixer::mix(&self.sample_spec, &inputs, &mut buf);

        if !self.muted {
            mixer::apply_volume(&self.sample_spec, &self.master_volume, &mut buf);
        } else {
            for b in buf.iter_mut() {
                *b = 0;
            }
        }

        Memchunk::from_vec(buf)
    }

    /// Renders into an existing buffer rather than allocating a fresh
    /// `Memchunk`. `out.len()` determines the render length.
    pub fn render_into(&mut self, out: &mut [u8]) {
        let chunk = self.render(out.len());
        out.copy_from_slice(chunk.as_slice());
    }

    /// Like `render`, but always renders the driver's full configured
    /// fragment size rather than a caller-specified length. Exists as a
    /// distinct entry point because drivers that always consume whole
    /// fragments can skip the length bookkeeping `render` does for partial
    /// requests.
    pub fn render_full(&mut self, fragment_size: usize) -> Memchunk {
        self.render(fragment_size)
    }

    /// `render_into` specialized the same way `render_full` specializes
    /// `render`.
    pub fn render_into_full(&mut self, out: &mut [u8]) {
        self.render_into(out)
    }

    /// Discards `length` bytes without producing output, by calling `drop`
    /// directly on every uncorked input without mixing. Used when the sink
    /// must keep inputs moving forward (e.g. while suspended) without
    /// actually playing anything.
    pub fn skip(&mut self, length: usize) {
        let participants = self.fill_mix_info(length);
        for idx in participants {
            if let Some(slot) = self.inputs.get_mut(idx) {
                slot.input.drop(length);
            }
        }
    }

    /// Tells every input that participated in the last render call that
    /// `length` bytes of it were actually consumed by the driver, advancing
    /// their read positions. `length` must be `<=` the last render's length.
    pub fn inputs_drop(&mut self, length: usize) {
        let last = match self.last_mix.take() {
            Some(last) => last,
            None => return,
        };
        debug_assert!(length <= last.length);

        let n = last.participants.len();
        if n == 0 {
            return;
        }
        self.drop_cursor %= n;
        for i in 0..n {
            let idx = last.participants[(self.drop_cursor + i) % n];
            if let Some(slot) = self.inputs.get_mut(idx) {
                slot.input.drop(length);
            }
        }
        self.drop_cursor = (self.drop_cursor + 1) % n;
    }

    /// Latches a rewind request; the actual propagation happens the next
    /// time the driver consumes it via `take_rewind_request`, so repeated
    /// requests before that point only ever grow the pending amount. A
    /// request of `0` means "rewind as much as you can" and is substituted
    /// with `max_rewind`.
    pub fn request_rewind(&mut self, nbytes: usize) {
        let nbytes = if nbytes == 0 { self.max_rewind } else { nbytes };
        self.rewind_requested = self.rewind_requested.max(nbytes.min(self.max_rewind));
    }

    /// Reads and clears the pending rewind latch. Called once per IO cycle
    /// by the driver's poll loop, which is responsible for actually
    /// rewinding the hardware by the returned amount (or less).
    pub fn take_rewind_request(&mut self) -> usize {
        std::mem::replace(&mut self.rewind_requested, 0)
    }

    pub fn set_max_rewind(&mut self, nbytes: usize) {
        self.max_rewind = nbytes;
        for (_, slot) in self.inputs.iter_mut() {
            slot.input.update_max_rewind(nbytes);
        }
        self.monitor.lock().unwrap().set_max_rewind(nbytes);
    }

    /// The driver reports that the hardware was rewound by `nbytes`.
    /// Delegates per-stream rewind to every attached input and, if the
    /// monitor source is open, rewinds it by the same count. Distinct from
    /// `request_rewind`/`take_rewind_request`, which only track the pending
    /// *request* for a rewind, not a completed one.
    pub fn process_rewind(&mut self, nbytes: usize) {
        for (_, slot) in self.inputs.iter_mut() {
            slot.input.process_rewind(nbytes);
        }
        self.monitor.lock().unwrap().process_rewind(nbytes);
    }

    pub fn sample_spec(&self) -> &SampleSpec {
        &self.sample_spec
    }
}

fn is_master_unity(vol: &CVolume) -> bool {
    vol.volumes().iter().all(|v| v.as_u32() == Volume::NORM.as_u32())
}

fn is_input_unity(vol: &CVolume) -> bool {
    is_master_unity(vol)
}

/// Drains up to `buffer_bytes` from `input` into a fresh `MemBlockQ`,
/// applying the input's own volume/mute the way spec.md's
/// REMOVE_INPUT_AND_BUFFER requires, then splices on whatever the input had
/// already buffered ahead of its read position via `take_trailing`.
fn drain_into_ghost_buffer(spec: &SampleSpec, input: &mut dyn SinkInput, buffer_bytes: usize) -> MemBlockQ {
    let mut buffer = MemBlockQ::new(buffer_bytes.max(1));
    let muted = input.muted();
    let volume = input.volume();
    let mut remaining = buffer_bytes;

    while remaining > 0 {
        match input.peek(remaining) {
            PeekOutcome::Chunk(chunk) => {
                let taken = chunk.len();
                if taken == 0 {
                    break;
                }
                let mut bytes = chunk.as_slice().to_vec();
                if muted {
                    for b in bytes.iter_mut() {
                        *b = 0;
                    }
                } else {
                    mixer::apply_volume(spec, &volume, &mut bytes);
                }
                input.drop(taken);
                buffer.push(Memchunk::from_vec(bytes));
                remaining = remaining.saturating_sub(taken);
            }
            PeekOutcome::Silence | PeekOutcome::Remove => break,
        }
    }

    for trailing in input.take_trailing() {
        buffer.push(trailing);
    }

    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message;
    use crate::testutil::FakeSinkInput;
    use sink_proto::SampleFormat;

    fn spec() -> SampleSpec {
        SampleSpec::new_checked(SampleFormat::S16Le, 2, 44100).unwrap()
    }

    fn unity() -> CVolume {
        let mut v = CVolume::new();
        v.push(Volume::NORM).unwrap();
        v.push(Volume::NORM).unwrap();
        v
    }

    fn monitor() -> Arc<Mutex<Source>> {
        Arc::new(Mutex::new(Source::new("test", "Test", spec(), sink_proto::ChannelMap::new())))
    }

    fn new_thread_info() -> SinkThreadInfo {
        let mut ti = SinkThreadInfo::new(spec(), unity(), 32, Microseconds(1_000), Microseconds(2_000_000), monitor());
        // Tests exercise mixing directly; real callers reach RUNNING via the
        // control-side state machine before the IO thread ever renders.
        ti.apply(Message::SetState(SinkState::Running));
        ti
    }

    fn add_input(tx: &message::MessageSender, idx: InputIdx, input: FakeSinkInput) {
        tx.post(Message::AddInput { idx, input: Box::new(input), sync_prev: None, sync_next: None }).unwrap();
    }

    #[test]
    fn render_with_no_inputs_is_silence() {
        let mut ti = new_thread_info();
        let chunk = ti.render(64);
        assert!(chunk.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn render_with_one_unity_input_is_zero_copy() {
        let mut ti = new_thread_info();
        let (tx, rx) = message::channel();
        let idx = InputIdx::from_raw(0);
        add_input(&tx, idx, FakeSinkInput::new(spec(), vec![7u8; 64]));
        ti.process_messages(&rx);

        let chunk = ti.render(64);
        assert_eq!(chunk.as_slice(), &[7u8; 64][..]);
    }

    #[test]
    fn render_with_two_inputs_mixes() {
        let mut ti = new_thread_info();
        let (tx, rx) = message::channel();
        add_input(&tx, InputIdx::from_raw(0), FakeSinkInput::new(spec(), vec![0u8; 64]));
        add_input(&tx, InputIdx::from_raw(1), FakeSinkInput::new(spec(), vec![0u8; 64]));
        ti.process_messages(&rx);
        assert_eq!(ti.input_count(), 2);

        let chunk = ti.render(64);
        assert_eq!(chunk.len(), 64);
    }

    #[test]
    fn corked_inputs_are_skipped() {
        let mut ti = new_thread_info();
        let (tx, rx) = message::channel();
        let mut input = FakeSinkInput::new(spec(), vec![9u8; 64]);
        input.set_corked(true);
        add_input(&tx, InputIdx::from_raw(0), input);
        ti.process_messages(&rx);

        let chunk = ti.render(64);
        assert!(chunk.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn inputs_drop_advances_participants_from_last_render() {
        let mut ti = new_thread_info();
        let (tx, rx) = message::channel();
        add_input(&tx, InputIdx::from_raw(0), FakeSinkInput::new(spec(), vec![1u8; 64]));
        ti.process_messages(&rx);

        let _ = ti.render(32);
        ti.inputs_drop(32);
        // Render again: if drop didn't advance the fake input's cursor, this
        // would return the same bytes again (it doesn't, the fake advances).
        let chunk = ti.render(32);
        assert_eq!(chunk.len(), 32);
    }

    #[test]
    fn render_while_not_running_is_silence_regardless_of_inputs() {
        let mut ti = new_thread_info();
        let (tx, rx) = message::channel();
        add_input(&tx, InputIdx::from_raw(0), FakeSinkInput::new(spec(), vec![9u8; 64]));
        ti.process_messages(&rx);
        ti.apply(Message::SetState(SinkState::Idle));

        let chunk = ti.render(64);
        assert!(chunk.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn underrunning_input_narrows_the_mix_length() {
        let mut ti = new_thread_info();
        let (tx, rx) = message::channel();
        add_input(&tx, InputIdx::from_raw(0), FakeSinkInput::new(spec(), vec![1u8; 64]));
        add_input(&tx, InputIdx::from_raw(1), FakeSinkInput::new(spec(), vec![1u8; 16]));
        ti.process_messages(&rx);

        let chunk = ti.render(64);
        // The second input only has 16 bytes; a naive fixed-length mix would
        // either panic slicing it or silently drop it from the mix while
        // still advancing it by 64 bytes on the next `inputs_drop`.
        assert_eq!(chunk.len(), 16);
        ti.inputs_drop(chunk.len());
    }

    #[test]
    fn remove_input_and_buffer_installs_a_draining_ghost() {
        let mut ti = new_thread_info();
        let (tx, rx) = message::channel();
        let idx = InputIdx::from_raw(0);
        add_input(&tx, idx, FakeSinkInput::new(spec(), vec![5u8; 64]));
        ti.process_messages(&rx);

        tx.post(Message::RemoveInputAndBuffer { idx, buffer_bytes: 32 }).unwrap();
        ti.process_messages(&rx);
        assert_eq!(ti.input_count(), 1);

        // The ghost left in the input's place should drain its buffered
        // audio before falling silent, not go silent immediately.
        let chunk = ti.render(32);
        assert!(chunk.as_slice().iter().any(|&b| b != 0), "expected buffered audio, got silence");
    }

    #[test]
    fn remove_input_and_buffer_splices_on_trailing_chunks() {
        let mut ti = new_thread_info();
        let (tx, rx) = message::channel();
        let idx = InputIdx::from_raw(0);
        let mut input = FakeSinkInput::new(spec(), vec![1u8; 16]);
        input.set_trailing(vec![sink_proto::Memchunk::from_vec(vec![9u8; 8])]);
        add_input(&tx, idx, input);
        ti.process_messages(&rx);

        tx.post(Message::RemoveInputAndBuffer { idx, buffer_bytes: 16 }).unwrap();
        ti.process_messages(&rx);

        // Drain the drawn-from-peek bytes first, then the spliced tail.
        let first = ti.render(16);
        assert!(first.as_slice().iter().all(|&b| b == 1));
        ti.inputs_drop(16);
        let second = ti.render(8);
        assert!(second.as_slice().iter().all(|&b| b == 9));
    }

    #[test]
    fn remove_input_detaches_it() {
        let mut ti = new_thread_info();
        let (tx, rx) = message::channel();
        let idx = InputIdx::from_raw(0);
        add_input(&tx, idx, FakeSinkInput::new(spec(), vec![1u8; 64]));
        ti.process_messages(&rx);
        assert_eq!(ti.input_count(), 1);

        tx.post(Message::RemoveInput { idx }).unwrap();
        ti.process_messages(&rx);
        assert_eq!(ti.input_count(), 0);
    }
}
