//! Fakes for exercising the sink without a real driver or streams.
//!
//! Grounded on the teacher's `Sink::new_dummy`/`DummySink`: a minimal stand-in
//! good enough to drive the state machine and mixing logic end-to-end in
//! tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sink_proto::time::Microseconds;
use sink_proto::{CVolume, Memchunk, SampleSpec};

use crate::driver::Driver;
use crate::mixer::unity_volume;
use crate::sink_input::{PeekOutcome, SinkInput};
use crate::state::SinkState;

/// A fixed byte buffer that is handed out, unchanged, on every `peek` and
/// advanced on `drop`. Wraps past the end so tests can render arbitrarily
/// long sequences from a short buffer.
#[derive(Debug)]
pub struct FakeSinkInput {
    spec: SampleSpec,
    data: Vec<u8>,
    pos: usize,
    corked: bool,
    volume: CVolume,
    muted: bool,
    requested_latency: Option<Microseconds>,
    /// Chunks a test has queued up to be returned by `take_trailing`,
    /// simulating an input with its own render-side lookahead buffer.
    trailing: Vec<Memchunk>,
}

impl FakeSinkInput {
    pub fn new(spec: SampleSpec, data: Vec<u8>) -> Self {
        let channels = spec.channels();
        FakeSinkInput {
            spec,
            data,
            pos: 0,
            corked: false,
            volume: unity_volume(channels),
            muted: false,
            requested_latency: None,
            trailing: Vec::new(),
        }
    }

    /// Queues chunks to be handed back by the next `take_trailing` call.
    pub fn set_trailing(&mut self, chunks: Vec<Memchunk>) {
        self.trailing = chunks;
    }

    pub fn set_corked(&mut self, corked: bool) {
        self.corked = corked;
    }

    pub fn set_volume(&mut self, volume: CVolume) {
        self.volume = volume;
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn set_requested_latency(&mut self, latency: Microseconds) {
        self.requested_latency = Some(latency);
    }
}

impl SinkInput for FakeSinkInput {
    fn sample_spec(&self) -> &SampleSpec {
        &self.spec
    }

    fn volume(&self) -> CVolume {
        self.volume.clone()
    }

    fn muted(&self) -> bool {
        self.muted
    }

    fn corked(&self) -> bool {
        self.corked
    }

    fn peek(&mut self, length: usize) -> PeekOutcome {
        if self.data.is_empty() {
            return PeekOutcome::Silence;
        }
        let mut out = Vec::with_capacity(length);
        let mut cursor = self.pos;
        while out.len() < length {
            out.push(self.data[cursor % self.data.len()]);
            cursor += 1;
        }
        PeekOutcome::Chunk(sink_proto::Memchunk::from_vec(out))
    }

    fn drop(&mut self, length: usize) {
        self.pos = (self.pos + length) % self.data.len().max(1);
    }

    fn take_trailing(&mut self) -> Vec<Memchunk> {
        std::mem::take(&mut self.trailing)
    }

    fn process_rewind(&mut self, nbytes: usize) {
        self.pos = self.pos.saturating_sub(nbytes);
    }

    fn update_max_rewind(&mut self, _nbytes: usize) {}

    fn requested_latency(&self) -> Option<Microseconds> {
        self.requested_latency
    }
}

/// A driver whose hooks all succeed and record what was called, for
/// assertions, plus switches to make individual hooks fail on demand (to
/// exercise the self-disabling behavior).
#[derive(Debug, Default)]
pub struct FakeDriver {
    pub fail_set_state: AtomicBool,
    pub fail_set_volume: AtomicBool,
    last_state: std::sync::Mutex<Option<SinkState>>,
    last_volume: std::sync::Mutex<Option<CVolume>>,
}

impl FakeDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeDriver::default())
    }

    pub fn last_state(&self) -> Option<SinkState> {
        *self.last_state.lock().unwrap()
    }
}

impl Driver for FakeDriver {
    fn set_state(&self, state: SinkState) -> Result<(), String> {
        if self.fail_set_state.load(Ordering::SeqCst) {
            return Err("fake driver: set_state failed".into());
        }
        *self.last_state.lock().unwrap() = Some(state);
        Ok(())
    }

    fn set_volume(&self, volume: &CVolume) -> Result<(), String> {
        if self.fail_set_volume.load(Ordering::SeqCst) {
            return Err("fake driver: set_volume failed".into());
        }
        *self.last_volume.lock().unwrap() = Some(volume.clone());
        Ok(())
    }
}
