//! Ghost sink inputs: the move protocol's audio-continuity mechanism.
//!
//! Moving a stream from sink A to sink B takes a moment — the stream has to
//! be removed from A's IO thread, handed to B's control thread, and
//! attached to B's IO thread, and the source producing audio keeps running
//! the whole time. A ghost input is a temporary, silent stand-in for the
//! real input on the origin sink: it buffers whatever the origin would have
//! rendered into a `MemBlockQ` instead of discarding it, so once the real
//! input attaches to the destination sink it can drain that buffer first
//! and resume exactly where it left off, with no audible gap or overrun.

use std::fmt;

use sink_proto::{CVolume, Memchunk, SampleSpec};

use crate::memblockq::MemBlockQ;
use crate::mixer::unity_volume;
use crate::sink_input::{PeekOutcome, SinkInput};

/// Stands in for a `SinkInput` that's mid-move: sourced from a buffer of
/// already-rendered audio rather than a live source. `peek`/`drop` drain
/// that buffer like any other input; once it runs dry the ghost reports
/// silence, exactly like an input with an empty capture buffer. It's fed by
/// whoever owns the move (typically `REMOVE_INPUT_AND_BUFFER`'s handler,
/// which seeds the buffer from the departing input's own tail) and is
/// itself silent to the move's destination — it only exists on the origin
/// sink to keep that sink's output continuous while the real input is gone.
pub struct GhostSinkInput {
    spec: SampleSpec,
    buffer: MemBlockQ,
}

impl GhostSinkInput {
    pub fn new(spec: SampleSpec, max_buffer_bytes: usize) -> Self {
        GhostSinkInput { spec, buffer: MemBlockQ::new(max_buffer_bytes) }
    }

    /// Builds a ghost already carrying buffered audio, e.g. the tail
    /// captured from a departing input by `REMOVE_INPUT_AND_BUFFER`.
    pub fn from_buffer(spec: SampleSpec, buffer: MemBlockQ) -> Self {
        GhostSinkInput { spec, buffer }
    }

    /// Buffered bytes remaining to be drained.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Consumes this ghost, handing back whatever of its buffer is left
    /// undrained.
    pub fn into_buffer(self) -> MemBlockQ {
        self.buffer
    }
}

impl fmt::Debug for GhostSinkInput {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("GhostSinkInput")
            .field("buffered_bytes", &self.buffer.len())
            .finish()
    }
}

impl SinkInput for GhostSinkInput {
    fn sample_spec(&self) -> &SampleSpec {
        &self.spec
    }

    fn volume(&self) -> CVolume {
        unity_volume(self.spec.channels())
    }

    fn muted(&self) -> bool {
        false
    }

    fn corked(&self) -> bool {
        false
    }

    fn peek(&mut self, length: usize) -> PeekOutcome {
        if self.buffer.is_empty() {
            return PeekOutcome::Silence;
        }
        let chunks = self.buffer.peek(length);
        let mut out = Vec::with_capacity(length.min(self.buffer.len()));
        for chunk in chunks {
            out.extend_from_slice(chunk.as_slice());
        }
        PeekOutcome::Chunk(Memchunk::from_vec(out))
    }

    fn drop(&mut self, length: usize) {
        self.buffer.pop(length.min(self.buffer.len()));
    }

    fn process_rewind(&mut self, _nbytes: usize) {}

    fn update_max_rewind(&mut self, _nbytes: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use sink_proto::SampleFormat;

    fn spec() -> SampleSpec {
        SampleSpec::new_checked(SampleFormat::S16Le, 2, 44100).unwrap()
    }

    #[test]
    fn empty_ghost_renders_silence() {
        let mut ghost = GhostSinkInput::new(spec(), 4096);
        assert!(matches!(ghost.peek(64), PeekOutcome::Silence));
    }

    #[test]
    fn ghost_drains_its_buffer_then_falls_silent() {
        let mut buffer = MemBlockQ::new(4096);
        buffer.push(Memchunk::from_vec(vec![1, 2, 3, 4]));
        let mut ghost = GhostSinkInput::from_buffer(spec(), buffer);

        match ghost.peek(2) {
            PeekOutcome::Chunk(c) => assert_eq!(c.as_slice(), &[1, 2]),
            other => panic!("expected buffered chunk, got {:?}", other),
        }
        ghost.drop(2);
        assert_eq!(ghost.buffered_len(), 2);

        match ghost.peek(4) {
            PeekOutcome::Chunk(c) => assert_eq!(c.as_slice(), &[3, 4]),
            other => panic!("expected buffered chunk, got {:?}", other),
        }
        ghost.drop(4);
        assert_eq!(ghost.buffered_len(), 0);
        assert!(matches!(ghost.peek(4), PeekOutcome::Silence));
    }
}
