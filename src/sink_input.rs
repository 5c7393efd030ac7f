//! The interface a stream implements to be mixed into a sink.

use std::fmt::Debug;

use sink_proto::{CVolume, Memchunk, SampleSpec};

/// What an input handed back from a `peek()` call.
#[derive(Debug)]
pub enum PeekOutcome {
    /// `length` bytes of audio, already in the sink's sample format.
    Chunk(Memchunk),
    /// The input has nothing to say right now (e.g. corked, or a capture
    /// buffer underrun) — mix silence for it this round.
    Silence,
    /// The input is finished and should be detached. Equivalent to the
    /// input calling `kill()` on itself from inside `peek()`.
    Remove,
}

/// A stream attached to a sink's mixer.
///
/// All methods are called from the sink's IO thread only — implementors
/// must not block or perform control-thread work (property list lookups,
/// locking shared client state, etc.) here. See the concurrency contract on
/// [`crate::sink::Sink`].
pub trait SinkInput: Debug + Send {
    /// The format this input presents its samples in. Must match the
    /// owning sink's sample spec exactly; the sink does not resample.
    fn sample_spec(&self) -> &SampleSpec;

    /// Per-stream volume, applied during mixing.
    fn volume(&self) -> CVolume;

    /// Per-stream mute, applied during mixing (overrides `volume()`).
    fn muted(&self) -> bool;

    /// Whether the input is corked (paused). Corked inputs are skipped
    /// entirely by `fill_mix_info` — they don't even contribute silence.
    fn corked(&self) -> bool;

    /// Requests up to `length` bytes of audio without consuming them. A
    /// subsequent `drop` call with the same or smaller length advances the
    /// input's internal read position.
    fn peek(&mut self, length: usize) -> PeekOutcome;

    /// Consumes `length` bytes previously returned by `peek`.
    fn drop(&mut self, length: usize);

    /// Chunks already buffered ahead by this input's own render-side queue
    /// but not yet handed downstream. Drained and spliced onto a
    /// [`crate::ghost::GhostSinkInput`]'s queue when this input is removed
    /// via `REMOVE_INPUT_AND_BUFFER`, so none of that data is lost across a
    /// move. Most inputs have no such queue; default is empty.
    fn take_trailing(&mut self) -> Vec<Memchunk> {
        Vec::new()
    }

    /// Rewinds the input's read position by up to `nbytes`, in response to
    /// the sink processing a pending rewind.
    fn process_rewind(&mut self, nbytes: usize);

    /// Informs the input how many bytes of rewind the sink can support, so
    /// it can size its own history buffer accordingly.
    fn update_max_rewind(&mut self, nbytes: usize);

    /// The latency this input would like the sink to target, if it has an
    /// opinion (e.g. to keep a video in sync).
    fn requested_latency(&self) -> Option<sink_proto::time::Microseconds> {
        None
    }

    /// Called once when the input is attached to a sink's thread_info.
    fn attach(&mut self) {}

    /// Called once when the input is detached (including on removal).
    fn detach(&mut self) {}

    /// Forcibly disconnects the input, e.g. because its sink was unlinked
    /// with no replacement. Not called for a normal `remove_input`.
    fn kill(&mut self) {}
}
