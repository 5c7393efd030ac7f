//! The asynchronous message queue connecting the control thread to the IO
//! thread.
//!
//! Everything that crosses from control to IO goes through this queue. Two
//! flavors of message exist: *posts* (`ADD_INPUT`, `SET_VOLUME`, ...), which
//! are fire-and-forget and processed the next time the IO thread drains the
//! queue, and *sends* (`GET_VOLUME`, `GET_LATENCY`, ...), which carry a
//! reply channel and block the caller until the IO thread answers. Nothing
//! is shared between the two threads outside of this queue and the
//! ref-counted [`sink_proto::Memchunk`]s it carries.

use std::fmt;

use crossbeam_channel::{unbounded, Receiver, RecvError, SendError, Sender};

use sink_proto::time::Microseconds;
use sink_proto::CVolume;

use crate::sink_input::SinkInput;
use crate::state::SinkState;
use crate::thread_info::InputIdx;

/// A message posted or sent from the control thread to a sink's IO thread.
pub enum Message {
    AddInput {
        idx: InputIdx,
        input: Box<dyn SinkInput>,
        sync_prev: Option<InputIdx>,
        sync_next: Option<InputIdx>,
    },
    RemoveInput { idx: InputIdx },
    /// Forced disconnect, e.g. from `unlink()` draining its inputs. Unlike
    /// `RemoveInput`, invokes `SinkInput::kill` instead of `detach`.
    KillInput { idx: InputIdx },
    RemoveInputAndBuffer { idx: InputIdx, buffer_bytes: usize },
    SetState(SinkState),
    SetVolume(CVolume),
    SetMute(bool),
    Detach,
    Attach,
    RequestRewind(usize),
    GetVolume(Sender<CVolume>),
    GetMute(Sender<bool>),
    GetLatency(Sender<Microseconds>),
    GetRequestedLatency(Sender<Microseconds>),
    /// Hands a just-rendered chunk back, a no-op placeholder IO threads use
    /// to unit-test message draining without a real driver attached.
    Flush(Sender<()>),
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Message::AddInput { idx, .. } => write!(f, "AddInput({:?})", idx),
            Message::RemoveInput { idx } => write!(f, "RemoveInput({:?})", idx),
            Message::KillInput { idx } => write!(f, "KillInput({:?})", idx),
            Message::RemoveInputAndBuffer { idx, buffer_bytes } => {
                write!(f, "RemoveInputAndBuffer({:?}, {} bytes)", idx, buffer_bytes)
            }
            Message::SetState(s) => write!(f, "SetState({:?})", s),
            Message::SetVolume(_) => write!(f, "SetVolume(..)"),
            Message::SetMute(m) => write!(f, "SetMute({})", m),
            Message::Detach => write!(f, "Detach"),
            Message::Attach => write!(f, "Attach"),
            Message::RequestRewind(n) => write!(f, "RequestRewind({})", n),
            Message::GetVolume(_) => write!(f, "GetVolume(..)"),
            Message::GetMute(_) => write!(f, "GetMute(..)"),
            Message::GetLatency(_) => write!(f, "GetLatency(..)"),
            Message::GetRequestedLatency(_) => write!(f, "GetRequestedLatency(..)"),
            Message::Flush(_) => write!(f, "Flush(..)"),
        }
    }
}

/// The control-thread handle to a sink's message queue.
#[derive(Debug, Clone)]
pub struct MessageSender {
    tx: Sender<Message>,
}

/// The IO-thread handle to a sink's message queue.
#[derive(Debug)]
pub struct MessageReceiver {
    rx: Receiver<Message>,
}

/// Creates a fresh, unbounded queue pair for a new sink.
///
/// Unbounded is deliberate: a control thread blocked on a full queue could
/// deadlock against the IO thread it's waiting to drain, and posts are rare
/// enough (attach/detach/volume changes, not per-sample) that unbounded
/// growth is not a practical concern.
pub fn channel() -> (MessageSender, MessageReceiver) {
    let (tx, rx) = unbounded();
    (MessageSender { tx }, MessageReceiver { rx })
}

impl MessageSender {
    /// Fire-and-forget post. Fails only if the IO thread has shut down.
    pub fn post(&self, msg: Message) -> Result<(), SendError<Message>> {
        self.tx.send(msg)
    }

    /// Sends a message built from `mk` (which receives the reply sender)
    /// and blocks for the IO thread's answer.
    fn send_sync<T, F>(&self, mk: F) -> Result<T, RecvError>
    where
        F: FnOnce(Sender<T>) -> Message,
    {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        let msg = mk(reply_tx);
        // If the IO thread is gone, `reply_rx.recv()` below fails with
        // `RecvError`, which is the same error a mid-flight hangup produces.
        let _ = self.tx.send(msg);
        reply_rx.recv()
    }

    pub fn get_volume(&self) -> Result<CVolume, RecvError> {
        self.send_sync(Message::GetVolume)
    }

    pub fn get_mute(&self) -> Result<bool, RecvError> {
        self.send_sync(Message::GetMute)
    }

    pub fn get_latency(&self) -> Result<Microseconds, RecvError> {
        self.send_sync(Message::GetLatency)
    }

    pub fn get_requested_latency(&self) -> Result<Microseconds, RecvError> {
        self.send_sync(Message::GetRequestedLatency)
    }
}

impl MessageReceiver {
    /// Drains every message currently queued, without blocking. Called by
    /// the IO thread once per render iteration, before rendering.
    pub fn drain(&self) -> Vec<Message> {
        self.rx.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_then_drain_preserves_order() {
        let (tx, rx) = channel();
        tx.post(Message::SetMute(true)).unwrap();
        tx.post(Message::Detach).unwrap();
        let drained = rx.drain();
        assert_eq!(drained.len(), 2);
        match drained[0] {
            Message::SetMute(true) => {}
            ref other => panic!("unexpected first message: {:?}", other),
        }
    }

    #[test]
    fn send_sync_round_trips() {
        let (tx, rx) = channel();
        let handle = std::thread::spawn(move || tx.get_mute());
        // Simulate the IO thread answering the GetMute request.
        loop {
            let msgs = rx.drain();
            if let Some(Message::GetMute(reply)) = msgs.into_iter().next() {
                reply.send(true).unwrap();
                break;
            }
        }
        assert_eq!(handle.join().unwrap().unwrap(), true);
    }
}
