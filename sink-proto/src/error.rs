//! Defines error types and codes.

use std::error;

// TODO: Make `Error` always carry a pulse error code

/// Generic error used by the library.
#[derive(Debug, Fail)]
#[fail(display = "{}", inner)]
pub struct Error {
    /*code: PulseError,
    msg: String,*/
    inner: Inner,
}

impl Error {
    pub(crate) fn string<S: AsRef<str>>(string: S) -> Self {
        Self {
            inner: Inner::Other(string.as_ref().into()),
        }
    }

    /*pub(crate) fn new<S: ToString>(code: PulseError, msg: S) -> Self {
        Self {
            code,
            msg: msg.to_string(),
        }
    }*/
}

impl<E: error::Error + Send + Sync + 'static> From<E> for Error {
    fn from(err: E) -> Error {
        Error {
            inner: Inner::Other(err.into()),
        }
    }
}

#[derive(Debug, Fail)]
enum Inner {
    #[fail(display = "{}", _0)]
    Other(Box<error::Error + Send + Sync>),
}

/// Failure modes a sink can report back to its control-side caller.
///
/// Render-path failures (a single input failing to `peek`) are not part of
/// this type: those are silent per-input skips, logged at `trace!` rather
/// than surfaced as an `Err`.
#[derive(Debug, Fail)]
pub enum SinkError {
    /// A `SampleSpec`/`ChannelMap` pair failed `SampleSpec::new_checked` or
    /// disagreed on channel count.
    #[fail(display = "invalid sample spec or channel map: {}", _0)]
    InvalidSpec(String),

    /// A sink with this name is already registered in the core.
    #[fail(display = "a sink named {:?} already exists", _0)]
    NameCollision(String),

    /// A hook subscriber vetoed the operation (e.g. `SINK_NEW`, `SINK_FIXATE`).
    #[fail(display = "operation vetoed by a hook subscriber")]
    Vetoed,

    /// A `Driver` hook returned an error; the sink falls back to the
    /// software path for that capability from then on.
    #[fail(display = "driver hook {} failed: {}", hook, reason)]
    DriverFailed {
        hook: &'static str,
        reason: String,
    },

    /// The asynchronous message queue between control and IO thread could
    /// not accept or deliver a message (the IO thread has gone away).
    #[fail(display = "sink IO queue failure: {}", _0)]
    QueueFailed(String),

    /// The operation is not valid in the sink's current state (e.g.
    /// attaching to an `UNLINKED` sink).
    #[fail(display = "invalid operation in state {}: {}", state, op)]
    BadState {
        state: &'static str,
        op: &'static str,
    },

    /// An input that belongs to a sync group was targeted by an operation
    /// that doesn't support synchronized streams (e.g. a move).
    #[fail(display = "input is part of a sync group: {}", op)]
    Synchronized {
        op: &'static str,
    },
}

/// An error code understood by the PulseAudio protocol.
///
/// Can be sent to clients to inform them of a specific error.
#[repr(u32)]
#[derive(Debug, Copy, Clone, FromPrimitive, Fail)]
// TODO: Rename to `ErrorCode`?
pub enum PulseError {
    /// Access failure
    #[fail(display = "Access failure")]
    Access = 1,
    /// Unknown command
    #[fail(display = "Unknown command")]
    Command,
    /// Invalid argument
    #[fail(display = "Invalid argument")]
    Invalid,
    /// Entity exists
    #[fail(display = "Entity exists")]
    Exist,
    /// No such entity
    #[fail(display = "No such entity")]
    NoEntity,
    /// Connection refused
    #[fail(display = "Connection refused")]
    ConnectionRefused,
    /// Protocol error
    #[fail(display = "Protocol error")]
    Protocol,
    /// Timeout
    #[fail(display = "Timeout")]
    Timeout,
    /// No authentication key
    #[fail(display = "No authentication key")]
    AuthKey,
    /// Internal error
    #[fail(display = "Internal error")]
    Internal,
    /// Connection terminated
    #[fail(display = "Connection terminated")]
    ConnectionTerminated,
    /// Entity killed
    #[fail(display = "Entity killed")]
    Killed,
    /// Invalid server
    #[fail(display = "Invalid server")]
    InvalidServer,
    /// Module initialization failed
    #[fail(display = "Module initialization failed")]
    ModInitFailed,
    /// Bad state
    #[fail(display = "Bad state")]
    BadState,
    /// No data
    #[fail(display = "No data")]
    NoData,
    /// Incompatible protocol version
    #[fail(display = "Incompatible protocol version")]
    Version,
    /// Data too large
    #[fail(display = "Data too large")]
    TooLarge,
    /// Operation not supported (since 0.9.5)
    #[fail(display = "Operation not supported")]
    NotSupported,
    /// The error code was unknown to the client
    #[fail(display = "The error code was unknown to the client")]
    Unknown,
    /// Extension does not exist. (since 0.9.12)
    #[fail(display = "Extension does not exist")]
    NoExtension,
    /// Obsolete functionality. (since 0.9.15)
    #[fail(display = "Obsolete functionality")]
    Obsolete,
    /// Missing implementation. (since 0.9.15)
    #[fail(display = "Missing implementation")]
    NotImplemented,
    /// The caller forked without calling execve() and tried to reuse the context. \since 0.9.15
    #[fail(display = "The caller forked without calling execve() and tried to reuse the context")]
    Forked,
    /// An IO error happened. (since 0.9.16)
    #[fail(display = "An IO error happened")]
    Io,
    /// Device or resource busy. (since 0.9.17)
    #[fail(display = "Device or resource busy")]
    Busy,
}
