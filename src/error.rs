//! Unified error types for the greenhouse firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping
//! the top-level control loop's error handling uniform.  None of these
//! are fatal inside the loop: the caller logs them and tries again on
//! the next tick.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The remote store rejected or could not receive a write.
    Remote(RemoteError),
    /// The command stream stalled or reported an error.
    Stream(StreamError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(e) => write!(f, "remote: {e}"),
            Self::Stream(e) => write!(f, "stream: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Remote store (write path) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteError {
    /// Network down or store client not configured.
    NotReady,
    /// The store answered with a non-2xx status.
    Http(u16),
    /// The request never completed (socket/TLS error code).
    Transport(i32),
    /// The record could not be serialised.
    Encode,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "remote store not ready"),
            Self::Http(status) => write!(f, "HTTP status {status}"),
            Self::Transport(rc) => write!(f, "transport error (rc={rc})"),
            Self::Encode => write!(f, "record encoding failed"),
        }
    }
}

impl From<RemoteError> for Error {
    fn from(e: RemoteError) -> Self {
        Self::Remote(e)
    }
}

// ---------------------------------------------------------------------------
// Stream (subscription path) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// No bytes (not even a keep-alive) within the stream timeout.
    Timeout,
    /// The stream connection failed or was dropped by the server.
    Http {
        code: i32,
        reason: heapless::String<64>,
    },
    /// The server cancelled the subscription (rules changed).
    Cancelled,
    /// The auth token expired or was revoked.
    AuthRevoked,
}

impl StreamError {
    /// Build an [`StreamError::Http`], truncating `reason` to fit.
    pub fn http(code: i32, reason: &str) -> Self {
        Self::Http {
            code,
            reason: truncated(reason),
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "stream timeout"),
            Self::Http { code, reason } => write!(f, "stream error {code}: {reason}"),
            Self::Cancelled => write!(f, "subscription cancelled by server"),
            Self::AuthRevoked => write!(f, "auth revoked"),
        }
    }
}

impl From<StreamError> for Error {
    fn from(e: StreamError) -> Self {
        Self::Stream(e)
    }
}

/// Copy as much of `s` as fits into a fixed-capacity string, respecting
/// UTF-8 boundaries.
pub(crate) fn truncated<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for ch in s.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
