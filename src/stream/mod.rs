//! Command stream: the boundary between the store subscription and the
//! control loop.
//!
//! The transport (see [`adapters::rtdb`](crate::adapters::rtdb)) decodes
//! change notifications and hands them to a [`StreamHandler`], which only
//! pushes them onto a bounded [`NotificationQueue`] and returns.  The
//! control loop drains the queue before each evaluation, so
//! [`CommandState`](crate::control::CommandState) is never touched from
//! the transport's context.
//!
//! ```text
//! ┌──────────────┐ StreamMessage ┌───────────────────┐ drain ┌──────────────┐
//! │ stream reader│──────────────▶│ NotificationQueue │──────▶│ Control Loop │
//! │  (transport) │               │ (bounded, FIFO,   │       │  (AppService)│
//! │              │               │  coalescing)      │       │              │
//! └──────────────┘               └───────────────────┘       └──────────────┘
//! ```

pub mod sse;

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use log::{debug, warn};

use crate::error::{truncated, StreamError};
use crate::paths::MAX_PATH_LEN;

// ───────────────────────────────────────────────────────────────
// Notification payload
// ───────────────────────────────────────────────────────────────

/// Type tag the store attaches to every notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredType {
    Boolean,
    Int,
    Float,
    String,
    Json,
    Array,
    Null,
}

impl DeclaredType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Json => "json",
            Self::Array => "array",
            Self::Null => "null",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification value.  Structured payloads are never applied to a
/// command field, so only their presence is kept.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamValue {
    Boolean(bool),
    Number(f64),
    Text(heapless::String<64>),
    Structured,
    Null,
}

impl StreamValue {
    /// Classify a decoded JSON value the way the store tags it.
    pub fn from_json(value: &serde_json::Value) -> (DeclaredType, Self) {
        use serde_json::Value;
        match value {
            Value::Bool(b) => (DeclaredType::Boolean, Self::Boolean(*b)),
            Value::Number(n) => {
                let declared = if n.is_f64() {
                    DeclaredType::Float
                } else {
                    DeclaredType::Int
                };
                (declared, Self::Number(n.as_f64().unwrap_or(f64::NAN)))
            }
            Value::String(s) => (DeclaredType::String, Self::Text(truncated(s))),
            Value::Object(_) => (DeclaredType::Json, Self::Structured),
            Value::Array(_) => (DeclaredType::Array, Self::Structured),
            Value::Null => (DeclaredType::Null, Self::Null),
        }
    }
}

/// One field change: full store path, declared type, value.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub path: heapless::String<MAX_PATH_LEN>,
    pub declared: DeclaredType,
    pub value: StreamValue,
}

impl FieldUpdate {
    /// `None` if `path` is longer than any command path can be.
    pub fn new(path: &str, declared: DeclaredType, value: StreamValue) -> Option<Self> {
        let mut p = heapless::String::new();
        p.push_str(path).ok()?;
        Some(Self {
            path: p,
            declared,
            value,
        })
    }
}

/// Everything the subscription can deliver to the control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    Update(FieldUpdate),
    /// Stall, disconnect, or server-side cancel.  Command state is kept.
    Fault(StreamError),
}

// ───────────────────────────────────────────────────────────────
// Queue
// ───────────────────────────────────────────────────────────────

/// Queue depth.  A burst larger than this coalesces superseded updates
/// (see [`StreamHandler::deliver`]).
pub const QUEUE_DEPTH: usize = 16;

/// Bounded queue: stream reader → control loop.
pub type NotificationQueue = Channel<CriticalSectionRawMutex, StreamMessage, QUEUE_DEPTH>;

/// The device-wide queue shared by the stream reader thread and `main`.
pub static NOTIFICATIONS: NotificationQueue = Channel::new();

// ───────────────────────────────────────────────────────────────
// Handler (transport side)
// ───────────────────────────────────────────────────────────────

/// Transport-side entry point.  Every method returns promptly and never
/// touches the network or the command state.
pub struct StreamHandler<'q> {
    queue: &'q NotificationQueue,
    dropped: AtomicU32,
    lost: AtomicU32,
}

impl<'q> StreamHandler<'q> {
    pub const fn new(queue: &'q NotificationQueue) -> Self {
        Self {
            queue,
            dropped: AtomicU32::new(0),
            lost: AtomicU32::new(0),
        }
    }

    /// A single field changed.
    pub fn on_update(&self, path: &str, declared: DeclaredType, value: StreamValue) {
        debug!("Stream at {}, value {:?}, type {}", path, value, declared);
        match FieldUpdate::new(path, declared, value) {
            Some(update) => self.deliver(StreamMessage::Update(update)),
            None => warn!("Stream: path too long, dropped ({} bytes)", path.len()),
        }
    }

    /// The stream went quiet.  Resumption is the transport's job.
    pub fn on_timeout(&self) {
        warn!("Stream timeout, resuming...");
        self.deliver(StreamMessage::Fault(StreamError::Timeout));
    }

    /// The stream connection reported an error.
    pub fn on_error(&self, error: StreamError) {
        warn!("Stream error: {}", error);
        self.deliver(StreamMessage::Fault(error));
    }

    /// Enqueue.  When the queue is full, one entry is evicted to make room:
    /// the oldest update whose path has a newer update queued behind it,
    /// else the oldest fault, else (last resort) the oldest entry.
    pub fn deliver(&self, msg: StreamMessage) {
        let msg = match self.queue.try_send(msg) {
            Ok(()) => return,
            Err(TrySendError::Full(msg)) => msg,
        };

        let mut pending: heapless::Vec<StreamMessage, { QUEUE_DEPTH + 1 }> = heapless::Vec::new();
        while let Ok(queued) = self.queue.try_receive() {
            if pending.push(queued).is_err() {
                break;
            }
        }
        if pending.push(msg).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }

        // The control loop may have drained the queue in the meantime.
        if pending.len() > QUEUE_DEPTH {
            let (victim, eviction) = pick_eviction(&pending);
            let _ = pending.remove(victim);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            match eviction {
                Eviction::Superseded => debug!("Stream: queue full, superseded update coalesced"),
                Eviction::Fault => warn!("Stream: queue full, oldest fault dropped"),
                Eviction::Lost => {
                    self.lost.fetch_add(1, Ordering::Relaxed);
                    warn!("Stream: queue full, oldest notification lost");
                }
            }
        }

        for queued in pending {
            if self.queue.try_send(queued).is_err() {
                // Lost a race with another producer; count this one too.
                self.dropped.fetch_add(1, Ordering::Relaxed);
                self.lost.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Notifications discarded because the control loop fell behind.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Evictions that discarded the only queued value for a field.
    pub fn lost(&self) -> u32 {
        self.lost.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Eviction {
    /// A newer update to the same path is still queued.
    Superseded,
    /// A stream fault; command state does not depend on it.
    Fault,
    Lost,
}

fn pick_eviction(pending: &[StreamMessage]) -> (usize, Eviction) {
    let superseded = pending.iter().enumerate().position(|(i, msg)| match msg {
        StreamMessage::Update(old) => pending[i + 1..]
            .iter()
            .any(|later| matches!(later, StreamMessage::Update(new) if new.path == old.path)),
        StreamMessage::Fault(_) => false,
    });
    if let Some(i) = superseded {
        return (i, Eviction::Superseded);
    }
    if let Some(i) = pending
        .iter()
        .position(|msg| matches!(msg, StreamMessage::Fault(_)))
    {
        return (i, Eviction::Fault);
    }
    (0, Eviction::Lost)
}
