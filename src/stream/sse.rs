//! Realtime-database streaming decoder (server-sent events).
//!
//! The store streams a subscription as `text/event-stream`:
//!
//! ```text
//! event: put
//! data: {"path":"/valveCommand","data":true}
//!
//! event: keep-alive
//! data: null
//!
//! ```
//!
//! [`SseDecoder`] accepts arbitrary byte chunks (split anywhere), frames
//! lines, and turns each complete event into zero or more [`SseEvent`]s.
//! Paths are made absolute by prefixing the subscription root.  An object
//! payload is fanned out into one update per child key, which is how the
//! initial snapshot and multi-field writes arrive.

use log::{debug, warn};
use serde::Deserialize;

use super::{DeclaredType, StreamHandler, StreamValue};
use crate::error::StreamError;
use crate::paths;

/// Longest line kept; longer lines are discarded up to the next newline.
pub const MAX_LINE_LEN: usize = 8 * 1024;

/// One decoded stream event.
#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    Update {
        path: String,
        declared: DeclaredType,
        value: StreamValue,
    },
    KeepAlive,
    Fault(StreamError),
}

impl SseEvent {
    /// Hand the event to the subscription handler.
    pub fn dispatch(self, handler: &StreamHandler<'_>) {
        match self {
            Self::Update {
                path,
                declared,
                value,
            } => handler.on_update(&path, declared, value),
            Self::KeepAlive => {}
            Self::Fault(e) => handler.on_error(e),
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    path: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Incremental event-stream decoder bound to one subscription root.
pub struct SseDecoder {
    root: String,
    line: Vec<u8>,
    discarding: bool,
    event: String,
    data: String,
}

impl SseDecoder {
    pub fn new(root: &str) -> Self {
        Self {
            root: root.to_string(),
            line: Vec::new(),
            discarding: false,
            event: String::new(),
            data: String::new(),
        }
    }

    /// Feed raw bytes from the connection.
    pub fn feed(&mut self, bytes: &[u8], mut emit: impl FnMut(SseEvent)) {
        for &b in bytes {
            if b == b'\n' {
                if self.discarding {
                    self.discarding = false;
                } else {
                    let raw = core::mem::take(&mut self.line);
                    self.process_line(&raw, &mut emit);
                }
                continue;
            }
            if self.discarding {
                continue;
            }
            if self.line.len() >= MAX_LINE_LEN {
                warn!("SSE: line exceeds {} bytes, discarded", MAX_LINE_LEN);
                self.line.clear();
                self.discarding = true;
                continue;
            }
            self.line.push(b);
        }
    }

    /// Forget any partial line or event (call after a reconnect).
    pub fn reset(&mut self) {
        self.line.clear();
        self.discarding = false;
        self.event.clear();
        self.data.clear();
    }

    fn process_line(&mut self, raw: &[u8], emit: &mut impl FnMut(SseEvent)) {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let Ok(line) = core::str::from_utf8(raw) else {
            warn!("SSE: non-UTF-8 line skipped");
            return;
        };

        if line.is_empty() {
            self.dispatch(emit);
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        match field {
            "event" => {
                self.event.clear();
                self.event.push_str(value);
            }
            "data" => {
                if !self.data.is_empty() {
                    self.data.push('\n');
                }
                self.data.push_str(value);
            }
            _ => {}
        }
    }

    fn dispatch(&mut self, emit: &mut impl FnMut(SseEvent)) {
        let event = core::mem::take(&mut self.event);
        let data = core::mem::take(&mut self.data);

        match event.as_str() {
            "put" | "patch" => self.decode_change(&data, emit),
            "keep-alive" => emit(SseEvent::KeepAlive),
            "cancel" => emit(SseEvent::Fault(StreamError::Cancelled)),
            "auth_revoked" => emit(SseEvent::Fault(StreamError::AuthRevoked)),
            "" if data.is_empty() => {}
            other => debug!("SSE: ignoring event '{}'", other),
        }
    }

    fn decode_change(&self, data: &str, emit: &mut impl FnMut(SseEvent)) {
        let envelope: Envelope = match serde_json::from_str(data) {
            Ok(e) => e,
            Err(_) => {
                warn!("SSE: malformed change payload skipped");
                return;
            }
        };
        let base = paths::join(&self.root, &envelope.path);

        if let serde_json::Value::Object(children) = &envelope.data {
            for (key, value) in children {
                let (declared, value) = StreamValue::from_json(value);
                emit(SseEvent::Update {
                    path: paths::join(&base, key),
                    declared,
                    value,
                });
            }
        } else {
            let (declared, value) = StreamValue::from_json(&envelope.data);
            emit(SseEvent::Update {
                path: base,
                declared,
                value,
            });
        }
    }
}
