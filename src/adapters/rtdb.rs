//! Realtime-database adapter (REST writes + event-stream subscription).
//!
//! ## Write path
//!
//! [`RtdbClient`] implements [`RemoteStorePort`]: each upsert is one HTTP
//! `PUT {database_url}{path}.json[?auth=token]` carrying the full record.
//! Any 2xx status counts as success.
//!
//! ## Subscription path
//!
//! The stream reader runs on its own thread.  One *session* opens
//! `GET {database_url}/controls.json` with `Accept: text/event-stream`,
//! feeds the body through [`SseDecoder`] and hands every event to the
//! [`StreamHandler`].  A session ends on read timeout, server close,
//! error, `cancel` or `auth_revoked`; the reader then reconnects,
//! immediately after a timeout and with backoff (2 s doubling, capped at
//! 60 s) after anything else.  The backoff restarts from 2 s after any
//! session that got the stream open.
//!
//! ## cfg gating
//!
//! The transport and stream source traits are implemented with
//! `EspHttpConnection` on `target_os = "espidf"`; tests use scripted mocks.

use log::{info, warn};

use crate::app::ports::RemoteStorePort;
use crate::config::RemoteConfig;
use crate::error::{RemoteError, StreamError};
use crate::paths;
use crate::stream::sse::{SseDecoder, SseEvent};
use crate::stream::StreamHandler;

// ───────────────────────────────────────────────────────────────
// Transport seams
// ───────────────────────────────────────────────────────────────

/// Blocking HTTP PUT.  Returns the response status.
pub trait HttpTransport {
    fn put(&mut self, url: &str, body: &[u8]) -> Result<u16, RemoteError>;
}

/// Result of one blocking read on an open stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamRead {
    Data(usize),
    /// Nothing arrived within the stream timeout.
    Timeout,
    /// The server closed the connection.
    Closed,
    Failed(StreamError),
}

/// An event-stream connection that can be (re)opened.
pub trait StreamSource {
    fn open(&mut self, url: &str) -> Result<(), StreamError>;
    fn read(&mut self, buf: &mut [u8]) -> StreamRead;
}

// ───────────────────────────────────────────────────────────────
// Client (write path)
// ───────────────────────────────────────────────────────────────

pub struct RtdbClient<T> {
    base_url: String,
    auth: Option<String>,
    transport: T,
    network_up: bool,
}

impl<T: HttpTransport> RtdbClient<T> {
    pub fn new(config: &RemoteConfig, transport: T) -> Self {
        Self {
            base_url: config.database_url.trim_end_matches('/').to_string(),
            auth: config.auth_token.clone().filter(|t| !t.is_empty()),
            transport,
            network_up: false,
        }
    }

    /// Forwarded from the WiFi adapter once per tick.
    pub fn set_network_up(&mut self, up: bool) {
        self.network_up = up;
    }

    /// REST URL of the record at `path`.
    pub fn record_url(&self, path: &str) -> String {
        rest_url(&self.base_url, self.auth.as_deref(), path)
    }

    /// Subscription URL of the command subtree.
    pub fn stream_url(&self) -> String {
        self.record_url(paths::CONTROLS)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

fn rest_url(base: &str, auth: Option<&str>, path: &str) -> String {
    match auth {
        Some(token) => format!("{base}{path}.json?auth={token}"),
        None => format!("{base}{path}.json"),
    }
}

impl<T: HttpTransport> RemoteStorePort for RtdbClient<T> {
    fn is_ready(&mut self) -> bool {
        self.network_up && !self.base_url.is_empty()
    }

    fn upsert(&mut self, path: &str, json: &str) -> Result<(), RemoteError> {
        if !self.is_ready() {
            return Err(RemoteError::NotReady);
        }
        let url = self.record_url(path);
        let status = self.transport.put(&url, json.as_bytes())?;
        if (200..300).contains(&status) {
            Ok(())
        } else {
            Err(RemoteError::Http(status))
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Stream reader (subscription path)
// ───────────────────────────────────────────────────────────────

const READ_CHUNK: usize = 512;
const INITIAL_BACKOFF_MS: u32 = 2_000;
const MAX_BACKOFF_MS: u32 = 60_000;

/// Why a stream session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Read timed out; reconnect straight away.
    Timeout,
    /// Anything else; reconnect after backoff.  `connected` is set when
    /// the stream had opened before it failed.
    Fault { error: StreamError, connected: bool },
}

impl SessionEnd {
    /// The stream was open at some point during the session.
    pub fn connected(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Fault { connected, .. } => *connected,
        }
    }
}

/// Run one connection until it ends.  Every event, timeout and error is
/// reported to `handler` before returning.
pub fn run_session(
    source: &mut impl StreamSource,
    url: &str,
    decoder: &mut SseDecoder,
    handler: &StreamHandler<'_>,
) -> SessionEnd {
    decoder.reset();
    if let Err(error) = source.open(url) {
        handler.on_error(error.clone());
        return SessionEnd::Fault {
            error,
            connected: false,
        };
    }
    info!("Stream: subscribed to {}", paths::CONTROLS);

    let dropped = |error: StreamError| SessionEnd::Fault {
        error,
        connected: true,
    };
    let mut buf = [0u8; READ_CHUNK];
    loop {
        match source.read(&mut buf) {
            StreamRead::Data(n) => {
                let mut ended = None;
                decoder.feed(&buf[..n], |event| {
                    if let SseEvent::Fault(e) = &event {
                        ended = Some(e.clone());
                    }
                    event.dispatch(handler);
                });
                if let Some(e) = ended {
                    return dropped(e);
                }
            }
            StreamRead::Timeout => {
                handler.on_timeout();
                return SessionEnd::Timeout;
            }
            StreamRead::Closed => {
                let e = StreamError::http(0, "connection closed by server");
                handler.on_error(e.clone());
                return dropped(e);
            }
            StreamRead::Failed(e) => {
                handler.on_error(e.clone());
                return dropped(e);
            }
        }
    }
}

/// Reconnect schedule for the stream reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    next_ms: u32,
}

impl Backoff {
    pub const fn new() -> Self {
        Self {
            next_ms: INITIAL_BACKOFF_MS,
        }
    }

    /// How long to wait before reopening after `end`, if at all.  Any
    /// session that got the stream open restarts the schedule.
    pub fn after(&mut self, end: &SessionEnd) -> Option<u32> {
        if end.connected() {
            self.next_ms = INITIAL_BACKOFF_MS;
        }
        match end {
            SessionEnd::Timeout => None,
            SessionEnd::Fault { .. } => {
                let wait = self.next_ms;
                self.next_ms = self.next_ms.saturating_mul(2).min(MAX_BACKOFF_MS);
                Some(wait)
            }
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

/// Reader thread body.  Never returns.
pub fn run_stream_reader(
    mut source: impl StreamSource,
    url: &str,
    handler: &StreamHandler<'_>,
    mut sleep_ms: impl FnMut(u32),
) -> ! {
    let mut decoder = SseDecoder::new(paths::CONTROLS);
    let mut backoff = Backoff::new();
    loop {
        let end = run_session(&mut source, url, &mut decoder, handler);
        if let (SessionEnd::Fault { error, .. }, Some(wait)) = (&end, backoff.after(&end)) {
            warn!("Stream: session ended ({}), retry in {}ms", error, wait);
            sleep_ms(wait);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF transports
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod esp {
    use core::time::Duration;

    use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
    use esp_idf_svc::http::Method;
    use esp_idf_svc::sys::{esp_crt_bundle_attach, EspError, ESP_ERR_HTTP_EAGAIN};

    use super::{HttpTransport, StreamRead, StreamSource};
    use crate::error::{RemoteError, StreamError};

    fn connection(timeout_ms: u32) -> Result<EspHttpConnection, EspError> {
        EspHttpConnection::new(&Configuration {
            timeout: Some(Duration::from_millis(u64::from(timeout_ms))),
            crt_bundle_attach: Some(esp_crt_bundle_attach),
            ..Default::default()
        })
    }

    /// One connection per request; writes are a few per tick.
    pub struct EspHttpTransport {
        timeout_ms: u32,
    }

    impl EspHttpTransport {
        pub fn new(timeout_ms: u32) -> Self {
            Self { timeout_ms }
        }
    }

    impl HttpTransport for EspHttpTransport {
        fn put(&mut self, url: &str, body: &[u8]) -> Result<u16, RemoteError> {
            let transport = |e: EspError| RemoteError::Transport(e.code());
            let mut conn = connection(self.timeout_ms).map_err(transport)?;
            let len = body.len().to_string();
            let headers = [
                ("Content-Type", "application/json"),
                ("Content-Length", len.as_str()),
            ];
            conn.initiate_request(Method::Put, url, &headers)
                .map_err(transport)?;
            let mut sent = 0;
            while sent < body.len() {
                sent += conn.write(&body[sent..]).map_err(transport)?;
            }
            conn.initiate_response().map_err(transport)?;
            Ok(conn.status())
        }
    }

    /// Long-lived event-stream GET.
    pub struct EspStreamSource {
        timeout_ms: u32,
        conn: Option<EspHttpConnection>,
    }

    impl EspStreamSource {
        pub fn new(timeout_ms: u32) -> Self {
            Self {
                timeout_ms,
                conn: None,
            }
        }
    }

    impl StreamSource for EspStreamSource {
        fn open(&mut self, url: &str) -> Result<(), StreamError> {
            self.conn = None;
            let failed = |e: EspError| StreamError::http(e.code(), "stream connect failed");
            let mut conn = connection(self.timeout_ms).map_err(failed)?;
            conn.initiate_request(Method::Get, url, &[("Accept", "text/event-stream")])
                .map_err(failed)?;
            conn.initiate_response().map_err(failed)?;
            let status = conn.status();
            if status != 200 {
                return Err(StreamError::http(i32::from(status), "stream rejected"));
            }
            self.conn = Some(conn);
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> StreamRead {
            let Some(conn) = self.conn.as_mut() else {
                return StreamRead::Closed;
            };
            match conn.read(buf) {
                Ok(0) => StreamRead::Closed,
                Ok(n) => StreamRead::Data(n),
                Err(e) if e.code() == ESP_ERR_HTTP_EAGAIN as i32 => StreamRead::Timeout,
                Err(e) => StreamRead::Failed(StreamError::http(e.code(), "stream read failed")),
            }
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::{EspHttpTransport, EspStreamSource};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{NotificationQueue, StreamMessage, StreamValue};
    use std::collections::VecDeque;

    #[derive(Default)]
    struct MockTransport {
        status: u16,
        puts: Vec<(String, String)>,
    }

    impl HttpTransport for MockTransport {
        fn put(&mut self, url: &str, body: &[u8]) -> Result<u16, RemoteError> {
            self.puts
                .push((url.to_string(), String::from_utf8_lossy(body).into_owned()));
            Ok(self.status)
        }
    }

    fn config(token: Option<&str>) -> RemoteConfig {
        RemoteConfig {
            database_url: "https://greenhouse-demo.firebaseio.com/".into(),
            auth_token: token.map(str::to_string),
            ..RemoteConfig::default()
        }
    }

    #[test]
    fn urls_carry_json_suffix_and_token() {
        let client = RtdbClient::new(&config(Some("s3cret")), MockTransport::default());
        assert_eq!(
            client.record_url(paths::READINGS),
            "https://greenhouse-demo.firebaseio.com/readings.json?auth=s3cret"
        );
        let anon = RtdbClient::new(&config(None), MockTransport::default());
        assert_eq!(
            anon.stream_url(),
            "https://greenhouse-demo.firebaseio.com/controls.json"
        );
    }

    #[test]
    fn upsert_requires_network() {
        let mut client = RtdbClient::new(&config(None), MockTransport { status: 200, ..Default::default() });
        assert!(!client.is_ready());
        assert_eq!(client.upsert(paths::STATE, "{}"), Err(RemoteError::NotReady));
        assert!(client.transport().puts.is_empty());

        client.set_network_up(true);
        assert_eq!(client.upsert(paths::STATE, r#"{"valveState":true}"#), Ok(()));
        assert_eq!(client.transport().puts[0].1, r#"{"valveState":true}"#);
    }

    #[test]
    fn non_2xx_is_an_error() {
        let mut client = RtdbClient::new(&config(None), MockTransport { status: 401, ..Default::default() });
        client.set_network_up(true);
        assert_eq!(client.upsert(paths::READINGS, "{}"), Err(RemoteError::Http(401)));
    }

    struct ScriptedSource {
        open: Result<(), StreamError>,
        reads: VecDeque<Result<&'static [u8], StreamRead>>,
    }

    impl StreamSource for ScriptedSource {
        fn open(&mut self, _url: &str) -> Result<(), StreamError> {
            self.open.clone()
        }

        fn read(&mut self, buf: &mut [u8]) -> StreamRead {
            match self.reads.pop_front() {
                Some(Ok(bytes)) => {
                    buf[..bytes.len()].copy_from_slice(bytes);
                    StreamRead::Data(bytes.len())
                }
                Some(Err(r)) => r,
                None => StreamRead::Closed,
            }
        }
    }

    fn drain(queue: &NotificationQueue) -> Vec<StreamMessage> {
        let mut out = Vec::new();
        while let Ok(m) = queue.try_receive() {
            out.push(m);
        }
        out
    }

    #[test]
    fn session_delivers_updates_then_timeout() {
        let queue = NotificationQueue::new();
        let handler = StreamHandler::new(&queue);
        let mut source = ScriptedSource {
            open: Ok(()),
            reads: VecDeque::from([
                Ok(&b"event: put\ndata: {\"path\":\"/valveComm"[..]),
                Ok(&b"and\",\"data\":true}\n\n"[..]),
                Err(StreamRead::Timeout),
            ]),
        };
        let mut decoder = SseDecoder::new(paths::CONTROLS);

        let end = run_session(&mut source, "url", &mut decoder, &handler);
        assert_eq!(end, SessionEnd::Timeout);

        let msgs = drain(&queue);
        assert_eq!(msgs.len(), 2);
        match &msgs[0] {
            StreamMessage::Update(u) => {
                assert_eq!(u.path.as_str(), paths::VALVE_COMMAND);
                assert_eq!(u.value, StreamValue::Boolean(true));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(msgs[1], StreamMessage::Fault(StreamError::Timeout));
    }

    #[test]
    fn open_failure_reports_error() {
        let queue = NotificationQueue::new();
        let handler = StreamHandler::new(&queue);
        let err = StreamError::http(401, "stream rejected");
        let mut source = ScriptedSource {
            open: Err(err.clone()),
            reads: VecDeque::new(),
        };
        let end = run_session(&mut source, "url", &mut SseDecoder::new(paths::CONTROLS), &handler);
        assert_eq!(
            end,
            SessionEnd::Fault {
                error: err.clone(),
                connected: false
            }
        );
        assert_eq!(drain(&queue), vec![StreamMessage::Fault(err)]);
    }

    #[test]
    fn auth_revoked_ends_session() {
        let queue = NotificationQueue::new();
        let handler = StreamHandler::new(&queue);
        let mut source = ScriptedSource {
            open: Ok(()),
            reads: VecDeque::from([
                Ok(&b"event: auth_revoked\ndata: credential is no longer valid\n\n"[..]),
                Ok(&b"event: put\ndata: {\"path\":\"/fanAutoMode\",\"data\":false}\n\n"[..]),
            ]),
        };
        let end = run_session(&mut source, "url", &mut SseDecoder::new(paths::CONTROLS), &handler);
        assert_eq!(
            end,
            SessionEnd::Fault {
                error: StreamError::AuthRevoked,
                connected: true
            }
        );
        // Nothing after the revocation is read.
        assert_eq!(source.reads.len(), 1);
    }

    #[test]
    fn backoff_doubles_on_refused_opens() {
        let refused = SessionEnd::Fault {
            error: StreamError::http(503, "stream rejected"),
            connected: false,
        };
        let mut backoff = Backoff::new();
        let waits: Vec<_> = (0..7).filter_map(|_| backoff.after(&refused)).collect();
        assert_eq!(waits, [2_000, 4_000, 8_000, 16_000, 32_000, 60_000, 60_000]);
        assert_eq!(backoff.after(&SessionEnd::Timeout), None);
        assert_eq!(backoff.after(&refused), Some(2_000));
    }

    /// Fails `refusals` opens, then opens fine and is closed by the server.
    struct FlakyStore {
        refusals: usize,
        opened: bool,
    }

    impl StreamSource for FlakyStore {
        fn open(&mut self, _url: &str) -> Result<(), StreamError> {
            if self.refusals > 0 {
                self.refusals -= 1;
                return Err(StreamError::http(503, "stream rejected"));
            }
            self.opened = true;
            Ok(())
        }

        fn read(&mut self, _buf: &mut [u8]) -> StreamRead {
            StreamRead::Closed
        }
    }

    #[test]
    fn recovered_store_restarts_backoff() {
        let queue = NotificationQueue::new();
        let handler = StreamHandler::new(&queue);
        let mut source = FlakyStore {
            refusals: 4,
            opened: false,
        };
        let mut decoder = SseDecoder::new(paths::CONTROLS);
        let mut backoff = Backoff::new();

        let mut waits = Vec::new();
        for _ in 0..7 {
            let end = run_session(&mut source, "url", &mut decoder, &handler);
            waits.extend(backoff.after(&end));
            drain(&queue);
        }
        assert!(source.opened);
        assert_eq!(waits, [2_000, 4_000, 8_000, 16_000, 2_000, 2_000, 2_000]);
    }
}
