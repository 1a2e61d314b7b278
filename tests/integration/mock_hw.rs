//! Mock adapters for integration tests.
//!
//! Records every actuator call and every store write so tests can assert
//! on the full history without touching GPIO or the network.

use greenhouse::app::events::AppEvent;
use greenhouse::app::ports::{ActuatorPort, EventSink, RemoteStorePort, SensorPort};
use greenhouse::control::ActuatorState;
use greenhouse::error::RemoteError;
use greenhouse::sensors::SensorReading;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorCall {
    Apply(ActuatorState),
    AllOff,
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub reading: SensorReading,
    pub reads: usize,
    pub calls: Vec<ActuatorCall>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new(temperature_c: f32) -> Self {
        Self {
            reading: SensorReading {
                temperature_c,
                humidity_pct: 55.0,
                soil_moisture_pct: 42.0,
            },
            reads: 0,
            calls: Vec::new(),
        }
    }

    pub fn set_temperature(&mut self, temperature_c: f32) {
        self.reading.temperature_c = temperature_c;
    }

    /// What the relays are doing after the last call.
    pub fn outputs(&self) -> ActuatorState {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                ActuatorCall::Apply(s) => Some(*s),
                ActuatorCall::AllOff => Some(ActuatorState::all_off()),
            })
            .unwrap_or(ActuatorState::all_off())
    }
}

impl SensorPort for MockHardware {
    fn read(&mut self) -> SensorReading {
        self.reads += 1;
        self.reading
    }
}

impl ActuatorPort for MockHardware {
    fn apply(&mut self, state: ActuatorState) {
        self.calls.push(ActuatorCall::Apply(state));
    }

    fn all_off(&mut self) {
        self.calls.push(ActuatorCall::AllOff);
    }
}

// ── MockStore ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockStore {
    pub ready: bool,
    /// Paths whose writes fail with HTTP 503.
    pub failing: Vec<&'static str>,
    pub writes: Vec<(String, String)>,
}

#[allow(dead_code)]
impl MockStore {
    pub fn connected() -> Self {
        Self {
            ready: true,
            ..Self::default()
        }
    }

    pub fn last_write(&self, path: &str) -> Option<serde_json::Value> {
        self.writes
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .and_then(|(_, body)| serde_json::from_str(body).ok())
    }
}

impl RemoteStorePort for MockStore {
    fn is_ready(&mut self) -> bool {
        self.ready
    }

    fn upsert(&mut self, path: &str, json: &str) -> Result<(), RemoteError> {
        self.writes.push((path.to_string(), json.to_string()));
        if self.failing.contains(&path) {
            Err(RemoteError::Http(503))
        } else {
            Ok(())
        }
    }
}

// ── LogSink ───────────────────────────────────────────────────

pub struct LogSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl LogSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for LogSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
