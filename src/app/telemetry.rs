//! Telemetry publisher: readings and actuator state to the store.
//!
//! Two independent records are rewritten in full every tick:
//!
//! | Path        | Record                                        |
//! |-------------|-----------------------------------------------|
//! | `/readings` | `{temperature, humidity, soilMoisture1}`      |
//! | `/state`    | `{valveState, fanState}`                      |
//!
//! A failed write never blocks the other one and is never retried within
//! the tick.

use core::fmt;

use serde::Serialize;

use super::ports::RemoteStorePort;
use crate::control::ActuatorState;
use crate::error::RemoteError;
use crate::paths;
use crate::sensors::SensorReading;

/// `/readings` record, field names as the app expects them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReadingsRecord {
    pub temperature: f32,
    pub humidity: f32,
    #[serde(rename = "soilMoisture1")]
    pub soil_moisture1: f32,
}

impl From<&SensorReading> for ReadingsRecord {
    fn from(r: &SensorReading) -> Self {
        Self {
            temperature: r.temperature_c,
            humidity: r.humidity_pct,
            soil_moisture1: r.soil_moisture_pct,
        }
    }
}

/// `/state` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateRecord {
    pub valve_state: bool,
    pub fan_state: bool,
}

impl From<&ActuatorState> for StateRecord {
    fn from(s: &ActuatorState) -> Self {
        Self {
            valve_state: s.valve_on,
            fan_state: s.fan_on,
        }
    }
}

/// Which record a publish result refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Readings,
    State,
}

impl RecordKind {
    pub fn path(self) -> &'static str {
        match self {
            Self::Readings => paths::READINGS,
            Self::State => paths::STATE,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Outcome of one publish pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    pub readings: Result<(), RemoteError>,
    pub state: Result<(), RemoteError>,
}

impl PublishReport {
    pub fn all_ok(&self) -> bool {
        self.readings.is_ok() && self.state.is_ok()
    }

    /// Failed records with their errors, readings first.
    pub fn failures(&self) -> impl Iterator<Item = (RecordKind, RemoteError)> + '_ {
        [
            (RecordKind::Readings, self.readings),
            (RecordKind::State, self.state),
        ]
        .into_iter()
        .filter_map(|(kind, r)| r.err().map(|e| (kind, e)))
    }
}

/// Serialise and upsert both records.
pub fn publish(
    remote: &mut impl RemoteStorePort,
    reading: &SensorReading,
    state: &ActuatorState,
) -> PublishReport {
    PublishReport {
        readings: write_record(remote, RecordKind::Readings, &ReadingsRecord::from(reading)),
        state: write_record(remote, RecordKind::State, &StateRecord::from(state)),
    }
}

fn write_record(
    remote: &mut impl RemoteStorePort,
    kind: RecordKind,
    record: &impl Serialize,
) -> Result<(), RemoteError> {
    let json = serde_json::to_string(record).map_err(|_| RemoteError::Encode)?;
    remote.upsert(kind.path(), &json)
}
