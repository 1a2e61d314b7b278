//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, count them, etc.

use crate::control::{ActuatorState, CommandField, Mode};
use crate::error::{RemoteError, StreamError};
use crate::paths::MAX_PATH_LEN;
use crate::sensors::SensorReading;
use crate::stream::DeclaredType;

use super::service::LinkState;
use super::telemetry::RecordKind;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The service has started (carries the seeded threshold).
    Started { temp_threshold: f32 },

    /// The remote store became reachable or unreachable.
    LinkChanged { from: LinkState, to: LinkState },

    /// A command notification was written into the command state.
    CommandApplied(CommandField),

    /// A command notification carried the wrong type and was dropped.
    CommandRejected {
        field: CommandField,
        declared: DeclaredType,
    },

    /// A notification named a path that is not a command field.
    UnknownCommandPath(heapless::String<MAX_PATH_LEN>),

    /// The subscription stalled or reported an error.
    StreamFault(StreamError),

    /// New actuator outputs were applied this tick.
    ActuatorsApplied { state: ActuatorState, mode: Mode },

    /// Per-tick telemetry snapshot.
    Telemetry(TelemetryData),

    /// A record write failed; the next tick writes fresh data.
    PublishFailed { record: RecordKind, error: RemoteError },
}

/// A point-in-time telemetry snapshot suitable for logging.
#[derive(Debug, Clone, Copy)]
pub struct TelemetryData {
    pub tick: u64,
    pub link: LinkState,
    pub reading: SensorReading,
    pub actuators: ActuatorState,
    pub mode: Mode,
    pub temp_threshold: f32,
}
