//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (sensors, relays, the remote store, event sinks)
//! implement these traits.  The [`AppService`](super::service::AppService)
//! consumes them via generics, so the control loop never touches hardware
//! or the network directly.

use crate::control::ActuatorState;
use crate::error::RemoteError;
use crate::sensors::SensorReading;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this once per tick.
pub trait SensorPort {
    /// Obtain the current reading.  Never fails at this layer; adapters
    /// substitute the last good value for a failed channel.
    fn read(&mut self) -> SensorReading;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to drive the relays.
pub trait ActuatorPort {
    /// Drive both outputs to `state`.  Synchronous; physical I/O errors
    /// are the adapter's to log.
    fn apply(&mut self, state: ActuatorState);

    /// De-energise everything: safe shutdown.
    fn all_off(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Remote store port (driven adapter: domain ↔ control-plane store)
// ───────────────────────────────────────────────────────────────

/// The store's write primitive plus its readiness signal.
///
/// The subscription side does not appear here: it arrives through the
/// [`NotificationQueue`](crate::stream::NotificationQueue).
pub trait RemoteStorePort {
    /// Whether writes can currently be attempted.
    fn is_ready(&mut self) -> bool;

    /// Replace the whole record at `path` with the JSON document `json`.
    fn upsert(&mut self, path: &str, json: &str) -> Result<(), RemoteError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
