//! Control core: command state and the actuator policy.
//!
//! ```text
//!  stream ──▶ CommandState ──┐
//!                            ├──▶ policy::evaluate ──▶ ActuatorState
//!  sensors ─▶ SensorReading ─┘
//! ```
//!
//! Nothing in here performs I/O; the control loop in
//! [`AppService`](crate::app::service::AppService) threads these values
//! through the port traits.

pub mod command_state;
pub mod policy;

pub use command_state::{CommandField, CommandState, FieldKind, UpdateOutcome};
pub use policy::{evaluate, ActuatorState, Mode};
