//! Application core: pure domain logic, zero I/O.
//!
//! This module sequences the greenhouse control loop: command intake from
//! the notification queue, policy evaluation, actuation and telemetry.
//! All interaction with hardware and the network happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable without
//! real peripherals.

pub mod events;
pub mod ports;
pub mod service;
pub mod telemetry;
