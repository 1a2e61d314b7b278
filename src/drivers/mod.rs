//! Relay drivers, GPIO initialisation, task spawning, and the watchdog.

pub mod hw_init;
pub mod relay;
pub mod task_pin;
pub mod watchdog;
