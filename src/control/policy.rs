//! Actuator policy: maps commands and the latest reading to outputs.
//!
//! - Valve: always mirrors `valve_command`.  It has no automatic mode.
//! - Fan, auto mode: ON iff `temperature > temp_threshold` (strict; equal is OFF).
//! - Fan, manual mode: mirrors `fan_manual_command`; temperature is ignored.

use core::fmt;

use super::command_state::CommandState;
use crate::sensors::SensorReading;

/// Fan control mode, carried on the wire as `fanAutoMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Auto,
    Manual,
}

impl Mode {
    pub fn from_auto_flag(fan_auto_mode: bool) -> Self {
        if fan_auto_mode { Self::Auto } else { Self::Manual }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "Auto"),
            Self::Manual => write!(f, "Manual"),
        }
    }
}

/// Desired physical outputs for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActuatorState {
    pub valve_on: bool,
    pub fan_on: bool,
}

impl ActuatorState {
    /// Everything de-energised.
    pub fn all_off() -> Self {
        Self::default()
    }
}

/// Evaluate the policy.  Pure: identical inputs always give identical output.
pub fn evaluate(cmd: &CommandState, reading: &SensorReading) -> ActuatorState {
    let fan_on = match Mode::from_auto_flag(cmd.fan_auto_mode) {
        Mode::Auto => reading.temperature_c > cmd.temp_threshold,
        Mode::Manual => cmd.fan_manual_command,
    };
    ActuatorState {
        valve_on: cmd.valve_command,
        fan_on,
    }
}
