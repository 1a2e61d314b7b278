//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the [`SensorHub`] and both relay drivers, exposing them through
//! [`SensorPort`] and [`ActuatorPort`].  This is the only module in the
//! system that touches actuator hardware.  On non-espidf targets the
//! relay pins are in-memory simulation stubs.

use embedded_hal::digital::OutputPin;

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::control::ActuatorState;
use crate::drivers::relay::RelayDriver;
use crate::sensors::{RawSensors, SensorHub, SensorReading};

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<S, P> {
    sensor_hub: SensorHub<S>,
    valve: RelayDriver<P>,
    fan: RelayDriver<P>,
}

impl<S: RawSensors, P: OutputPin> HardwareAdapter<S, P> {
    pub fn new(sensor_hub: SensorHub<S>, valve: RelayDriver<P>, fan: RelayDriver<P>) -> Self {
        Self {
            sensor_hub,
            valve,
            fan,
        }
    }

    /// What the relays are actually doing.
    pub fn outputs(&self) -> ActuatorState {
        ActuatorState {
            valve_on: self.valve.is_on(),
            fan_on: self.fan.is_on(),
        }
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<S: RawSensors, P: OutputPin> SensorPort for HardwareAdapter<S, P> {
    fn read(&mut self) -> SensorReading {
        self.sensor_hub.read_all()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<S: RawSensors, P: OutputPin> ActuatorPort for HardwareAdapter<S, P> {
    fn apply(&mut self, state: ActuatorState) {
        self.valve.set(state.valve_on);
        self.fan.set(state.fan_on);
    }

    fn all_off(&mut self) {
        self.valve.set(false);
        self.fan.set(false);
    }
}
