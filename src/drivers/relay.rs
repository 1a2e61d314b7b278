//! Relay driver for the irrigation valve and the ventilation fan.
//!
//! On/off only.  Boards differ in polarity: many opto-isolated relay
//! modules energise the coil when the input is pulled *low*, so the
//! driver translates logical on/off through `active_low`.
//!
//! The driver is a dumb actuator; the control policy decides when to
//! switch.  A failed pin write is logged and the logical state is left
//! unchanged so the next tick retries.

use embedded_hal::digital::OutputPin;
use log::warn;

pub struct RelayDriver<P> {
    pin: P,
    active_low: bool,
    on: bool,
    name: &'static str,
}

impl<P: OutputPin> RelayDriver<P> {
    /// Wrap `pin` and drive it to the de-energised level.
    pub fn new(pin: P, active_low: bool, name: &'static str) -> Self {
        let mut relay = Self {
            pin,
            active_low,
            on: true,
            name,
        };
        relay.set(false);
        relay
    }

    /// Switch the relay.  No-op when already in the requested state.
    pub fn set(&mut self, on: bool) {
        if on == self.on {
            return;
        }
        let high = on != self.active_low;
        let result = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match result {
            Ok(()) => self.on = on,
            Err(e) => warn!("{} relay write failed: {:?}", self.name, e),
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    #[cfg(test)]
    fn pin(&self) -> &P {
        &self.pin
    }
}
