//! Sensor subsystem: the reading type, raw sources, and the aggregating
//! [`SensorHub`].
//!
//! The hub produces one [`SensorReading`] per control tick.  Only the
//! latest value matters; no history is kept beyond the last good value
//! of each channel.

pub mod simulated;

use log::warn;

/// One tick's worth of environment readings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorReading {
    /// Air temperature (°C).
    pub temperature_c: f32,
    /// Relative humidity (%).
    pub humidity_pct: f32,
    /// Soil moisture, probe 1 (%).
    pub soil_moisture_pct: f32,
}

/// A raw source of readings: real drivers or the simulator.
///
/// Implementations report what they measured; a failed channel may be
/// reported as NaN and the hub substitutes the previous good value.
pub trait RawSensors {
    fn sample(&mut self) -> SensorReading;
}

/// Plausible physical ranges (DHT22 temperature, percentages).
const TEMP_RANGE_C: (f32, f32) = (-40.0, 85.0);
const PERCENT_RANGE: (f32, f32) = (0.0, 100.0);

/// Aggregates the raw source and filters implausible values.
pub struct SensorHub<S> {
    source: S,
    last_good: SensorReading,
}

impl<S: RawSensors> SensorHub<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            last_good: SensorReading::default(),
        }
    }

    /// Sample every channel and return a unified reading.
    ///
    /// Individual channel failures are logged and the previous good value
    /// is retained: a single flaky sensor must not stall the control loop.
    pub fn read_all(&mut self) -> SensorReading {
        let raw = self.source.sample();
        let prev = self.last_good;

        let reading = SensorReading {
            temperature_c: checked("temperature", raw.temperature_c, TEMP_RANGE_C, prev.temperature_c),
            humidity_pct: checked("humidity", raw.humidity_pct, PERCENT_RANGE, prev.humidity_pct),
            soil_moisture_pct: checked(
                "soil moisture",
                raw.soil_moisture_pct,
                PERCENT_RANGE,
                prev.soil_moisture_pct,
            ),
        };
        self.last_good = reading;
        reading
    }
}

fn checked(name: &str, value: f32, (lo, hi): (f32, f32), fallback: f32) -> f32 {
    if value.is_finite() && (lo..=hi).contains(&value) {
        value
    } else {
        warn!("Sensor: {} reading {} rejected, keeping {}", name, value, fallback);
        fallback
    }
}
