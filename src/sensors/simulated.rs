//! Simulated climate and soil sensors.
//!
//! Stands in for the DHT/soil-probe drivers until the board is wired.
//! Values are uniformly distributed over typical greenhouse ranges:
//!
//! | Channel       | Range          | Resolution |
//! |---------------|----------------|------------|
//! | temperature   | 20.0 – 34.9 °C | 0.1 °C     |
//! | humidity      | 40 – 69 %      | 1 %        |
//! | soil moisture | 30 – 79 %      | 1 %        |
//!
//! ## Dual-target design
//!
//! On ESP-IDF: seeded from the hardware RNG.
//! On host/test: seeded explicitly for reproducible runs.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::{RawSensors, SensorReading};

pub struct SimulatedSensors {
    rng: SmallRng,
}

impl SimulatedSensors {
    /// Deterministic sequence for a given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Seed from the ESP32 hardware RNG.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Self {
        // SAFETY: esp_random has no preconditions.
        let hi = unsafe { esp_idf_svc::sys::esp_random() } as u64;
        let lo = unsafe { esp_idf_svc::sys::esp_random() } as u64;
        Self::with_seed((hi << 32) | lo)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self::with_seed(0x6772_6565_6e68_6f75)
    }
}

impl Default for SimulatedSensors {
    fn default() -> Self {
        Self::new()
    }
}

impl RawSensors for SimulatedSensors {
    fn sample(&mut self) -> SensorReading {
        SensorReading {
            temperature_c: self.rng.gen_range(200..350) as f32 / 10.0,
            humidity_pct: self.rng.gen_range(40..70) as f32,
            soil_moisture_pct: self.rng.gen_range(30..80) as f32,
        }
    }
}
