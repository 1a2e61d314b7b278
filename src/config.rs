//! System configuration parameters
//!
//! All tunable parameters for the greenhouse node.  The store path layout
//! is not configurable: see [`crate::paths`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Highest GPIO number on the ESP32 family.
const MAX_GPIO: i32 = 48;

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Timing ---
    /// Control loop period: read → evaluate → apply → publish (milliseconds)
    pub tick_interval_ms: u32,

    /// Task watchdog timeout (milliseconds).  Must cover
    /// [`loop_budget_ms`](Self::loop_budget_ms).
    pub watchdog_timeout_ms: u32,

    // --- Control ---
    /// Auto-mode fan threshold (°C) used until the store sends one
    pub default_temp_threshold_c: f32,

    // --- Remote store ---
    pub remote: RemoteConfig,

    // --- Network ---
    pub wifi: WifiConfig,

    // --- Outputs ---
    pub actuators: ActuatorPins,
}

/// Realtime-database endpoint and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Database root, e.g. `https://my-farm-default-rtdb.firebaseio.com`
    pub database_url: String,
    /// Database secret or ID token appended as `?auth=`; `None` for open rules
    pub auth_token: Option<String>,
    /// Stream is considered stalled after this long without bytes (milliseconds)
    pub stream_timeout_ms: u32,
    /// HTTP timeout of one record write (milliseconds).  Writes block the
    /// control loop, so keep this short.
    pub write_timeout_ms: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiConfig {
    pub ssid: String,
    pub password: String,
    /// Upper bound on one blocking connect attempt (milliseconds)
    pub connect_timeout_ms: u32,
}

/// Relay output wiring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorPins {
    pub valve_gpio: i32,
    pub fan_gpio: i32,
    /// Relay boards that energise on a LOW input
    pub active_low: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 10_000, // 0.1 Hz
            watchdog_timeout_ms: 60_000,
            default_temp_threshold_c: 28.0,
            remote: RemoteConfig::default(),
            wifi: WifiConfig::default(),
            actuators: ActuatorPins::default(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            auth_token: None,
            // Store sends a keep-alive every 30 s.
            stream_timeout_ms: 45_000,
            write_timeout_ms: 5_000,
        }
    }
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: String::new(),
            password: String::new(),
            connect_timeout_ms: 15_000,
        }
    }
}

impl Default for ActuatorPins {
    fn default() -> Self {
        Self {
            valve_gpio: 26,
            fan_gpio: 27,
            active_low: false,
        }
    }
}

impl SystemConfig {
    /// Parse a JSON document (missing fields take defaults) and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("malformed JSON"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the control loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(Error::Config("tick_interval_ms must be > 0"));
        }
        if !self.default_temp_threshold_c.is_finite() {
            return Err(Error::Config("default_temp_threshold_c must be finite"));
        }
        let url = self.remote.database_url.as_str();
        if url.is_empty() {
            return Err(Error::Config("remote.database_url is empty"));
        }
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(Error::Config("remote.database_url must be http(s)"));
        }
        if self.remote.stream_timeout_ms < 1_000 {
            return Err(Error::Config("remote.stream_timeout_ms must be >= 1000"));
        }
        if self.remote.write_timeout_ms == 0 {
            return Err(Error::Config("remote.write_timeout_ms must be > 0"));
        }
        if self.wifi.connect_timeout_ms == 0 {
            return Err(Error::Config("wifi.connect_timeout_ms must be > 0"));
        }
        if self.loop_budget_ms() >= u64::from(self.watchdog_timeout_ms) {
            return Err(Error::Config(
                "watchdog_timeout_ms must exceed tick + 2 writes + wifi connect",
            ));
        }
        for gpio in [self.actuators.valve_gpio, self.actuators.fan_gpio] {
            if !(0..=MAX_GPIO).contains(&gpio) {
                return Err(Error::Config("actuator GPIO out of range"));
            }
        }
        if self.actuators.valve_gpio == self.actuators.fan_gpio {
            return Err(Error::Config("valve and fan share a GPIO"));
        }
        Ok(())
    }

    /// Worst-case time between two watchdog feeds: one sleep, one WiFi
    /// reconnect attempt and the two record writes of a connected tick.
    pub fn loop_budget_ms(&self) -> u64 {
        u64::from(self.tick_interval_ms)
            + 2 * u64::from(self.remote.write_timeout_ms)
            + u64::from(self.wifi.connect_timeout_ms)
    }
}
