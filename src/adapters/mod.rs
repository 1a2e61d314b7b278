//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements          | Connects to                   |
//! |------------|---------------------|-------------------------------|
//! | `hardware` | SensorPort          | Sensor hub (simulated source) |
//! |            | ActuatorPort        | Valve + fan relays (GPIO)     |
//! | `log_sink` | EventSink           | Serial log output             |
//! | `rtdb`     | RemoteStorePort     | Realtime database over HTTPS  |
//! |            | (stream reader)     | Event-stream subscription     |
//! | `wifi`     | ConnectivityPort    | ESP-IDF WiFi STA              |

pub mod hardware;
pub mod log_sink;
pub mod rtdb;
pub mod wifi;
