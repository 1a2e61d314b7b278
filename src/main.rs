//! Greenhouse Controller Firmware: Main Entry Point
//!
//! Hexagonal architecture with a fixed-period control loop and a
//! background event-stream reader.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   RtdbClient     WifiAdapter   │
//! │  (Sensor+Actuator) (EventSink)    (RemoteStore)  (Connectivity)│
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  CommandState · policy · telemetry                     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                           ▲                                    │
//! │            NotificationQueue (bounded, coalescing)             │
//! │                           │                                    │
//! │        rtdb-stream thread (PRO core): SSE → StreamHandler      │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::{Duration, Instant};

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

use greenhouse::adapters::hardware::HardwareAdapter;
use greenhouse::adapters::log_sink::LogEventSink;
use greenhouse::adapters::rtdb::{run_stream_reader, EspHttpTransport, EspStreamSource, RtdbClient};
use greenhouse::adapters::wifi::{ConnectivityPort, WifiAdapter};
use greenhouse::app::service::AppService;
use greenhouse::config::SystemConfig;
use greenhouse::drivers::hw_init::GpioOutput;
use greenhouse::drivers::relay::RelayDriver;
use greenhouse::drivers::task_pin::{spawn_on_core, Core};
use greenhouse::drivers::watchdog::Watchdog;
use greenhouse::sensors::simulated::SimulatedSensors;
use greenhouse::sensors::SensorHub;
use greenhouse::stream::{StreamHandler, NOTIFICATIONS};

/// Transport side of the notification queue, shared with the reader thread.
static STREAM: StreamHandler<'static> = StreamHandler::new(&NOTIFICATIONS);

/// Log runtime counters every this many ticks.
const METRICS_EVERY_TICKS: u64 = 30;

fn load_config() -> SystemConfig {
    let Some(json) = option_env!("GREENHOUSE_CONFIG_JSON") else {
        warn!("No GREENHOUSE_CONFIG_JSON baked in, running sensor-only with defaults");
        return SystemConfig::default();
    };
    match SystemConfig::from_json(json) {
        Ok(cfg) => {
            info!("Config loaded ({} ms tick)", cfg.tick_interval_ms);
            cfg
        }
        Err(e) => {
            error!("Config rejected ({}), running sensor-only with defaults", e);
            SystemConfig::default()
        }
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Greenhouse v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = load_config();
    let watchdog = Watchdog::new(config.watchdog_timeout_ms);
    info!(
        "Watchdog {} ms, worst-case loop {} ms",
        watchdog.timeout_ms(),
        config.loop_budget_ms()
    );

    // ── 2. Outputs de-energised before anything else ──────────
    let pins = config.actuators;
    let idle_high = pins.active_low;
    let valve = RelayDriver::new(
        GpioOutput::configure(pins.valve_gpio, idle_high)?,
        pins.active_low,
        "valve",
    );
    let fan = RelayDriver::new(
        GpioOutput::configure(pins.fan_gpio, idle_high)?,
        pins.active_low,
        "fan",
    );
    let mut hw = HardwareAdapter::new(SensorHub::new(SimulatedSensors::new()), valve, fan);
    let mut log_sink = LogEventSink::new();

    // ── 3. WiFi station ───────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let esp_wifi = EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?;
    let mut wifi = WifiAdapter::new(
        BlockingWifi::wrap(esp_wifi, sysloop)?,
        config.wifi.connect_timeout_ms,
    );

    match wifi.set_credentials(&config.wifi.ssid, &config.wifi.password) {
        Ok(()) => {
            if let Err(e) = wifi.connect() {
                warn!("WiFi: initial connect failed ({}), will retry", e);
            }
        }
        Err(e) => warn!("WiFi: {}", e),
    }

    // ── 4. Remote store + subscription ────────────────────────
    let timeout_ms = config.remote.stream_timeout_ms;
    let mut remote = RtdbClient::new(
        &config.remote,
        EspHttpTransport::new(config.remote.write_timeout_ms),
    );
    if config.remote.database_url.is_empty() {
        warn!("No database URL: subscription not started");
    } else {
        let url = remote.stream_url();
        let _reader = spawn_on_core(Core::Pro, 5, 12, "rtdb-stream\0", move || {
            run_stream_reader(EspStreamSource::new(timeout_ms), &url, &STREAM, |ms| {
                std::thread::sleep(Duration::from_millis(u64::from(ms)));
            })
        })?;
    }

    // ── 5. Control loop ───────────────────────────────────────
    let mut app = AppService::new(&config);
    app.start(&mut hw, &mut log_sink);

    let boot = Instant::now();
    let tick = Duration::from_millis(u64::from(config.tick_interval_ms));
    info!("System ready. Entering control loop.");

    loop {
        let now_ms = boot.elapsed().as_millis() as u64;
        wifi.poll(now_ms);
        remote.set_network_up(wifi.is_connected());

        app.tick(&mut hw, &mut remote, &NOTIFICATIONS, &mut log_sink);

        if app.tick_count() % METRICS_EVERY_TICKS == 0 {
            info!(
                "METRICS | {} | stream_dropped={} stream_lost={}",
                app.metrics().to_json(),
                STREAM.dropped(),
                STREAM.lost()
            );
        }

        watchdog.feed();
        std::thread::sleep(tick);
    }
}
