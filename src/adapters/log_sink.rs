//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! Every line starts with a fixed prefix so serial captures can be grepped.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | tick={} link={:?} | T={:.1}\u{00b0}C H={:.1}% soil={:.1}% | \
                     valve={} fan={} mode={} threshold={:.1}\u{00b0}C",
                    t.tick,
                    t.link,
                    t.reading.temperature_c,
                    t.reading.humidity_pct,
                    t.reading.soil_moisture_pct,
                    t.actuators.valve_on,
                    t.actuators.fan_on,
                    t.mode,
                    t.temp_threshold,
                );
            }
            AppEvent::Started { temp_threshold } => {
                info!("START | threshold={:.1}\u{00b0}C", temp_threshold);
            }
            AppEvent::LinkChanged { from, to } => {
                info!("LINK | {:?} -> {:?}", from, to);
            }
            AppEvent::CommandApplied(field) => {
                info!("CMD | applied {}", field.path());
            }
            AppEvent::CommandRejected { field, declared } => {
                warn!("CMD | rejected {} (declared {})", field.path(), declared);
            }
            AppEvent::UnknownCommandPath(path) => {
                info!("CMD | ignored unknown path {}", path);
            }
            AppEvent::StreamFault(fault) => {
                warn!("STREAM | {}", fault);
            }
            AppEvent::ActuatorsApplied { state, mode } => {
                info!(
                    "ACT | valve={} fan={} mode={}",
                    on_off(state.valve_on),
                    on_off(state.fan_on),
                    mode
                );
            }
            AppEvent::PublishFailed { record, error } => {
                warn!("PUBLISH | {} failed: {}", record, error);
            }
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "ON" } else { "OFF" }
}
