//! Application service: the control loop.
//!
//! [`AppService`] owns the command state, the link state, and the runtime
//! counters.  It exposes a hardware-agnostic API; all I/O flows through
//! port traits injected at call sites, making the whole loop testable
//! with mock adapters.
//!
//! ```text
//!  NotificationQueue ──▶ ┌─────────────────────────┐ ──▶ EventSink
//!  SensorPort ─────────▶ │        AppService        │
//!  ActuatorPort ◀─────── │ CommandState · policy    │
//!  RemoteStorePort ◀──── │ LinkState · telemetry    │
//!                        └─────────────────────────┘
//! ```
//!
//! ## Link states
//!
//! - **Disconnected**: sensors are still read, but the policy is not
//!   evaluated and nothing is written.  Actuators hold their last state.
//! - **Connected**: full cycle: read, evaluate, apply, publish.
//!
//! The link is re-checked at the start of every tick.

use log::{info, warn};

use crate::config::SystemConfig;
use crate::control::{evaluate, ActuatorState, CommandState, Mode, UpdateOutcome};
use crate::diagnostics::RuntimeMetrics;
use crate::error::{truncated, StreamError};
use crate::sensors::SensorReading;
use crate::stream::{NotificationQueue, StreamMessage};

use super::events::{AppEvent, TelemetryData};
use super::ports::{ActuatorPort, EventSink, RemoteStorePort, SensorPort};
use super::telemetry::{self, PublishReport};

// ───────────────────────────────────────────────────────────────
// Link state
// ───────────────────────────────────────────────────────────────

/// Whether the remote store is reachable this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connected,
}

/// What one [`AppService::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub link: LinkState,
    pub reading: SensorReading,
    /// `None` while disconnected (policy not evaluated).
    pub actuators: Option<ActuatorState>,
    /// `None` while disconnected (nothing written).
    pub publish: Option<PublishReport>,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service sequences every control tick.
pub struct AppService {
    commands: CommandState,
    link: LinkState,
    /// Last applied outputs (reported while disconnected).
    actuators: ActuatorState,
    reading: SensorReading,
    metrics: RuntimeMetrics,
}

impl AppService {
    /// Construct the service with safe command defaults.
    ///
    /// Starts Disconnected; the first tick checks readiness.
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            commands: CommandState::with_threshold(config.default_temp_threshold_c),
            link: LinkState::Disconnected,
            actuators: ActuatorState::all_off(),
            reading: SensorReading::default(),
            metrics: RuntimeMetrics::new(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive outputs to the safe state and announce the start.
    pub fn start(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        hw.all_off();
        self.actuators = ActuatorState::all_off();
        sink.emit(&AppEvent::Started {
            temp_threshold: self.commands.temp_threshold,
        });
        info!(
            "AppService started (fan Auto, threshold {:.1}\u{00b0}C)",
            self.commands.temp_threshold
        );
    }

    // ── Command intake ────────────────────────────────────────

    /// Apply every queued notification in arrival order.
    ///
    /// Returns how many messages were consumed.
    pub fn drain_notifications(
        &mut self,
        inbox: &NotificationQueue,
        sink: &mut impl EventSink,
    ) -> usize {
        let mut n = 0;
        while let Ok(msg) = inbox.try_receive() {
            self.handle_message(msg, sink);
            n += 1;
        }
        n
    }

    /// Apply a single stream message.
    pub fn handle_message(&mut self, msg: StreamMessage, sink: &mut impl EventSink) {
        match msg {
            StreamMessage::Update(update) => {
                let outcome =
                    self.commands
                        .apply_field_update(&update.path, update.declared, &update.value);
                match outcome {
                    UpdateOutcome::Applied(field) => {
                        self.metrics.commands_applied += 1;
                        sink.emit(&AppEvent::CommandApplied(field));
                    }
                    UpdateOutcome::TypeMismatch { field, declared } => {
                        self.metrics.commands_rejected += 1;
                        warn!(
                            "Command {} dropped: declared type '{}' does not match",
                            field.path(),
                            declared
                        );
                        sink.emit(&AppEvent::CommandRejected { field, declared });
                    }
                    UpdateOutcome::UnknownPath => {
                        self.metrics.commands_unknown += 1;
                        sink.emit(&AppEvent::UnknownCommandPath(truncated(&update.path)));
                    }
                }
            }
            StreamMessage::Fault(fault) => {
                if fault == StreamError::Timeout {
                    self.metrics.stream_timeouts += 1;
                } else {
                    self.metrics.stream_errors += 1;
                }
                // Commands stay at their last known values.
                sink.emit(&AppEvent::StreamFault(fault));
            }
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle: drain → read → link check → evaluate →
    /// apply → publish.
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`ActuatorPort`]: this avoids a double mutable borrow while
    /// keeping the port boundary explicit.
    pub fn tick(
        &mut self,
        hw: &mut (impl SensorPort + ActuatorPort),
        remote: &mut impl RemoteStorePort,
        inbox: &NotificationQueue,
        sink: &mut impl EventSink,
    ) -> TickReport {
        self.metrics.ticks += 1;

        // 1. Latest commands
        self.drain_notifications(inbox, sink);

        // 2. Sensors are read in both link states
        let reading = hw.read();
        self.reading = reading;

        // 3. Link check
        let next = if remote.is_ready() {
            LinkState::Connected
        } else {
            LinkState::Disconnected
        };
        self.set_link(next, sink);

        if self.link == LinkState::Disconnected {
            return TickReport {
                link: self.link,
                reading,
                actuators: None,
                publish: None,
            };
        }
        self.metrics.connected_ticks += 1;

        // 4. Policy
        let state = evaluate(&self.commands, &reading);
        let mode = Mode::from_auto_flag(self.commands.fan_auto_mode);

        // 5. Actuators
        hw.apply(state);
        self.actuators = state;
        sink.emit(&AppEvent::ActuatorsApplied { state, mode });

        // 6. Publish (best effort)
        let report = telemetry::publish(remote, &reading, &state);
        for (record, error) in report.failures() {
            self.metrics.publish_failed += 1;
            warn!("Publish to {} failed: {}", record, error);
            sink.emit(&AppEvent::PublishFailed { record, error });
        }
        self.metrics.publish_ok += u32::from(report.readings.is_ok()) + u32::from(report.state.is_ok());

        sink.emit(&AppEvent::Telemetry(self.build_telemetry()));

        TickReport {
            link: self.link,
            reading,
            actuators: Some(state),
            publish: Some(report),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a telemetry snapshot from the current state.
    pub fn build_telemetry(&self) -> TelemetryData {
        TelemetryData {
            tick: self.metrics.ticks,
            link: self.link,
            reading: self.reading,
            actuators: self.actuators,
            mode: Mode::from_auto_flag(self.commands.fan_auto_mode),
            temp_threshold: self.commands.temp_threshold,
        }
    }

    /// Current command values.
    pub fn commands(&self) -> &CommandState {
        &self.commands
    }

    pub fn link(&self) -> LinkState {
        self.link
    }

    /// Last applied actuator outputs.
    pub fn actuators(&self) -> ActuatorState {
        self.actuators
    }

    pub fn metrics(&self) -> &RuntimeMetrics {
        &self.metrics
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.metrics.ticks
    }

    // ── Internal ──────────────────────────────────────────────

    fn set_link(&mut self, next: LinkState, sink: &mut impl EventSink) {
        if next == self.link {
            return;
        }
        match next {
            LinkState::Connected => info!("Remote store ready, resuming full cycle"),
            LinkState::Disconnected => warn!("Remote store unavailable, sensor-only mode"),
        }
        sink.emit(&AppEvent::LinkChanged {
            from: self.link,
            to: next,
        });
        self.link = next;
        self.metrics.link_transitions += 1;
    }
}
