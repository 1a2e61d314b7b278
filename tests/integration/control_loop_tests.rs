//! Integration tests for the queue → AppService → actuators → store
//! pipeline, driven tick by tick against mock adapters.

use crate::mock_hw::{ActuatorCall, LogSink, MockHardware, MockStore};

use greenhouse::app::events::AppEvent;
use greenhouse::app::service::{AppService, LinkState};
use greenhouse::config::SystemConfig;
use greenhouse::control::ActuatorState;
use greenhouse::paths;
use greenhouse::stream::{DeclaredType, NotificationQueue, StreamHandler, StreamValue};

fn make_app() -> (AppService, MockHardware, MockStore, LogSink) {
    let mut app = AppService::new(&SystemConfig::default());
    let mut hw = MockHardware::new(25.0);
    let mut sink = LogSink::new();
    app.start(&mut hw, &mut sink);
    (app, hw, MockStore::connected(), sink)
}

fn on(valve_on: bool, fan_on: bool) -> ActuatorState {
    ActuatorState { valve_on, fan_on }
}

// ── Worked scenarios ──────────────────────────────────────────

#[test]
fn defaults_above_threshold_turn_fan_on() {
    let (mut app, mut hw, mut store, mut sink) = make_app();
    let inbox = NotificationQueue::new();
    hw.set_temperature(30.0);

    let report = app.tick(&mut hw, &mut store, &inbox, &mut sink);

    assert_eq!(report.actuators, Some(on(false, true)));
    assert_eq!(hw.outputs(), on(false, true));
}

#[test]
fn manual_mode_ignores_temperature() {
    let (mut app, mut hw, mut store, mut sink) = make_app();
    let inbox = NotificationQueue::new();
    let handler = StreamHandler::new(&inbox);
    hw.set_temperature(15.0);

    handler.on_update(paths::FAN_AUTO_MODE, DeclaredType::Boolean, StreamValue::Boolean(false));
    handler.on_update(paths::FAN_MANUAL_COMMAND, DeclaredType::Boolean, StreamValue::Boolean(true));
    let report = app.tick(&mut hw, &mut store, &inbox, &mut sink);

    assert_eq!(report.actuators, Some(on(false, true)));
}

#[test]
fn raised_threshold_turns_fan_off_next_tick() {
    let (mut app, mut hw, mut store, mut sink) = make_app();
    let inbox = NotificationQueue::new();
    let handler = StreamHandler::new(&inbox);
    hw.set_temperature(30.0);

    let first = app.tick(&mut hw, &mut store, &inbox, &mut sink);
    assert_eq!(first.actuators, Some(on(false, true)));

    handler.on_update(paths::TEMP_THRESHOLD, DeclaredType::Float, StreamValue::Number(32.0));
    let second = app.tick(&mut hw, &mut store, &inbox, &mut sink);
    assert_eq!(second.actuators, Some(on(false, false)));
    assert!((app.commands().temp_threshold - 32.0).abs() < f32::EPSILON);
}

#[test]
fn mistyped_auto_mode_is_ignored() {
    let (mut app, mut hw, mut store, mut sink) = make_app();
    let inbox = NotificationQueue::new();
    let handler = StreamHandler::new(&inbox);

    handler.on_update(paths::FAN_AUTO_MODE, DeclaredType::Int, StreamValue::Number(0.0));
    app.tick(&mut hw, &mut store, &inbox, &mut sink);

    assert!(app.commands().fan_auto_mode);
    assert_eq!(app.metrics().commands_rejected, 1);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::CommandRejected { .. })),
        1
    );
}

// ── Link handling ─────────────────────────────────────────────

#[test]
fn disconnected_ticks_read_but_never_write() {
    let (mut app, mut hw, _, mut sink) = make_app();
    let mut store = MockStore::default();
    let inbox = NotificationQueue::new();
    let calls_after_start = hw.calls.len();

    for _ in 0..3 {
        let report = app.tick(&mut hw, &mut store, &inbox, &mut sink);
        assert_eq!(report.link, LinkState::Disconnected);
        assert_eq!(report.actuators, None);
        assert_eq!(report.publish, None);
    }

    assert_eq!(hw.reads, 3);
    assert_eq!(hw.calls.len(), calls_after_start);
    assert!(store.writes.is_empty());
    // Starting state already matches; no edge, no event.
    assert_eq!(sink.count(|e| matches!(e, AppEvent::LinkChanged { .. })), 0);
}

#[test]
fn actuators_hold_while_link_is_down() {
    let (mut app, mut hw, mut store, mut sink) = make_app();
    let inbox = NotificationQueue::new();
    hw.set_temperature(31.0);
    app.tick(&mut hw, &mut store, &inbox, &mut sink);
    assert_eq!(hw.outputs(), on(false, true));

    store.ready = false;
    hw.set_temperature(10.0);
    app.tick(&mut hw, &mut store, &inbox, &mut sink);

    assert_eq!(hw.outputs(), on(false, true));
    assert_eq!(app.actuators(), on(false, true));
    assert_eq!(app.link(), LinkState::Disconnected);
}

#[test]
fn commands_queued_while_offline_apply_on_reconnect() {
    let (mut app, mut hw, _, mut sink) = make_app();
    let mut store = MockStore::default();
    let inbox = NotificationQueue::new();
    let handler = StreamHandler::new(&inbox);

    app.tick(&mut hw, &mut store, &inbox, &mut sink);
    handler.on_update(paths::VALVE_COMMAND, DeclaredType::Boolean, StreamValue::Boolean(true));
    app.tick(&mut hw, &mut store, &inbox, &mut sink);
    assert!(app.commands().valve_command);
    assert!(store.writes.is_empty());

    store.ready = true;
    let report = app.tick(&mut hw, &mut store, &inbox, &mut sink);
    assert_eq!(report.actuators, Some(on(true, false)));
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::LinkChanged { to: LinkState::Connected, .. })),
        1
    );
}

// ── Publishing ────────────────────────────────────────────────

#[test]
fn publishes_readings_and_state_every_connected_tick() {
    let (mut app, mut hw, mut store, mut sink) = make_app();
    let inbox = NotificationQueue::new();

    app.tick(&mut hw, &mut store, &inbox, &mut sink);
    app.tick(&mut hw, &mut store, &inbox, &mut sink);

    assert_eq!(store.writes.len(), 4);
    let readings = store.last_write(paths::READINGS).unwrap();
    assert_eq!(readings["temperature"], 25.0);
    assert_eq!(readings["humidity"], 55.0);
    assert_eq!(readings["soilMoisture1"], 42.0);
    let state = store.last_write(paths::STATE).unwrap();
    assert_eq!(state["valveState"], false);
    assert_eq!(state["fanState"], false);
    assert_eq!(app.metrics().publish_ok, 4);
}

#[test]
fn failed_write_is_reported_and_not_retried() {
    let (mut app, mut hw, mut store, mut sink) = make_app();
    let inbox = NotificationQueue::new();
    store.failing.push(paths::STATE);

    let report = app.tick(&mut hw, &mut store, &inbox, &mut sink);

    let publish = report.publish.unwrap();
    assert!(publish.readings.is_ok());
    assert!(publish.state.is_err());
    assert_eq!(store.writes.len(), 2);
    assert_eq!(app.metrics().publish_failed, 1);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::PublishFailed { .. })), 1);
    // Telemetry still emitted after a failed write.
    assert!(matches!(sink.events.last(), Some(AppEvent::Telemetry(_))));
}

#[test]
fn start_drives_outputs_off() {
    let (app, hw, _, sink) = make_app();
    assert_eq!(hw.calls, vec![ActuatorCall::AllOff]);
    assert!(matches!(sink.events[0], AppEvent::Started { .. }));
    assert_eq!(app.tick_count(), 0);
}
