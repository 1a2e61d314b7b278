//! Integration tests for the subscription path: raw event-stream bytes →
//! decoder → notification queue → command state.

use crate::mock_hw::{LogSink, MockHardware, MockStore};

use greenhouse::app::events::AppEvent;
use greenhouse::app::service::AppService;
use greenhouse::config::SystemConfig;
use greenhouse::control::ActuatorState;
use greenhouse::error::StreamError;
use greenhouse::paths;
use greenhouse::stream::sse::SseDecoder;
use greenhouse::stream::{
    DeclaredType, NotificationQueue, StreamHandler, StreamValue, QUEUE_DEPTH,
};

fn feed(handler: &StreamHandler<'_>, bytes: &str) {
    let mut decoder = SseDecoder::new(paths::CONTROLS);
    decoder.feed(bytes.as_bytes(), |event| event.dispatch(handler));
}

#[test]
fn initial_snapshot_seeds_every_command() {
    let inbox = NotificationQueue::new();
    let handler = StreamHandler::new(&inbox);
    let mut app = AppService::new(&SystemConfig::default());
    let mut sink = LogSink::new();

    feed(
        &handler,
        "event: put\n\
         data: {\"path\":\"/\",\"data\":{\"valveCommand\":true,\"fanManualCommand\":true,\
         \"fanAutoMode\":false,\"tempThreshold\":26}}\n\n",
    );
    assert_eq!(app.drain_notifications(&inbox, &mut sink), 4);

    let cmd = app.commands();
    assert!(cmd.valve_command);
    assert!(cmd.fan_manual_command);
    assert!(!cmd.fan_auto_mode);
    assert!((cmd.temp_threshold - 26.0).abs() < f32::EPSILON);
}

#[test]
fn later_write_to_same_field_wins() {
    let inbox = NotificationQueue::new();
    let handler = StreamHandler::new(&inbox);
    let mut app = AppService::new(&SystemConfig::default());
    let mut sink = LogSink::new();

    feed(
        &handler,
        "event: put\ndata: {\"path\":\"/valveCommand\",\"data\":true}\n\n\
         event: patch\ndata: {\"path\":\"/\",\"data\":{\"valveCommand\":false}}\n\n",
    );
    app.drain_notifications(&inbox, &mut sink);
    assert!(!app.commands().valve_command);
}

#[test]
fn unrelated_paths_are_ignored() {
    let inbox = NotificationQueue::new();
    let handler = StreamHandler::new(&inbox);
    let mut app = AppService::new(&SystemConfig::default());
    let mut sink = LogSink::new();
    let before = *app.commands();

    feed(&handler, "event: put\ndata: {\"path\":\"/lightCommand\",\"data\":true}\n\n");
    app.drain_notifications(&inbox, &mut sink);

    assert_eq!(*app.commands(), before);
    assert_eq!(app.metrics().commands_unknown, 1);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::UnknownCommandPath(_))), 1);
}

#[test]
fn timeout_and_cancel_leave_commands_alone() {
    let inbox = NotificationQueue::new();
    let handler = StreamHandler::new(&inbox);
    let mut app = AppService::new(&SystemConfig::default());
    let mut sink = LogSink::new();

    handler.on_update(paths::FAN_AUTO_MODE, DeclaredType::Boolean, StreamValue::Boolean(false));
    handler.on_timeout();
    feed(&handler, "event: cancel\ndata: null\n\n");
    app.drain_notifications(&inbox, &mut sink);

    assert!(!app.commands().fan_auto_mode);
    assert_eq!(app.metrics().stream_timeouts, 1);
    assert_eq!(app.metrics().stream_errors, 1);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::StreamFault(StreamError::Cancelled))),
        1
    );
}

#[test]
fn overflow_keeps_the_newest_notifications() {
    let inbox = NotificationQueue::new();
    let handler = StreamHandler::new(&inbox);
    let mut app = AppService::new(&SystemConfig::default());
    let mut sink = LogSink::new();

    // QUEUE_DEPTH + 4 threshold writes; the last one must survive.
    for i in 0..(QUEUE_DEPTH + 4) {
        handler.on_update(
            paths::TEMP_THRESHOLD,
            DeclaredType::Int,
            StreamValue::Number(i as f64),
        );
    }
    assert_eq!(handler.dropped(), 4);
    assert_eq!(app.drain_notifications(&inbox, &mut sink), QUEUE_DEPTH);
    assert!((app.commands().temp_threshold - (QUEUE_DEPTH + 3) as f32).abs() < f32::EPSILON);
}

#[test]
fn slider_burst_keeps_an_earlier_valve_toggle() {
    let inbox = NotificationQueue::new();
    let handler = StreamHandler::new(&inbox);
    let mut app = AppService::new(&SystemConfig::default());
    let mut sink = LogSink::new();

    handler.on_update(paths::VALVE_COMMAND, DeclaredType::Boolean, StreamValue::Boolean(true));
    for i in 0..QUEUE_DEPTH {
        handler.on_update(
            paths::TEMP_THRESHOLD,
            DeclaredType::Int,
            StreamValue::Number(25.0 + i as f64),
        );
    }
    app.drain_notifications(&inbox, &mut sink);

    assert!(app.commands().valve_command);
    assert!((app.commands().temp_threshold - (25 + QUEUE_DEPTH - 1) as f32).abs() < f32::EPSILON);
    assert_eq!(handler.lost(), 0);
}

#[test]
fn streamed_command_reaches_the_relays() {
    let inbox = NotificationQueue::new();
    let handler = StreamHandler::new(&inbox);
    let mut app = AppService::new(&SystemConfig::default());
    let mut hw = MockHardware::new(20.0);
    let mut store = MockStore::connected();
    let mut sink = LogSink::new();
    app.start(&mut hw, &mut sink);

    feed(
        &handler,
        ": comment\r\nevent: put\r\ndata: {\"path\":\"/valveCommand\",\"data\":true}\r\n\r\n\
         event: keep-alive\r\ndata: null\r\n\r\n",
    );
    app.tick(&mut hw, &mut store, &inbox, &mut sink);

    assert_eq!(hw.outputs(), ActuatorState { valve_on: true, fan_on: false });
    let state = store.last_write(paths::STATE).unwrap();
    assert_eq!(state["valveState"], true);
}
