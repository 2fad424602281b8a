//! End-to-end tests of the feedback engine: matcher → queue → gate → device,
//! driven without a PTY through the matcher's session hooks.

use chirp::app::Chirp;
use chirp::audio::SimulatedDevice;
use chirp::config::{Config, SampleConfig, TriggerConfig};
use chirp::terminal::SessionObserver;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// One trigger, `enter`, matching "\n" and playing a 440 Hz, 100 ms tone.
fn enter_config() -> Config {
    let mut config = Config::default();
    config.samples = BTreeMap::from([(
        "beep".to_string(),
        SampleConfig::new("beep", 440.0, 100, 0.8),
    )]);
    config.triggers = BTreeMap::from([(
        "enter".to_string(),
        TriggerConfig::new("enter", &["\n"], "beep", 1),
    )]);
    config.validate().unwrap();
    config
}

fn engine() -> (Chirp, Arc<SimulatedDevice>) {
    let device = Arc::new(SimulatedDevice::with_playback_time());
    let app = Chirp::new(&enter_config(), device.clone(), "/bin/sh".to_string()).unwrap();
    (app, device)
}

fn wait_for_plays(device: &SimulatedDevice, count: u64) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while device.play_count() < count && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_two_newlines_within_5ms_play_once() {
    let (app, device) = engine();
    let matcher = app.matcher();

    let t0 = Instant::now();
    matcher.on_input_at(b"\n", t0);
    matcher.on_input_at(b"\n", t0 + Duration::from_millis(3));

    // Long enough for a second playback to have happened if it were queued.
    thread::sleep(Duration::from_millis(300));
    app.shutdown();

    assert_eq!(device.play_count(), 1);
    assert_eq!(app.queues()[0].stats().dropped, 1);
}

#[test]
fn test_two_newlines_200ms_apart_play_twice() {
    let (app, device) = engine();
    let matcher = app.matcher();

    matcher.on_input(b"\n");
    thread::sleep(Duration::from_millis(200));
    matcher.on_input(b"\n");

    wait_for_plays(&device, 2);
    app.shutdown();

    assert_eq!(device.play_count(), 2);
    assert_eq!(app.queues()[0].stats().dropped, 0);
}

#[test]
fn test_echoed_newline_does_not_play_again() {
    let (app, device) = engine();
    let matcher = app.matcher();

    let t0 = Instant::now();
    matcher.on_input_at(b"\n", t0);
    wait_for_plays(&device, 1);
    // The shell echoes the newline back a few ms later.
    matcher.on_output_at(b"\n", t0 + Duration::from_millis(5));

    thread::sleep(Duration::from_millis(250));
    app.shutdown();

    assert_eq!(device.play_count(), 1);
    assert_eq!(matcher.stats().echo_suppressed, 1);
}

#[test]
fn test_output_newline_after_echo_timeout_plays() {
    let (app, device) = engine();
    let matcher = app.matcher();

    let t0 = Instant::now();
    matcher.on_input_at(b"x", t0);
    matcher.on_output_at(b"\n", t0 + Duration::from_millis(50));

    wait_for_plays(&device, 1);
    app.shutdown();

    assert_eq!(device.play_count(), 1);
    assert_eq!(matcher.stats().echo_suppressed, 0);
}

#[test]
fn test_gap_spans_triggers() {
    let mut config = enter_config();
    config.samples.insert(
        "tick".to_string(),
        SampleConfig::new("tick", 880.0, 10, 0.5),
    );
    config.triggers.insert(
        "prompt".to_string(),
        TriggerConfig::new("prompt", &["$"], "tick", 1),
    );
    config.settings.min_gap_ms = 1_000;
    config.validate().unwrap();

    let device = Arc::new(SimulatedDevice::new());
    let app = Chirp::new(&config, device.clone(), "/bin/sh".to_string()).unwrap();

    // Both triggers match in one read; only the first to reach the gate plays.
    app.matcher().on_output(b"\n$");
    thread::sleep(Duration::from_millis(200));
    app.shutdown();

    assert_eq!(device.play_count(), 1);
    assert_eq!(app.gate().stats().suppressed, 1);
}
