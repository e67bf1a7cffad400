//! Integration tests for the moving average filter and runtime

use chrono::{DateTime, Duration, TimeZone, Utc};
use moving_average_sensor::{
    create_shared_stats, Config, FilterConfig, LivenessState, MemoryPublisher,
    MovingAverageFilter, Output, Reading, Runtime, SensorConfig, SourceState, StateValue,
};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs)
}

fn filter(window_secs: u64, timeout_secs: u64, precision: u32) -> MovingAverageFilter {
    MovingAverageFilter::new(FilterConfig {
        window_size: std::time::Duration::from_secs(window_secs),
        timeout: std::time::Duration::from_secs(timeout_secs),
        precision,
    })
    .expect("valid filter configuration")
}

#[test]
fn test_five_minute_window_scenario() {
    let mut f = filter(300, 60, 2);

    assert_eq!(
        f.handle_input_event(Reading::Value(10.0), at(0)).unwrap(),
        Output::Value(10.0)
    );
    assert_eq!(f.handle_poll_tick(at(300)).unwrap(), Output::Value(10.0));
    assert_eq!(f.handle_poll_tick(at(301)).unwrap(), Output::Value(10.0));

    f.handle_input_event(Reading::Value(0.0), at(300)).unwrap();
    assert_eq!(f.handle_poll_tick(at(600)).unwrap(), Output::Value(0.0));
}

#[test]
fn test_never_fed_is_unavailable() {
    let mut f = filter(300, 60, 2);
    for secs in [0, 1, 59, 3600] {
        assert_eq!(f.handle_poll_tick(at(secs)).unwrap(), Output::Unavailable);
    }
}

#[test]
fn test_timeout_scenario() {
    let mut f = filter(600, 120, 2);
    f.handle_input_event(Reading::Value(2.0), at(-60)).unwrap();
    f.handle_input_event(Reading::Value(6.0), at(-30)).unwrap();
    let last_good = f.handle_input_event(Reading::Invalid, at(0)).unwrap();
    assert_eq!(last_good, Output::Value(4.0));

    // The held value keeps weighting in while the timeout runs: (2 * 30 + 6 * 149) / 179
    assert_eq!(f.handle_poll_tick(at(119)).unwrap(), Output::Value(5.33));
    assert_eq!(f.handle_poll_tick(at(120)).unwrap(), Output::Unavailable);
    assert_eq!(f.data_points(), 0);

    assert_eq!(
        f.handle_input_event(Reading::Value(9.0), at(125)).unwrap(),
        Output::Value(9.0)
    );
    assert_eq!(f.liveness(), LivenessState::Valid);
}

#[test]
fn test_repeated_invalid_does_not_extend_timeout() {
    let mut f = filter(600, 120, 2);
    f.handle_input_event(Reading::Value(1.0), at(-10)).unwrap();
    f.handle_input_event(Reading::Invalid, at(0)).unwrap();
    f.handle_input_event(Reading::Invalid, at(100)).unwrap();

    assert_eq!(
        f.handle_input_event(Reading::Invalid, at(120)).unwrap(),
        Output::Unavailable
    );
}

#[test]
fn test_exact_integral_of_step_function() {
    // 0..20: 1, 20..50: 4, 50..60: -2
    let mut f = filter(60, 60, 6);
    f.handle_input_event(Reading::Value(1.0), at(0)).unwrap();
    f.handle_input_event(Reading::Value(4.0), at(20)).unwrap();
    f.handle_input_event(Reading::Value(-2.0), at(50)).unwrap();

    let expected = (1.0 * 20.0 + 4.0 * 30.0 - 2.0 * 10.0) / 60.0;
    let mean = f.mean(at(60)).unwrap();
    assert!((mean - expected).abs() < 1e-9);
}

#[test]
fn test_window_slides_over_partial_interval() {
    // At t=80 the window is [20, 80]: 1 from the carry-in for 0s, 4 for 30s, -2 for 30s
    let mut f = filter(60, 60, 3);
    f.handle_input_event(Reading::Value(1.0), at(0)).unwrap();
    f.handle_input_event(Reading::Value(4.0), at(20)).unwrap();
    f.handle_input_event(Reading::Value(-2.0), at(50)).unwrap();

    assert_eq!(f.handle_poll_tick(at(80)).unwrap(), Output::Value(1.0));
    // [30, 90]: 4 for 20s, -2 for 40s
    assert_eq!(f.handle_poll_tick(at(90)).unwrap(), Output::Value(0.0));
}

#[test]
fn test_precision_only_changes_rounding() {
    let mut coarse = filter(60, 60, 0);
    let mut fine = filter(60, 60, 4);
    for f in [&mut coarse, &mut fine] {
        f.handle_input_event(Reading::Value(1.0), at(0)).unwrap();
        f.handle_input_event(Reading::Value(2.0), at(10)).unwrap();
    }

    assert_eq!(coarse.mean(at(30)), fine.mean(at(30)));
    assert_eq!(coarse.handle_poll_tick(at(30)).unwrap(), Output::Value(2.0));
    assert_eq!(fine.handle_poll_tick(at(30)).unwrap(), Output::Value(1.6667));
}

#[test]
fn test_long_run_memory_stays_bounded() {
    let mut f = filter(60, 60, 2);
    for i in 0..5_000 {
        f.handle_input_event(Reading::Value((i % 7) as f64), at(i * 5))
            .unwrap();
    }
    // 13 samples within 60s at 5s spacing plus the carry-in
    assert!(f.data_points() <= 14);
}

#[test]
fn test_runtime_replay_publishes_states() {
    let config = Config {
        poll_interval: std::time::Duration::from_secs(60),
        sensors: vec![SensorConfig::new(
            "Power avg",
            "sensor.power",
            std::time::Duration::from_secs(300),
        )],
    };
    let stats = create_shared_stats();
    let mut runtime = Runtime::new(&config, MemoryPublisher::new(), stats.clone()).unwrap();

    let states = vec![
        SourceState::new("sensor.power", "100", at(0)),
        SourceState::new("sensor.power", "200", at(150)),
        SourceState::new("sensor.power", "unavailable", at(200)),
    ];
    runtime.replay(states, Some(at(300)));

    // input 0, tick 60, tick 120, input 150, tick 180, input 200, tick 240, tick 300
    let published = runtime.publisher().states_for("Power avg");
    assert_eq!(published.len(), 8);

    // Still inside the timeout: (100 * 150s + 200 * 90s) / 240s
    assert_eq!(published[6].computed_at, at(240));
    assert_eq!(published[6].state, StateValue::Float(137.5));

    let last = published[7];
    assert_eq!(last.computed_at, at(300));
    assert!(!last.available);
    assert_eq!(last.attributes.data_points, 0);

    let snapshot = stats.stats();
    assert_eq!(snapshot.states_received, 3);
    assert_eq!(snapshot.invalid_readings, 1);
    assert_eq!(snapshot.samples_recorded, 2);
    assert_eq!(snapshot.poll_ticks, 5);
    assert_eq!(snapshot.timeouts, 1);
}

#[test]
fn test_runtime_rejects_invalid_config() {
    let config = Config {
        poll_interval: std::time::Duration::from_secs(30),
        sensors: vec![SensorConfig::new(
            "Broken",
            "sensor.power",
            std::time::Duration::ZERO,
        )],
    };
    assert!(Runtime::new(&config, MemoryPublisher::new(), create_shared_stats()).is_err());
}
