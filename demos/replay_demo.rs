//! Demonstration of the moving average sensor.
//!
//! This example shows how to:
//! 1. Configure a sensor following one source entity
//! 2. Feed it irregular readings, including an outage
//! 3. Let poll ticks re-evaluate the average between readings
//! 4. Inspect the published states
//!
//! Run with: cargo run --example replay_demo

use chrono::{Duration, TimeZone, Utc};
use moving_average_sensor::{
    create_shared_stats, Config, MemoryPublisher, Runtime, SensorConfig, SourceState,
};

fn main() {
    println!("Moving Average Sensor - Replay Demo");
    println!("===================================");
    println!();

    let mut sensor = SensorConfig::new(
        "Power 5min avg",
        "sensor.power",
        std::time::Duration::from_secs(300),
    );
    sensor.timeout = std::time::Duration::from_secs(120);

    let config = Config {
        poll_interval: std::time::Duration::from_secs(30),
        sensors: vec![sensor],
    };

    let stats = create_shared_stats();
    let mut runtime = match Runtime::new(&config, MemoryPublisher::new(), stats.clone()) {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return;
        }
    };

    let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let readings = [
        (0, "120"),
        (45, "480"),
        (200, "90"),
        (260, "unavailable"),
        (500, "150"),
    ];
    let states: Vec<SourceState> = readings
        .iter()
        .map(|&(secs, state)| SourceState::new("sensor.power", state, t0 + Duration::seconds(secs)))
        .collect();

    runtime.replay(states, Some(t0 + Duration::seconds(600)));

    for state in runtime.publisher().states() {
        let value = match state.state.as_f64() {
            Some(v) => format!("{v:.2}"),
            None => "unavailable".to_string(),
        };
        println!(
            "[+{:>3}s] {:>12}  ({} data points)",
            (state.computed_at - t0).num_seconds(),
            value,
            state.attributes.data_points
        );
    }

    println!();
    println!("{}", stats.summary());
}
