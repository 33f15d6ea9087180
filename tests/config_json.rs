//! Tests loading a simulation configuration from JSON.
#![cfg(feature = "serde")]

use highway_sim::{Param, Simulation, SimulationConfig};

const CONFIG: &str = r#"{
    "time_step": 0.05,
    "road": {
        "length": 400.0,
        "lanes": 3,
        "spawn_frequency": 0.5,
        "population": [
            { "desired_speed": [25.0, 2.0], "length": 4.5, "spawn_weight": 3 },
            { "desired_speed": 20.0, "length": [12.0, 1.0], "fail_probability": 0.001 }
        ]
    }
}"#;

#[test]
fn loads_partial_config_with_defaults() {
    let config: SimulationConfig = serde_json::from_str(CONFIG).unwrap();
    assert_eq!(config.time_step, 0.05);
    assert_eq!(config.road.lanes, 3);
    assert_eq!(config.road.lane_width, 5.0);

    let cars = &config.road.population[0];
    assert_eq!(cars.desired_speed, Param::Distributed(25.0, 2.0));
    assert_eq!(cars.length, Param::Fixed(4.5));
    assert_eq!(cars.spawn_weight, 3.0);
    assert_eq!(cars.exponent, Param::Fixed(4.0));

    let trucks = &config.road.population[1];
    assert_eq!(trucks.length, Param::Distributed(12.0, 1.0));
    assert_eq!(trucks.spawn_weight, 10.0);
}

#[test]
fn trajectory_serializes() {
    let config: SimulationConfig = serde_json::from_str(CONFIG).unwrap();
    let mut sim = Simulation::from_seed(config, 3).unwrap();
    sim.run_for(10.0);

    let json = serde_json::to_value(sim.trajectory()).unwrap();
    let frames = json.as_array().unwrap();
    assert_eq!(frames.len(), 200);
    let car = &frames[0][0];
    assert!(car["vel"].as_f64().unwrap() > 0.0);
    let y = car["position"]["y"].as_f64().unwrap();
    assert!([0.0, 5.0, 10.0].contains(&y));
}
