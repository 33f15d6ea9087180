use std::time::Instant;

use highway_sim::{Simulation, SimulationConfig};

fn main() {
    env_logger::init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(0);
    let mut sim = match Simulation::from_seed(SimulationConfig::default(), seed) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("Invalid configuration: {err}");
            std::process::exit(1);
        }
    };

    println!("Simulating with seed {seed}...");
    let start = Instant::now();
    for _ in 0..10 {
        let (count, avg_vel) = {
            let frames = sim.run_for(60.0);
            let last = frames.last().map(Vec::as_slice).unwrap_or_default();
            let total = last.iter().map(|car| car.vel).sum::<f64>();
            (last.len(), total / last.len().max(1) as f64)
        };
        println!(
            "t = {:>4.0} s: {:>3} vehs, avg. {:.1} km/h",
            sim.time(),
            count,
            3.6 * avg_vel
        );
    }
    println!(
        "Avg. frame: {:?}",
        start.elapsed() / sim.frame().max(1) as u32
    );
}
