use crate::error::ConfigError;
use crate::road::{CarSnapshot, Road, RoadConfig};
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tolerance used when converting a duration into a number of steps.
const STEP_EPSILON: f64 = 1e-9;

/// The observable state of every car after one step.
pub type Frame = Vec<CarSnapshot>;

/// A traffic simulation on a single road.
#[derive(Clone, Debug)]
pub struct Simulation {
    /// The simulated road.
    road: Road,
    /// The time step in s.
    dt: f64,
    /// The number of steps simulated so far.
    frame: usize,
    /// The state of the cars after every step so far.
    trajectory: Vec<Frame>,
}

/// The attributes of a simulation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct SimulationConfig {
    /// The road to simulate.
    pub road: RoadConfig,
    /// The time step in s.
    pub time_step: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            road: RoadConfig::default(),
            time_step: 0.1,
        }
    }
}

/// The result of [Simulation::run_until_completion].
#[derive(Clone, Copy, Debug)]
pub struct Run<'a> {
    /// The frames simulated during the run.
    pub frames: &'a [Frame],
    /// Whether a car reached the end of the road.
    pub completed: bool,
}

impl Simulation {
    /// Creates a new simulation.
    pub fn new(config: SimulationConfig, rng: StdRng) -> Result<Self, ConfigError> {
        let dt = config.time_step;
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ConfigError::InvalidTimeStep(dt));
        }
        Ok(Self {
            road: Road::new(config.road, rng)?,
            dt,
            frame: 0,
            trajectory: vec![],
        })
    }

    /// Creates a new simulation with a random number generator seeded from `seed`.
    pub fn from_seed(config: SimulationConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::new(config, StdRng::seed_from_u64(seed))
    }

    /// Gets a reference to the road.
    pub fn road(&self) -> &Road {
        &self.road
    }

    /// Gets a mutable reference to the road, for placing cars by hand.
    pub fn road_mut(&mut self) -> &mut Road {
        &mut self.road
    }

    /// The time step in s.
    pub fn time_step(&self) -> f64 {
        self.dt
    }

    /// Gets the current simulation frame index.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// The simulated time in s.
    pub fn time(&self) -> f64 {
        self.frame as f64 * self.dt
    }

    /// The frames recorded so far.
    pub fn trajectory(&self) -> &[Frame] {
        &self.trajectory
    }

    /// Removes and returns the frames recorded so far.
    pub fn take_trajectory(&mut self) -> Vec<Frame> {
        std::mem::take(&mut self.trajectory)
    }

    /// Advances the simulation by one time step and returns the resulting frame.
    pub fn step(&mut self) -> &Frame {
        self.advance();
        &self.trajectory[self.trajectory.len() - 1]
    }

    /// Simulates `duration` seconds, returning the frames produced.
    pub fn run_for(&mut self, duration: f64) -> &[Frame] {
        let start = self.trajectory.len();
        let steps = f64::max((duration / self.dt - STEP_EPSILON).ceil(), 0.0) as usize;
        for _ in 0..steps {
            self.advance();
        }
        &self.trajectory[start..]
    }

    /// Simulates until a car reaches the end of the road, or `max_steps` steps have passed.
    pub fn run_until_completion(&mut self, max_steps: usize) -> Run<'_> {
        let start = self.trajectory.len();
        let mut completed = false;
        for _ in 0..max_steps {
            if self.advance() {
                completed = true;
                break;
            }
        }
        if completed {
            debug!("a car completed the road at t = {:.2} s", self.time());
        }
        Run {
            frames: &self.trajectory[start..],
            completed,
        }
    }

    /// Advances the road, records a frame, and returns whether a car reached the end.
    fn advance(&mut self) -> bool {
        let reached_end = self.road.update(self.dt);
        self.trajectory.push(self.road.snapshot());
        self.frame += 1;
        reached_end
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::DriverParams;

    fn empty_config() -> SimulationConfig {
        SimulationConfig {
            road: RoadConfig {
                spawn_frequency: 0.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn rejects_invalid_time_step() {
        let config = SimulationConfig {
            time_step: 0.0,
            ..Default::default()
        };
        assert_eq!(
            Simulation::from_seed(config, 0).err(),
            Some(ConfigError::InvalidTimeStep(0.0))
        );
    }

    #[test]
    fn rejects_invalid_road() {
        let mut config = SimulationConfig::default();
        config.road.lanes = 0;
        assert_eq!(
            Simulation::from_seed(config, 0).err(),
            Some(ConfigError::NoLanes)
        );
    }

    #[test]
    fn run_for_records_one_frame_per_step() {
        let mut sim = Simulation::from_seed(SimulationConfig::default(), 1).unwrap();
        assert_eq!(sim.run_for(5.0).len(), 50);
        assert_eq!(sim.run_for(0.25).len(), 3);
        assert_eq!(sim.trajectory().len(), 53);
        assert_eq!(sim.frame(), 53);
        assert_eq!(sim.run_for(0.0).len(), 0);
    }

    #[test]
    fn step_returns_the_live_cars() {
        let mut sim = Simulation::from_seed(empty_config(), 1).unwrap();
        let id = sim.road_mut().add_car(DriverParams::default(), 1, 10.0, 20.0);
        let frame = sim.step();
        assert_eq!(frame.len(), 1);
        assert_eq!(frame[0].id, id);
        assert!(frame[0].position.x > 10.0);
    }

    #[test]
    fn run_until_completion_stops_when_a_car_leaves() {
        let mut sim = Simulation::from_seed(empty_config(), 1).unwrap();
        sim.road_mut().add_car(DriverParams::default(), 0, 990.0, 30.0);

        let run = sim.run_until_completion(1000);
        assert!(run.completed);
        // 12.5 m to clear the end at 30 m/s
        assert_eq!(run.frames.len(), 5);
        assert!(run.frames.last().unwrap().is_empty());
    }

    #[test]
    fn run_until_completion_is_bounded() {
        let mut sim = Simulation::from_seed(empty_config(), 1).unwrap();
        let run = sim.run_until_completion(20);
        assert!(!run.completed);
        assert_eq!(run.frames.len(), 20);
    }

    #[test]
    fn take_trajectory_empties_the_log() {
        let mut sim = Simulation::from_seed(SimulationConfig::default(), 3).unwrap();
        sim.run_for(1.0);
        let frames = sim.take_trajectory();
        assert_eq!(frames.len(), 10);
        assert!(sim.trajectory().is_empty());
        assert_eq!(sim.frame(), 10);
    }
}
