use crate::car::{Car, Surroundings};
use crate::error::ConfigError;
use crate::params::{DriverParams, DriverTemplate};
use crate::{CarId, CarSet, Point2d};
use log::{debug, trace};
use rand::distributions::WeightedIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Distribution;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A straight multi-lane road, and the cars travelling along it.
#[derive(Clone, Debug)]
pub struct Road {
    /// The position at which cars enter the top lane.
    entry: Point2d,
    /// The length of the road in m.
    length: f64,
    /// The number of lanes.
    lanes: usize,
    /// The distance between adjacent lanes in m.
    lane_width: f64,
    /// The time between spawn attempts in s, or `None` if cars are never spawned.
    spawn_interval: Option<f64>,
    /// The time since the last car was spawned in s.
    since_spawn: f64,
    /// The kinds of drivers which are spawned.
    population: Vec<DriverTemplate>,
    /// The distribution used to pick a driver template.
    weights: WeightedIndex<f64>,
    /// The cars on the road.
    cars: CarSet,
    /// The source of randomness for spawning.
    rng: StdRng,
}

/// The attributes of a road.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct RoadConfig {
    /// The position at which cars enter the top lane.
    pub entry: Point2d,
    /// The length of the road in m.
    pub length: f64,
    /// The number of lanes.
    pub lanes: usize,
    /// The distance between adjacent lanes in m.
    pub lane_width: f64,
    /// The number of spawn attempts per second; zero disables spawning.
    pub spawn_frequency: f64,
    /// The kinds of drivers which are spawned.
    pub population: Vec<DriverTemplate>,
}

impl Default for RoadConfig {
    fn default() -> Self {
        Self {
            entry: Point2d::new(0.0, 0.0),
            length: 1000.0,
            lanes: 2,
            lane_width: 5.0,
            spawn_frequency: 1.0,
            population: vec![DriverTemplate::default()],
        }
    }
}

/// A lane relative to a car's own lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaneOffset {
    /// The lane towards the top lane.
    Left,
    Same,
    /// The lane towards the bottom lane.
    Right,
}

/// A direction along the road relative to a position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ahead,
    Behind,
}

/// The state of a car which may be observed outside the simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CarSnapshot {
    /// The car's ID.
    pub id: CarId,
    /// The centre of the car; `y` is the coordinate of its lane.
    pub position: Point2d,
    /// The velocity in m/s.
    pub vel: f64,
    /// The acceleration used in the last step in m/s<sup>2</sup>.
    pub acc: f64,
    /// The length of the car in m.
    pub length: f64,
}

impl Road {
    /// Creates an empty road.
    ///
    /// # Parameters
    /// * `config` - The road's attributes
    /// * `rng` - The source of randomness for spawning and breakdowns
    pub fn new(config: RoadConfig, rng: StdRng) -> Result<Self, ConfigError> {
        let RoadConfig {
            entry,
            length,
            lanes,
            lane_width,
            spawn_frequency,
            population,
        } = config;

        if lanes == 0 {
            return Err(ConfigError::NoLanes);
        }
        if !(lane_width.is_finite() && lane_width > 0.0) {
            return Err(ConfigError::InvalidLaneWidth(lane_width));
        }
        if !(length.is_finite() && length > 0.0) {
            return Err(ConfigError::InvalidLength(length));
        }
        if !(spawn_frequency.is_finite() && spawn_frequency >= 0.0) {
            return Err(ConfigError::InvalidSpawnFrequency(spawn_frequency));
        }
        if population.is_empty() {
            return Err(ConfigError::EmptyPopulation);
        }
        for (idx, template) in population.iter().enumerate() {
            template.validate(idx)?;
        }
        let weights = WeightedIndex::new(population.iter().map(|t| t.spawn_weight))
            .map_err(|_| ConfigError::InvalidSpawnWeights)?;

        let spawn_interval = (spawn_frequency > 0.0).then(|| 1.0 / spawn_frequency);

        Ok(Self {
            entry,
            length,
            lanes,
            lane_width,
            spawn_interval,
            since_spawn: spawn_interval.unwrap_or(0.0),
            population,
            weights,
            cars: CarSet::with_key(),
            rng,
        })
    }

    /// The position at which cars enter the top lane.
    pub fn entry(&self) -> Point2d {
        self.entry
    }

    /// The length of the road in m.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// The number of lanes.
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// The distance between adjacent lanes in m.
    pub fn lane_width(&self) -> f64 {
        self.lane_width
    }

    /// The lateral coordinate of the given lane.
    pub fn lane_coord(&self, lane: usize) -> f64 {
        self.entry.y + self.lane_width * lane as f64
    }

    /// The lateral coordinate of the top lane.
    pub fn top_lane(&self) -> f64 {
        self.lane_coord(0)
    }

    /// The lateral coordinate of the bottom lane.
    pub fn bottom_lane(&self) -> f64 {
        self.lane_coord(self.lanes - 1)
    }

    /// The longitudinal position past which cars leave the road.
    fn exit(&self) -> f64 {
        self.entry.x + self.length
    }

    /// Returns an iterator over all the cars on the road.
    pub fn iter_cars(&self) -> impl Iterator<Item = &Car> {
        self.cars.values()
    }

    /// Gets a reference to the car with the given ID, if it is still on the road.
    pub fn car(&self, car_id: CarId) -> Option<&Car> {
        self.cars.get(car_id)
    }

    /// The number of cars on the road.
    pub fn car_count(&self) -> usize {
        self.cars.len()
    }

    /// The observable state of every car on the road.
    pub fn snapshot(&self) -> Vec<CarSnapshot> {
        self.cars
            .values()
            .map(|car| CarSnapshot {
                id: car.id(),
                position: Point2d::new(car.pos_mid(), self.lane_coord(car.lane())),
                vel: car.vel(),
                acc: car.acc(),
                length: car.length(),
            })
            .collect()
    }

    /// Places a car on the road, bypassing the spawn gate.
    ///
    /// # Parameters
    /// * `params` - The driver's parameters
    /// * `lane` - The index of the lane, counting from the top lane
    /// * `pos` - The longitudinal position of the centre of the car in m
    /// * `vel` - The velocity in m/s
    ///
    /// # Panics
    /// Panics if `lane` does not exist. The desired speed, maximum acceleration and
    /// comfortable deceleration must be positive, which is only checked in debug builds.
    pub fn add_car(&mut self, params: DriverParams, lane: usize, pos: f64, vel: f64) -> CarId {
        assert!(lane < self.lanes, "Lane {} does not exist", lane);
        debug_assert!(
            params.desired_speed > 0.0
                && params.max_acceleration > 0.0
                && params.comf_deceleration > 0.0,
            "Driver parameters must be positive"
        );
        let rng = StdRng::seed_from_u64(self.rng.gen());
        self.cars
            .insert_with_key(|id| Car::new(id, params, lane, pos, vel, rng))
    }

    /// Finds the nearest car ahead of or behind a position.
    ///
    /// # Parameters
    /// * `lane` - The lane of the querying car
    /// * `pos` - The longitudinal position of the querying car
    /// * `offset` - The lane to search, relative to `lane`
    /// * `dir` - The direction to search in
    pub fn neighbour(
        &self,
        lane: usize,
        pos: f64,
        offset: LaneOffset,
        dir: Direction,
    ) -> Option<&Car> {
        let lane = match offset {
            LaneOffset::Left => lane.checked_sub(1)?,
            LaneOffset::Same => lane,
            LaneOffset::Right => Some(lane + 1).filter(|lane| *lane < self.lanes)?,
        };
        let in_lane = self.cars.values().filter(move |car| car.lane() == lane);
        match dir {
            Direction::Ahead => in_lane
                .filter(|car| car.pos_mid() > pos)
                .min_by(|a, b| a.pos_mid().total_cmp(&b.pos_mid())),
            Direction::Behind => in_lane
                .filter(|car| car.pos_mid() < pos)
                .max_by(|a, b| a.pos_mid().total_cmp(&b.pos_mid())),
        }
    }

    /// Finds the cars which influence the given car.
    pub fn surroundings(&self, car: &Car) -> Surroundings {
        let find = |offset, dir| {
            self.neighbour(car.lane(), car.pos_mid(), offset, dir)
                .map(Car::as_neighbour)
        };
        let alongside = |lane: Option<usize>| {
            lane.filter(|lane| *lane < self.lanes)
                .map_or(false, |lane| {
                    self.is_occupied(lane, car.pos_rear(), car.pos_front())
                })
        };
        Surroundings {
            leader: find(LaneOffset::Same, Direction::Ahead),
            left_leader: find(LaneOffset::Left, Direction::Ahead),
            right_leader: find(LaneOffset::Right, Direction::Ahead),
            left_follower: find(LaneOffset::Left, Direction::Behind),
            right_follower: find(LaneOffset::Right, Direction::Behind),
            left_alongside: alongside(car.lane().checked_sub(1)),
            right_alongside: alongside(Some(car.lane() + 1)),
        }
    }

    /// Advances the road by `dt` seconds.
    /// Returns `true` if a car reached the end of the road during this step.
    pub fn update(&mut self, dt: f64) -> bool {
        let ids = self.cars.keys().collect::<Vec<_>>();
        self.update_local(&ids, dt);
        self.update_global();
        let reached_end = self.remove_finished();
        self.update_spawn(dt);
        reached_end
    }

    /// Runs the local phase of the given cars.
    /// Every car observes the committed state, so the order of `ids` is irrelevant.
    fn update_local(&mut self, ids: &[CarId], dt: f64) {
        let free_gap = 2.0 * self.length;
        let surroundings = ids
            .iter()
            .map(|id| (*id, self.surroundings(&self.cars[*id])))
            .collect::<Vec<_>>();
        for (id, around) in surroundings {
            self.cars[id].update_local(&around, self.lanes, free_gap, dt);
        }
    }

    /// Commits the state computed by the local phase.
    fn update_global(&mut self) {
        for car in self.cars.values_mut() {
            car.update_global();
        }
    }

    /// Removes cars which have left the road. Returns `true` if any were removed.
    fn remove_finished(&mut self) -> bool {
        let exit = self.exit();
        let count = self.cars.len();
        self.cars.retain(|id, car| {
            let on_road = car.pos_rear() <= exit;
            if !on_road {
                debug!("car {:?} left the road", id);
            }
            on_road
        });
        self.cars.len() < count
    }

    /// Attempts to spawn a car if one is due.
    fn update_spawn(&mut self, dt: f64) {
        let Some(interval) = self.spawn_interval else {
            return;
        };
        self.since_spawn += dt;
        if self.since_spawn >= interval && self.try_spawn().is_some() {
            self.since_spawn = 0.0;
        }
    }

    /// Attempts to spawn a car at the entry of a random lane.
    ///
    /// The car is only admitted if it would not overlap another car, and would take
    /// at least its desired time headway to reach the car ahead.
    pub fn try_spawn(&mut self) -> Option<CarId> {
        let lane = self.rng.gen_range(0..self.lanes);
        let template = &self.population[self.weights.sample(&mut self.rng)];
        let params = template.resolve(&mut self.rng);

        let pos = self.entry.x;
        let vel = params.start_speed;
        let front = pos + 0.5 * params.length;
        let rear = pos - 0.5 * params.length;

        if self.is_occupied(lane, rear, front) {
            trace!("spawn in lane {} rejected: entry is occupied", lane);
            return None;
        }

        if let Some(leader) = self.neighbour(lane, pos, LaneOffset::Same, Direction::Ahead) {
            let gap = leader.pos_rear() - front;
            let time_to_reach = if vel > 0.0 { gap / vel } else { f64::INFINITY };
            if gap <= 0.0 || time_to_reach < params.time_headway {
                trace!(
                    "spawn in lane {} rejected: gap {:.2} m, {:.2} s ahead",
                    lane,
                    gap,
                    time_to_reach
                );
                return None;
            }
        }

        let id = self.add_car(params, lane, pos, vel);
        debug!("car {:?} entered lane {} at {:.2} m/s", id, lane, vel);
        Some(id)
    }

    /// Checks whether any car in `lane` overlaps or touches the interval `[rear, front]`.
    fn is_occupied(&self, lane: usize, rear: f64, front: f64) -> bool {
        self.cars.values().any(|car| {
            car.lane() == lane && car.pos_front() >= rear && car.pos_rear() <= front
        })
    }

    /// The committed state of every car, keyed by ID.
    #[cfg(test)]
    fn states(&self) -> Vec<(CarId, crate::car::CarState)> {
        self.cars.iter().map(|(id, car)| (id, car.state())).collect()
    }
}
