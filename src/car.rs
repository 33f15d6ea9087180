use self::acceleration::{idm, MIN_GAP};
use self::lane_change::{follower_impact, FollowerImpact, Side};
use crate::params::DriverParams;
use crate::CarId;
use log::trace;
use rand::rngs::StdRng;
use rand::Rng;

pub mod acceleration;
pub mod lane_change;

/// A simulated car.
///
/// Cars are updated in two phases so that every car sees the same snapshot of the road:
/// [update_local](Self::update_local) computes the next state from the committed state of
/// the car and its neighbours, and [update_global](Self::update_global) commits it.
#[derive(Clone, Debug)]
pub struct Car {
    /// The car's ID.
    id: CarId,
    /// The driver's parameters.
    params: DriverParams,
    /// Half the car's length in m.
    half_len: f64,
    /// The state visible to other cars.
    state: CarState,
    /// The next state, computed by the local phase.
    staged: CarState,
    /// The breakdown state.
    failure: Failure,
    /// The source of breakdown events.
    rng: StdRng,
}

/// The kinematic state of a car.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CarState {
    /// The longitudinal position of the centre of the car in m.
    pub pos: f64,
    /// The index of the car's lane, counting from the top lane.
    pub lane: usize,
    /// The velocity in m/s.
    pub vel: f64,
    /// The acceleration used in the last step in m/s<sup>2</sup>.
    pub acc: f64,
}

#[derive(Clone, Copy, Debug)]
struct Failure {
    /// Whether the car is currently broken down.
    failing: bool,
    /// The number of broken down steps remaining.
    steps_left: u32,
}

/// The committed state of a nearby car, as seen by another car.
#[derive(Clone, Copy, Debug)]
pub struct Neighbour {
    /// The longitudinal position of the front of the car in m.
    pub pos_front: f64,
    /// The longitudinal position of the rear of the car in m.
    pub pos_rear: f64,
    /// The velocity in m/s.
    pub vel: f64,
    /// The driver's parameters.
    pub params: DriverParams,
}

/// The cars around a car which influence its behaviour.
#[derive(Clone, Copy, Debug, Default)]
pub struct Surroundings {
    pub leader: Option<Neighbour>,
    pub left_leader: Option<Neighbour>,
    pub right_leader: Option<Neighbour>,
    pub left_follower: Option<Neighbour>,
    pub right_follower: Option<Neighbour>,
    /// Whether a car in the lane to the left overlaps this car.
    pub left_alongside: bool,
    /// Whether a car in the lane to the right overlaps this car.
    pub right_alongside: bool,
}

impl Car {
    /// Creates a new car.
    ///
    /// # Parameters
    /// * `id` - The car's ID
    /// * `params` - The driver's parameters
    /// * `lane` - The index of the lane the car starts in
    /// * `pos` - The longitudinal position of the centre of the car in m
    /// * `vel` - The initial velocity in m/s
    /// * `rng` - The source of breakdown events for this car
    pub(crate) fn new(
        id: CarId,
        params: DriverParams,
        lane: usize,
        pos: f64,
        vel: f64,
        rng: StdRng,
    ) -> Self {
        let state = CarState {
            pos,
            lane,
            vel,
            acc: 0.0,
        };
        Self {
            id,
            params,
            half_len: 0.5 * params.length,
            state,
            staged: state,
            failure: Failure {
                failing: false,
                steps_left: params.fail_steps,
            },
            rng,
        }
    }

    /// Gets the car's ID.
    pub fn id(&self) -> CarId {
        self.id
    }

    /// The driver's parameters.
    pub fn params(&self) -> &DriverParams {
        &self.params
    }

    /// The car's length in m.
    pub fn length(&self) -> f64 {
        2.0 * self.half_len
    }

    /// The committed state of the car.
    pub fn state(&self) -> CarState {
        self.state
    }

    /// The longitudinal position of the centre of the car in m.
    pub fn pos_mid(&self) -> f64 {
        self.state.pos
    }

    /// The longitudinal position of the rear of the car in m.
    pub fn pos_rear(&self) -> f64 {
        self.state.pos - self.half_len
    }

    /// The longitudinal position of the front of the car in m.
    pub fn pos_front(&self) -> f64 {
        self.state.pos + self.half_len
    }

    /// The index of the car's lane, counting from the top lane.
    pub fn lane(&self) -> usize {
        self.state.lane
    }

    /// The car's velocity in m/s.
    pub fn vel(&self) -> f64 {
        self.state.vel
    }

    /// The acceleration used in the last step in m/s<sup>2</sup>.
    pub fn acc(&self) -> f64 {
        self.state.acc
    }

    /// Whether the car is broken down.
    pub fn is_failing(&self) -> bool {
        self.failure.failing
    }

    /// The car as seen by its neighbours.
    pub fn as_neighbour(&self) -> Neighbour {
        Neighbour {
            pos_front: self.pos_front(),
            pos_rear: self.pos_rear(),
            vel: self.state.vel,
            params: self.params,
        }
    }

    /// Computes the car's next state without making it visible.
    ///
    /// Lane changes are checked against the committed state only, so two cars
    /// in the lanes either side of the same lane may both move into it during
    /// one step and overlap.
    ///
    /// # Parameters
    /// * `around` - The car's neighbours, from the committed state of the road
    /// * `lanes` - The number of lanes on the road
    /// * `free_gap` - The gap assumed when there is no leader, in m
    /// * `dt` - The time step in seconds
    pub(crate) fn update_local(
        &mut self,
        around: &Surroundings,
        lanes: usize,
        free_gap: f64,
        dt: f64,
    ) {
        let failing = self.update_failure();

        let change_left = self.consider_lane_change(Side::Left, around, lanes, free_gap);
        let change_right = self.consider_lane_change(Side::Right, around, lanes, free_gap);

        let mut next = self.state;
        next.pos += self.state.vel * dt;
        if change_right {
            next.lane += 1;
        } else if change_left {
            next.lane -= 1;
        }

        if failing {
            next.acc = 0.0;
            next.vel = 0.0;
        } else {
            let (gap, leader_vel) = self.leader_gap(around.leader, free_gap);
            next.acc = idm(self.state.vel, leader_vel, f64::max(gap, MIN_GAP), &self.params);
            next.vel = f64::max(self.state.vel + next.acc * dt, 0.0);
        }

        self.staged = next;
    }

    /// Makes the state computed by [update_local](Self::update_local) visible.
    pub(crate) fn update_global(&mut self) {
        self.state = self.staged;
    }

    /// Advances the breakdown state by one step, returning whether the car is broken down.
    fn update_failure(&mut self) -> bool {
        if self.failure.failing || self.rng.gen::<f64>() < self.params.fail_probability {
            if self.failure.steps_left > 0 {
                self.failure.steps_left -= 1;
                self.failure.failing = true;
            } else {
                self.failure.steps_left = self.params.fail_steps;
                self.failure.failing = false;
            }
        }
        self.failure.failing
    }

    /// The gap to the given leader and its velocity, or an unobstructed proxy if there is none.
    fn leader_gap(&self, leader: Option<Neighbour>, free_gap: f64) -> (f64, f64) {
        leader.map_or((free_gap, self.state.vel), |leader| {
            (leader.pos_rear - self.pos_front(), leader.vel)
        })
    }

    /// Decides whether to change lanes in the given direction.
    fn consider_lane_change(
        &self,
        side: Side,
        around: &Surroundings,
        lanes: usize,
        free_gap: f64,
    ) -> bool {
        let (leader, follower, alongside) = match side {
            Side::Left if self.state.lane > 0 => (
                around.left_leader,
                around.left_follower,
                around.left_alongside,
            ),
            Side::Right if self.state.lane + 1 < lanes => (
                around.right_leader,
                around.right_follower,
                around.right_alongside,
            ),
            _ => return false,
        };

        let clear = lane_change::is_clear(
            self.pos_front(),
            self.pos_rear(),
            leader.map(|leader| leader.pos_rear),
            follower.map(|follower| follower.pos_front),
        );
        if alongside || !clear {
            return false;
        }

        let (gap, leader_vel_before) = self.leader_gap(around.leader, free_gap);
        let leader_vel_after = leader.map_or(self.state.vel, |leader| leader.vel);

        let impact = match follower {
            Some(follower) => {
                let (gap_before, vel_before) = match leader {
                    Some(leader) => (leader.pos_rear - follower.pos_front, leader.vel),
                    None => (free_gap, follower.vel),
                };
                follower_impact(
                    follower.vel,
                    gap_before,
                    vel_before,
                    self.pos_rear() - follower.pos_front,
                    self.state.vel,
                    &follower.params,
                )
            }
            None => FollowerImpact::default(),
        };

        let decision = lane_change::evaluate(
            side,
            self.state.vel,
            gap,
            leader_vel_before,
            leader_vel_after,
            impact,
            &self.params,
        );
        if decision.should_change() {
            trace!(
                "car {:?} changing {:?} (advantage {:.3})",
                self.id,
                side,
                decision.advantage
            );
        }
        decision.should_change()
    }
}
