//! The MOBIL lane changing model.

use super::acceleration::{idm, MIN_GAP};
use crate::params::DriverParams;

/// The extra advantage needed to change into the lane on the left, in m/s<sup>2</sup>.
/// Changes to the right have no such penalty, so vehicles tend to keep right.
pub const LEFT_BIAS: f64 = 0.2;

/// A direction of lane change. Left is towards the top lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// The effect a lane change has on the vehicle that would end up behind the mover.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FollowerImpact {
    /// The reduction in the follower's acceleration, in m/s<sup>2</sup>.
    pub disadvantage: f64,
    /// The follower's acceleration after the change, in m/s<sup>2</sup>.
    pub accel_after: f64,
}

/// A lane change decision with the intermediate values used to reach it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decision {
    /// The mover's acceleration behind its current leader.
    pub accel_before: f64,
    /// The mover's acceleration behind the leader in the target lane.
    pub accel_after: f64,
    /// `accel_after - accel_before`.
    pub advantage: f64,
    /// The impact on the new follower.
    pub follower: FollowerImpact,
    /// Whether the advantage outweighs the politeness-weighted disadvantage.
    pub incentive: bool,
    /// Whether the new follower can avoid braking harder than comfortable.
    pub safe: bool,
}

impl Decision {
    /// Whether the model recommends changing lanes.
    pub fn should_change(&self) -> bool {
        self.incentive && self.safe
    }
}

/// Computes the [FollowerImpact] on a vehicle which would gain a new leader.
///
/// # Parameters
/// * `vel` - The follower's velocity (m/s).
/// * `gap_before` - The follower's gap to its current leader (m).
/// * `leader_vel_before` - The velocity of the follower's current leader (m/s).
/// * `gap_after` - The follower's gap to the mover after the change (m).
/// * `leader_vel_after` - The mover's velocity (m/s).
/// * `params` - The follower's parameters.
pub fn follower_impact(
    vel: f64,
    gap_before: f64,
    leader_vel_before: f64,
    gap_after: f64,
    leader_vel_after: f64,
    params: &DriverParams,
) -> FollowerImpact {
    let accel_before = idm(vel, leader_vel_before, f64::max(gap_before, MIN_GAP), params);
    let accel_after = idm(vel, leader_vel_after, f64::max(gap_after, MIN_GAP), params);
    FollowerImpact {
        disadvantage: accel_before - accel_after,
        accel_after,
    }
}

/// Evaluates a lane change with the MOBIL model.
///
/// The mover's advantage compares its current leader with the target lane's
/// leader at the current gap, isolating the effect of swapping leaders.
///
/// # Parameters
/// * `side` - The direction of the change.
/// * `vel` - The mover's velocity (m/s).
/// * `gap` - The mover's gap to its current leader (m).
/// * `leader_vel_before` - The velocity of the current leader (m/s).
/// * `leader_vel_after` - The velocity of the leader in the target lane (m/s).
/// * `follower` - The impact on the follower in the target lane.
/// * `params` - The mover's parameters.
pub fn evaluate(
    side: Side,
    vel: f64,
    gap: f64,
    leader_vel_before: f64,
    leader_vel_after: f64,
    follower: FollowerImpact,
    params: &DriverParams,
) -> Decision {
    let gap = f64::max(gap, MIN_GAP);
    let accel_before = idm(vel, leader_vel_before, gap, params);
    let accel_after = idm(vel, leader_vel_after, gap, params);
    let advantage = accel_after - accel_before;

    let bias = match side {
        Side::Left => LEFT_BIAS,
        Side::Right => 0.0,
    };
    let incentive =
        advantage > params.politeness * follower.disadvantage + params.lc_threshold + bias;
    let safe = follower.accel_after > -params.comf_deceleration;

    Decision {
        accel_before,
        accel_after,
        advantage,
        follower,
        incentive,
        safe,
    }
}

/// Evaluates a lane change with the MOBIL model, returning only the verdict.
/// See [evaluate].
pub fn should_change(
    side: Side,
    vel: f64,
    gap: f64,
    leader_vel_before: f64,
    leader_vel_after: f64,
    follower: FollowerImpact,
    params: &DriverParams,
) -> bool {
    evaluate(side, vel, gap, leader_vel_before, leader_vel_after, follower, params).should_change()
}

/// Checks that the mover fits between the vehicles in the target lane,
/// using positions from before the move.
///
/// # Parameters
/// * `front` - The mover's front position (m).
/// * `rear` - The mover's rear position (m).
/// * `leader_rear` - The rear of the leader in the target lane, if any (m).
/// * `follower_front` - The front of the follower in the target lane, if any (m).
pub fn is_clear(front: f64, rear: f64, leader_rear: Option<f64>, follower_front: Option<f64>) -> bool {
    let clear_ahead = leader_rear.map_or(true, |leader_rear| leader_rear > front);
    let clear_behind = follower_front.map_or(true, |follower_front| follower_front < rear);
    clear_ahead && clear_behind
}
