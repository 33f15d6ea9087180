//! A microscopic traffic simulation of a straight multi-lane road.
//!
//! Each car follows the car ahead using the intelligent driver model (IDM)
//! and decides whether to change lanes using the MOBIL model.

pub use car::acceleration::idm;
pub use car::lane_change::{self as mobil, Decision, FollowerImpact, Side};
pub use car::{Car, CarState, Neighbour, Surroundings};
pub use cgmath;
pub use error::ConfigError;
pub use params::{DriverParams, DriverTemplate, Param};
pub use road::{CarSnapshot, Direction, LaneOffset, Road, RoadConfig};
pub use simulation::{Frame, Run, Simulation, SimulationConfig};
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};

mod car;
mod error;
mod params;
mod road;
mod simulation;

new_key_type! {
    /// Unique ID of a [Car].
    pub struct CarId;
}

type CarSet = SlotMap<CarId, Car>;

/// A 2D point
pub type Point2d = cgmath::Point2<f64>;
