use thiserror::Error;

/// A configuration which cannot be simulated.
///
/// Returned by [Road::new](crate::Road::new) and [Simulation::new](crate::Simulation::new);
/// a successfully constructed simulation never fails while stepping.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("road must have at least one lane")]
    NoLanes,
    #[error("lane width must be positive (got {0})")]
    InvalidLaneWidth(f64),
    #[error("road length must be positive (got {0})")]
    InvalidLength(f64),
    #[error("spawn frequency must be finite and non-negative (got {0})")]
    InvalidSpawnFrequency(f64),
    #[error("time step must be positive (got {0})")]
    InvalidTimeStep(f64),
    #[error("population must contain at least one driver template")]
    EmptyPopulation,
    #[error("template {template}: {field} must be finite and non-negative")]
    InvalidParam {
        template: usize,
        field: &'static str,
    },
    #[error("template {template}: {field} may resolve to a non-positive value")]
    NonPositiveParam {
        template: usize,
        field: &'static str,
    },
    #[error("spawn weights must be non-negative and not all zero")]
    InvalidSpawnWeights,
}
