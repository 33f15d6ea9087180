//! Driver parameters and the population templates they are sampled from.

use crate::error::ConfigError;
use rand::Rng;
use rand_distr::{Distribution, Normal};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Samples further than this many standard deviations from the mean are
/// replaced by the mean.
const SAMPLE_BOUND: f64 = 2.0;

/// A parameter of a [DriverTemplate], either fixed or normally distributed.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(untagged))]
pub enum Param {
    /// Every driver gets exactly this value.
    Fixed(f64),
    /// Each driver draws a value from a normal distribution, given as `(mean, std_dev)`.
    Distributed(f64, f64),
}

impl Param {
    /// Resolves the parameter to a concrete value.
    ///
    /// Distributed values are folded onto the positive half-line and fall back
    /// to the mean when they land outside two standard deviations of it.
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            Param::Fixed(value) => value,
            Param::Distributed(mean, std_dev) => {
                let Ok(normal) = Normal::new(mean, std_dev) else {
                    return mean;
                };
                let value = normal.sample(rng).abs();
                if (value - mean).abs() <= SAMPLE_BOUND * std_dev {
                    value
                } else {
                    mean
                }
            }
        }
    }

    /// The mean of the parameter.
    pub fn mean(&self) -> f64 {
        match *self {
            Param::Fixed(value) => value,
            Param::Distributed(mean, _) => mean,
        }
    }

    /// Resolves a parameter which must be strictly positive, such as a divisor.
    fn resolve_positive<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let value = self.resolve(rng);
        if value > 0.0 {
            value
        } else {
            self.mean()
        }
    }

    fn is_valid(&self) -> bool {
        match *self {
            Param::Fixed(value) => value.is_finite() && value >= 0.0,
            Param::Distributed(mean, std_dev) => {
                mean.is_finite() && mean >= 0.0 && std_dev.is_finite() && std_dev >= 0.0
            }
        }
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Param::Fixed(value)
    }
}

impl From<(f64, f64)> for Param {
    fn from((mean, std_dev): (f64, f64)) -> Self {
        Param::Distributed(mean, std_dev)
    }
}

/// One kind of driver in the population, from which a [DriverParams]
/// is sampled for each vehicle that enters the road.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct DriverTemplate {
    /// The desired velocity in m/s.
    pub desired_speed: Param,
    /// The static jam distance in m.
    pub jam_distance: Param,
    /// The velocity dependent jam distance in m.
    pub jam_distance_dyn: Param,
    /// The desired time gap to the vehicle ahead in s.
    pub time_headway: Param,
    /// The maximum acceleration in m/s<sup>2</sup>.
    pub max_acceleration: Param,
    /// The comfortable deceleration in m/s<sup>2</sup>, a positive number.
    pub comf_deceleration: Param,
    /// The IDM acceleration exponent.
    pub exponent: Param,
    /// The vehicle length in m.
    pub length: Param,
    /// The acceleration advantage needed before changing lanes, in m/s<sup>2</sup>.
    pub lc_threshold: Param,
    /// The MOBIL politeness factor.
    pub politeness: Param,
    /// The probability of breaking down on any given step.
    pub fail_probability: Param,
    /// The preference for keeping right.
    pub right_bias: Param,
    /// The velocity at which vehicles enter the road, in m/s.
    /// Defaults to the resolved desired speed.
    pub start_speed: Option<f64>,
    /// The number of steps a breakdown lasts.
    pub fail_steps: u32,
    /// The relative frequency of this template among spawned vehicles.
    pub spawn_weight: f64,
}

impl Default for DriverTemplate {
    fn default() -> Self {
        Self {
            desired_speed: Param::Distributed(30.0, 1.0),
            jam_distance: Param::Distributed(2.0, 1.0),
            jam_distance_dyn: Param::Fixed(0.0),
            time_headway: Param::Distributed(1.5, 1.0),
            max_acceleration: Param::Distributed(2.0, 1.0),
            comf_deceleration: Param::Distributed(3.0, 1.0),
            exponent: Param::Fixed(4.0),
            length: Param::Distributed(5.0, 1.0),
            lc_threshold: Param::Fixed(0.2),
            politeness: Param::Distributed(0.5, 1.0),
            fail_probability: Param::Fixed(0.0),
            right_bias: Param::Fixed(0.3),
            start_speed: None,
            fail_steps: 1,
            spawn_weight: 10.0,
        }
    }
}

impl From<DriverParams> for DriverTemplate {
    fn from(params: DriverParams) -> Self {
        Self {
            desired_speed: params.desired_speed.into(),
            jam_distance: params.jam_distance.into(),
            jam_distance_dyn: params.jam_distance_dyn.into(),
            time_headway: params.time_headway.into(),
            max_acceleration: params.max_acceleration.into(),
            comf_deceleration: params.comf_deceleration.into(),
            exponent: params.exponent.into(),
            length: params.length.into(),
            lc_threshold: params.lc_threshold.into(),
            politeness: params.politeness.into(),
            fail_probability: params.fail_probability.into(),
            right_bias: params.right_bias.into(),
            start_speed: Some(params.start_speed),
            fail_steps: params.fail_steps,
            spawn_weight: params.spawn_weight,
        }
    }
}

impl DriverTemplate {
    /// Samples the parameters of a single driver.
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> DriverParams {
        let desired_speed = self.desired_speed.resolve_positive(rng);
        DriverParams {
            desired_speed,
            jam_distance: self.jam_distance.resolve(rng),
            jam_distance_dyn: self.jam_distance_dyn.resolve(rng),
            time_headway: self.time_headway.resolve(rng),
            max_acceleration: self.max_acceleration.resolve_positive(rng),
            comf_deceleration: self.comf_deceleration.resolve_positive(rng),
            exponent: self.exponent.resolve(rng),
            length: self.length.resolve(rng),
            lc_threshold: self.lc_threshold.resolve(rng),
            politeness: self.politeness.resolve(rng),
            fail_probability: self.fail_probability.resolve(rng),
            right_bias: self.right_bias.resolve(rng),
            start_speed: self.start_speed.unwrap_or(desired_speed),
            fail_steps: self.fail_steps,
            spawn_weight: self.spawn_weight,
        }
    }

    /// Checks that every driver sampled from this template can be simulated.
    ///
    /// # Parameters
    /// * `template` - The index of the template in the population, for error reporting.
    pub(crate) fn validate(&self, template: usize) -> Result<(), ConfigError> {
        let params = [
            ("desired_speed", self.desired_speed),
            ("jam_distance", self.jam_distance),
            ("jam_distance_dyn", self.jam_distance_dyn),
            ("time_headway", self.time_headway),
            ("max_acceleration", self.max_acceleration),
            ("comf_deceleration", self.comf_deceleration),
            ("exponent", self.exponent),
            ("length", self.length),
            ("lc_threshold", self.lc_threshold),
            ("politeness", self.politeness),
            ("fail_probability", self.fail_probability),
            ("right_bias", self.right_bias),
            ("start_speed", Param::Fixed(self.start_speed.unwrap_or(0.0))),
            ("spawn_weight", Param::Fixed(self.spawn_weight)),
        ];
        if let Some((field, _)) = params.iter().find(|(_, param)| !param.is_valid()) {
            return Err(ConfigError::InvalidParam { template, field });
        }

        // These appear as divisors in the acceleration model
        let divisors = [
            ("desired_speed", self.desired_speed),
            ("max_acceleration", self.max_acceleration),
            ("comf_deceleration", self.comf_deceleration),
        ];
        if let Some((field, _)) = divisors.iter().find(|(_, param)| param.mean() <= 0.0) {
            return Err(ConfigError::NonPositiveParam { template, field });
        }

        Ok(())
    }
}

/// The parameters of a single driver and their vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DriverParams {
    /// The desired velocity in m/s.
    pub desired_speed: f64,
    /// The static jam distance in m.
    pub jam_distance: f64,
    /// The velocity dependent jam distance in m.
    pub jam_distance_dyn: f64,
    /// The desired time gap to the vehicle ahead in s.
    pub time_headway: f64,
    /// The maximum acceleration in m/s<sup>2</sup>.
    pub max_acceleration: f64,
    /// The comfortable deceleration in m/s<sup>2</sup>, a positive number.
    pub comf_deceleration: f64,
    /// The IDM acceleration exponent.
    pub exponent: f64,
    /// The vehicle length in m.
    pub length: f64,
    /// The acceleration advantage needed before changing lanes, in m/s<sup>2</sup>.
    pub lc_threshold: f64,
    /// The MOBIL politeness factor.
    pub politeness: f64,
    /// The probability of breaking down on any given step.
    pub fail_probability: f64,
    /// The preference for keeping right. Carried for callers; lane changes use the
    /// fixed [LEFT_BIAS](crate::mobil::LEFT_BIAS) instead.
    pub right_bias: f64,
    /// The velocity at which the vehicle enters the road, in m/s.
    pub start_speed: f64,
    /// The number of steps a breakdown lasts.
    pub fail_steps: u32,
    /// The relative spawn frequency of the template this was sampled from.
    /// Carried for callers; the road draws templates by their own weights.
    pub spawn_weight: f64,
}

impl Default for DriverParams {
    /// The mean driver of the default [DriverTemplate].
    fn default() -> Self {
        Self {
            desired_speed: 30.0,
            jam_distance: 2.0,
            jam_distance_dyn: 0.0,
            time_headway: 1.5,
            max_acceleration: 2.0,
            comf_deceleration: 3.0,
            exponent: 4.0,
            length: 5.0,
            lc_threshold: 0.2,
            politeness: 0.5,
            fail_probability: 0.0,
            right_bias: 0.3,
            start_speed: 30.0,
            fail_steps: 1,
            spawn_weight: 10.0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn distributed_values_stay_within_two_sigma() {
        let mut rng = StdRng::seed_from_u64(7);
        let param = Param::Distributed(30.0, 1.0);
        for _ in 0..10_000 {
            let value = param.resolve(&mut rng);
            assert!((28.0..=32.0).contains(&value), "{value} out of range");
        }
    }

    #[test]
    fn distributed_values_are_never_negative() {
        let mut rng = StdRng::seed_from_u64(11);
        let param = Param::Distributed(0.5, 1.0);
        for _ in 0..10_000 {
            assert!(param.resolve(&mut rng) >= 0.0);
        }
    }

    #[test]
    fn fixed_values_resolve_exactly() {
        let mut rng = StdRng::seed_from_u64(0);
        let params = DriverTemplate::from(DriverParams::default()).resolve(&mut rng);
        assert_eq!(params, DriverParams::default());
    }

    #[test]
    fn start_speed_defaults_to_desired_speed() {
        let mut rng = StdRng::seed_from_u64(3);
        let template = DriverTemplate {
            desired_speed: Param::Distributed(25.0, 2.0),
            start_speed: None,
            ..Default::default()
        };
        let params = template.resolve(&mut rng);
        assert_eq!(params.start_speed, params.desired_speed);
    }

    #[test]
    fn default_template_is_valid() {
        assert_eq!(DriverTemplate::default().validate(0), Ok(()));
    }

    #[test]
    fn rejects_invalid_templates() {
        let negative = DriverTemplate {
            jam_distance: Param::Fixed(-1.0),
            ..Default::default()
        };
        assert_eq!(
            negative.validate(2),
            Err(ConfigError::InvalidParam {
                template: 2,
                field: "jam_distance"
            })
        );

        let stopped = DriverTemplate {
            desired_speed: Param::Fixed(0.0),
            ..Default::default()
        };
        assert_eq!(
            stopped.validate(0),
            Err(ConfigError::NonPositiveParam {
                template: 0,
                field: "desired_speed"
            })
        );

        let centred = DriverTemplate {
            max_acceleration: Param::Distributed(0.0, 1.0),
            ..Default::default()
        };
        assert!(centred.validate(0).is_err());
    }
}
