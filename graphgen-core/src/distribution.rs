//! Degree distributions sampled for each participating vertex.

use std::{f64::consts::PI, fmt};

use rand::{Rng, distributions::Standard};

use crate::{
    canonical::{Canonical, CanonicalEncoder},
    error::ConfigurationError,
};

/// Parameters of a log-normal distribution over degrees.
///
/// The underlying normal has mean `log_mean` and standard deviation
/// `log_sd`; sampled values are rounded to the nearest integer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LogNormal {
    log_mean: f64,
    log_sd: f64,
}

impl LogNormal {
    /// Validates and stores the parameters.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::InvalidDistribution`] when `log_mean` is
    /// not finite or `log_sd` is negative or not finite.
    pub fn new(log_mean: f64, log_sd: f64) -> Result<Self, ConfigurationError> {
        if !log_mean.is_finite() {
            return Err(ConfigurationError::InvalidDistribution {
                parameter: "log_mean",
                value: log_mean,
            });
        }
        if !log_sd.is_finite() || log_sd < 0.0 {
            return Err(ConfigurationError::InvalidDistribution {
                parameter: "log_sd",
                value: log_sd,
            });
        }
        Ok(Self { log_mean, log_sd })
    }

    /// Mean of the underlying normal distribution.
    #[must_use]
    pub const fn log_mean(&self) -> f64 {
        self.log_mean
    }

    /// Standard deviation of the underlying normal distribution.
    #[must_use]
    pub const fn log_sd(&self) -> f64 {
        self.log_sd
    }
}

/// A sampler producing a non-negative degree from a random source.
///
/// Sampling consumes the random source deterministically: the same source
/// state always yields the same sequence of degrees.
///
/// # Examples
/// ```
/// use graphgen_core::DegreeDistribution;
/// use rand::{SeedableRng, rngs::SmallRng};
///
/// let mut rng = SmallRng::seed_from_u64(7);
/// assert_eq!(DegreeDistribution::Constant(3).sample(&mut rng), 3);
///
/// let heavy = DegreeDistribution::log_normal(0.7813873, 1.0293729)?;
/// let mut replay = SmallRng::seed_from_u64(7);
/// let mut first = SmallRng::seed_from_u64(7);
/// assert_eq!(heavy.sample(&mut first), heavy.sample(&mut replay));
/// # Ok::<(), graphgen_core::ConfigurationError>(())
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DegreeDistribution {
    /// Every sample equals the configured degree.
    Constant(u64),
    /// Samples follow a log-normal distribution.
    LogNormal(LogNormal),
}

impl DegreeDistribution {
    /// Builds a validated log-normal distribution.
    ///
    /// # Errors
    /// See [`LogNormal::new`].
    pub fn log_normal(log_mean: f64, log_sd: f64) -> Result<Self, ConfigurationError> {
        LogNormal::new(log_mean, log_sd).map(Self::LogNormal)
    }

    /// Draws one degree.
    #[expect(
        clippy::float_arithmetic,
        reason = "Log-normal sampling shifts and scales a standard normal draw."
    )]
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        match self {
            Self::Constant(degree) => *degree,
            Self::LogNormal(params) => {
                let normal = params.log_mean + params.log_sd * standard_normal(rng);
                round_to_degree(normal.exp())
            }
        }
    }

    /// Returns whether every sample is zero.
    #[must_use]
    pub const fn is_always_zero(&self) -> bool {
        matches!(self, Self::Constant(0))
    }
}

impl fmt::Display for DegreeDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(degree) => write!(f, "constant({degree})"),
            Self::LogNormal(params) => {
                write!(f, "log_normal({}, {})", params.log_mean, params.log_sd)
            }
        }
    }
}

impl Canonical for DegreeDistribution {
    fn encode(&self, encoder: &mut CanonicalEncoder) {
        match self {
            Self::Constant(degree) => {
                encoder.str("constant");
                encoder.u64(*degree);
            }
            Self::LogNormal(params) => {
                encoder.str("log_normal");
                encoder.f64(params.log_mean);
                encoder.f64(params.log_sd);
            }
        }
    }
}

/// Box-Muller transform over two uniform draws.
#[expect(
    clippy::float_arithmetic,
    reason = "Box-Muller requires floating-point arithmetic."
)]
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // `Standard` yields [0, 1); flipping it keeps the logarithm finite.
    let u1: f64 = 1.0 - rng.sample::<f64, _>(Standard);
    let u2: f64 = rng.sample(Standard);
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Rounds to the nearest degree, saturating at the `u64` bounds.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "Non-positive and NaN values return early; the cast saturates above."
)]
fn round_to_degree(value: f64) -> u64 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    // Float-to-int `as` casts saturate, so huge samples become `u64::MAX`.
    value.round() as u64
}
