//! Parameter distributions
//!
//! [`ParamDistribution`] is the serializable description of an uncertain
//! input; [`ParamSampler`] is the compiled form that draws from a seeded
//! generator.

use rand::Rng;
use rand_distr::{Beta, Distribution, Gamma, Normal};
use serde::{Deserialize, Serialize};

use crate::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamDistribution {
    /// Beta(a, b) on [0, 1]
    Beta { a: f64, b: f64 },
    /// Beta on [0, 1] fitted by method of moments
    BetaMoments { mean: f64, st_dev: f64 },
    /// Gamma with shape and scale
    Gamma { shape: f64, scale: f64 },
    Normal { mean: f64, st_dev: f64 },
    /// Degenerate distribution
    Fixed { value: f64 },
}

impl ParamDistribution {
    /// Validate the shape parameters and compile a sampler.
    pub fn build(&self) -> Result<ParamSampler, ModelError> {
        let sampler = match *self {
            ParamDistribution::Beta { a, b } => ParamSampler::Beta(beta(a, b)?),
            ParamDistribution::BetaMoments { mean, st_dev } => {
                let (a, b) = fit_beta_moments(mean, st_dev)?;
                ParamSampler::Beta(beta(a, b)?)
            }
            ParamDistribution::Gamma { shape, scale } => {
                let gamma = Gamma::new(shape, scale).map_err(|err| {
                    ModelError::InvalidDistribution(format!("gamma({shape}, {scale}): {err}"))
                })?;
                ParamSampler::Gamma(gamma)
            }
            ParamDistribution::Normal { mean, st_dev } => {
                if !mean.is_finite() {
                    return Err(ModelError::InvalidDistribution(format!(
                        "normal mean {mean} must be finite"
                    )));
                }
                let normal = Normal::new(mean, st_dev).map_err(|err| {
                    ModelError::InvalidDistribution(format!("normal({mean}, {st_dev}): {err}"))
                })?;
                ParamSampler::Normal(normal)
            }
            ParamDistribution::Fixed { value } => {
                if !value.is_finite() {
                    return Err(ModelError::InvalidDistribution(format!(
                        "fixed value {value} must be finite"
                    )));
                }
                ParamSampler::Fixed(value)
            }
        };
        Ok(sampler)
    }

    /// Analytic mean
    pub fn mean(&self) -> f64 {
        match *self {
            ParamDistribution::Beta { a, b } => a / (a + b),
            ParamDistribution::BetaMoments { mean, .. } => mean,
            ParamDistribution::Gamma { shape, scale } => shape * scale,
            ParamDistribution::Normal { mean, .. } => mean,
            ParamDistribution::Fixed { value } => value,
        }
    }

    /// Whether every draw lies in [0, 1]
    pub fn is_probability(&self) -> bool {
        match *self {
            ParamDistribution::Beta { .. } | ParamDistribution::BetaMoments { .. } => true,
            ParamDistribution::Fixed { value } => (0.0..=1.0).contains(&value),
            ParamDistribution::Gamma { .. } | ParamDistribution::Normal { .. } => false,
        }
    }
}

/// Compiled distribution, immutable once built
#[derive(Debug, Clone)]
pub enum ParamSampler {
    Beta(Beta<f64>),
    Gamma(Gamma<f64>),
    Normal(Normal<f64>),
    Fixed(f64),
}

impl Distribution<f64> for ParamSampler {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            ParamSampler::Beta(dist) => dist.sample(rng),
            ParamSampler::Gamma(dist) => dist.sample(rng),
            ParamSampler::Normal(dist) => dist.sample(rng),
            ParamSampler::Fixed(value) => *value,
        }
    }
}

/// Method-of-moments Beta fit on [0, 1]
///
/// Returns `(a, b)` such that Beta(a, b) has the given mean and standard
/// deviation.
pub fn fit_beta_moments(mean: f64, st_dev: f64) -> Result<(f64, f64), ModelError> {
    if !(mean > 0.0 && mean < 1.0) {
        return Err(ModelError::InvalidDistribution(format!(
            "beta mean {mean} must be in (0, 1)"
        )));
    }
    if !(st_dev.is_finite() && st_dev > 0.0) {
        return Err(ModelError::InvalidDistribution(format!(
            "beta st_dev {st_dev} must be finite and > 0"
        )));
    }

    let a_plus_b = mean * (1.0 - mean) / (st_dev * st_dev) - 1.0;
    if a_plus_b <= 0.0 {
        return Err(ModelError::InvalidDistribution(format!(
            "beta st_dev {st_dev} too large for mean {mean}"
        )));
    }

    let a = mean * a_plus_b;
    Ok((a, a_plus_b - a))
}

fn beta(a: f64, b: f64) -> Result<Beta<f64>, ModelError> {
    Beta::new(a, b)
        .map_err(|err| ModelError::InvalidDistribution(format!("beta({a}, {b}): {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn moment_fit_recovers_mean_and_variance() {
        let (a, b) = fit_beta_moments(0.2, 0.05).unwrap();
        let mean = a / (a + b);
        let var = a * b / ((a + b).powi(2) * (a + b + 1.0));
        assert_relative_eq!(mean, 0.2, epsilon = 1e-12);
        assert_relative_eq!(var.sqrt(), 0.05, epsilon = 1e-10);
    }

    #[test]
    fn moment_fit_rejects_excess_spread() {
        assert!(fit_beta_moments(0.5, 0.6).is_err());
        assert!(fit_beta_moments(1.5, 0.1).is_err());
    }

    #[test]
    fn build_rejects_bad_shapes() {
        assert!(ParamDistribution::Beta { a: -1.0, b: 1.0 }.build().is_err());
        assert!(ParamDistribution::Gamma { shape: 0.0, scale: 1.0 }.build().is_err());
        assert!(ParamDistribution::Normal { mean: 0.0, st_dev: -1.0 }.build().is_err());
        assert!(ParamDistribution::Fixed { value: f64::NAN }.build().is_err());
    }

    #[test]
    fn beta_draws_stay_in_unit_interval() {
        let sampler = ParamDistribution::Beta { a: 2.0, b: 5.0 }.build().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..1000 {
            let x = sampler.sample(&mut rng);
            assert!((0.0..=1.0).contains(&x));
        }
    }

    #[test]
    fn fixed_sampler_is_constant() {
        let sampler = ParamDistribution::Fixed { value: 0.25 }.build().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(sampler.sample(&mut rng), 0.25);
    }

    #[test]
    fn deserializes_from_tagged_toml() {
        let dist: ParamDistribution =
            toml::from_str("kind = \"gamma\"\nshape = 2.0\nscale = 3.0").unwrap();
        assert_eq!(dist, ParamDistribution::Gamma { shape: 2.0, scale: 3.0 });
        assert_eq!(dist.mean(), 6.0);
    }
}
