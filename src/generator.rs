//! Parameter generator for probabilistic sensitivity analysis
//!
//! Holds one compiled distribution per uncertain input of a therapy arm and
//! turns a seed into a complete [`ParameterSet`].

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::Distribution;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::data;
use crate::distributions::{ParamDistribution, ParamSampler};
use crate::params::{ParameterSet, Therapy, TransitionMatrix};
use crate::state::HealthState;
use crate::ModelError;

/// Anything that can hand out a parameter set for a seed.
///
/// Implementations must be deterministic in `seed`.
pub trait ParameterSource: Sync {
    fn therapy(&self) -> Therapy;
    fn get_new_parameters(&self, seed: u64) -> ParameterSet;
}

/// Distribution library of one therapy arm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TherapyDistributions {
    /// One distribution per transition cell, row-major
    pub transition: Vec<Vec<ParamDistribution>>,
    pub annual_state_costs: Vec<ParamDistribution>,
    pub annual_state_utilities: Vec<ParamDistribution>,
    /// Added to every sampled state cost; `None` for no treatment cost
    pub annual_treatment_cost: Option<ParamDistribution>,
}

impl TherapyDistributions {
    /// Default uncertainty library for a therapy arm
    ///
    /// The middle column of each transition row is fitted by method of
    /// moments to the canonical school-age matrix with st_dev = mean / 4.
    pub fn for_therapy(therapy: Therapy) -> Self {
        use ParamDistribution::{Beta, BetaMoments, Gamma, Normal};

        let moments = |mean: f64| BetaMoments {
            mean,
            st_dev: mean / 4.0,
        };

        let (transition, annual_treatment_cost) = match therapy {
            Therapy::Daily => {
                let m = data::S_TRANS_MATRIX_DAILY;
                (
                    vec![
                        vec![
                            Beta { a: 106.106, b: 7.607 },
                            moments(m[0][1]),
                            Beta { a: 396.254, b: 42029.30 },
                        ],
                        vec![
                            Beta { a: 44.313, b: 5.645 },
                            moments(m[1][1]),
                            Beta { a: 393.584, b: 393.584 },
                        ],
                        vec![
                            Beta { a: 297.745, b: 869.882 },
                            moments(m[2][1]),
                            Beta { a: 395.148, b: 32261.70 },
                        ],
                    ],
                    Some(Gamma {
                        shape: 25.60,
                        scale: 0.64,
                    }),
                )
            }
            Therapy::Intermittent => {
                let m = data::S_TRANS_MATRIX_INTERMITTENT;
                (
                    vec![
                        vec![
                            Beta { a: 226.582, b: 37.545 },
                            moments(m[0][1]),
                            Beta { a: 395.869, b: 38038.08 },
                        ],
                        vec![
                            Beta { a: 72.383, b: 16.213 },
                            moments(m[1][1]),
                            Beta { a: 390.777, b: 16599.53 },
                        ],
                        vec![
                            Beta { a: 357.895, b: 3050.629 },
                            moments(m[2][1]),
                            Beta { a: 392.942, b: 21933.33 },
                        ],
                    ],
                    None,
                )
            }
        };

        Self {
            transition,
            annual_state_costs: vec![
                Gamma {
                    shape: 44.444,
                    scale: 0.21063,
                },
                Gamma {
                    shape: 44.444,
                    scale: 1.353,
                },
                Normal {
                    mean: 5.477,
                    st_dev: 1.006,
                },
            ],
            annual_state_utilities: vec![
                Beta { a: 3.411, b: 0.038 },
                Beta { a: 117.295, b: 49.081 },
                Beta { a: 289.725, b: 763.820 },
            ],
            annual_treatment_cost,
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        ensure_len("transition rows", self.transition.len())?;
        for (i, row) in self.transition.iter().enumerate() {
            ensure_len("transition columns", row.len())?;
            if !row.iter().all(ParamDistribution::is_probability) {
                return Err(ModelError::InvalidTransitionRow {
                    row: i,
                    reason: "every cell must be a probability distribution".to_string(),
                });
            }
            if row
                .iter()
                .all(|dist| matches!(dist, ParamDistribution::Fixed { value } if *value == 0.0))
            {
                return Err(ModelError::InvalidTransitionRow {
                    row: i,
                    reason: "row cannot be fixed at zero everywhere".to_string(),
                });
            }
        }
        ensure_len("annual state costs", self.annual_state_costs.len())?;
        ensure_len("annual state utilities", self.annual_state_utilities.len())?;
        Ok(())
    }
}

/// Samples parameter sets for one therapy arm
#[derive(Debug, Clone)]
pub struct ParameterGenerator {
    therapy: Therapy,
    discount_rate: f64,
    transition: Vec<Vec<ParamSampler>>,
    annual_state_costs: Vec<ParamSampler>,
    annual_state_utilities: Vec<ParamSampler>,
    annual_treatment_cost: Option<ParamSampler>,
}

impl ParameterGenerator {
    /// Generator with the default distribution library of `therapy`
    pub fn new(therapy: Therapy, discount_rate: f64) -> Result<Self, ModelError> {
        Self::with_distributions(
            therapy,
            &TherapyDistributions::for_therapy(therapy),
            discount_rate,
        )
    }

    pub fn with_distributions(
        therapy: Therapy,
        distributions: &TherapyDistributions,
        discount_rate: f64,
    ) -> Result<Self, ModelError> {
        distributions.validate()?;
        if !discount_rate.is_finite() || discount_rate < 0.0 {
            return Err(ModelError::InvalidConfig(
                "discount rate must be finite and >= 0".to_string(),
            ));
        }

        let transition = distributions
            .transition
            .iter()
            .map(|row| build_all(row))
            .collect::<Result<Vec<_>, _>>()?;
        let annual_state_costs = build_all(&distributions.annual_state_costs)?;
        let annual_state_utilities = build_all(&distributions.annual_state_utilities)?;
        let annual_treatment_cost = distributions
            .annual_treatment_cost
            .as_ref()
            .map(ParamDistribution::build)
            .transpose()?;

        Ok(Self {
            therapy,
            discount_rate,
            transition,
            annual_state_costs,
            annual_state_utilities,
            annual_treatment_cost,
        })
    }
}

impl ParameterSource for ParameterGenerator {
    fn therapy(&self) -> Therapy {
        self.therapy
    }

    /// Draw a parameter set from a generator seeded with `seed`.
    ///
    /// Draw order: transition cells row-major, treatment cost, state costs,
    /// state utilities.
    fn get_new_parameters(&self, seed: u64) -> ParameterSet {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut rows: Vec<Vec<f64>> = self
            .transition
            .iter()
            .map(|row| row.iter().map(|dist| dist.sample(&mut rng)).collect())
            .collect();
        for row in &mut rows {
            normalize_row(row);
        }

        let treatment_cost = self
            .annual_treatment_cost
            .as_ref()
            .map_or(0.0, |dist| dist.sample(&mut rng));

        let annual_state_costs: Vec<f64> = self
            .annual_state_costs
            .iter()
            .map(|dist| dist.sample(&mut rng) + treatment_cost)
            .collect();
        let annual_state_utilities: Vec<f64> = self
            .annual_state_utilities
            .iter()
            .map(|dist| dist.sample(&mut rng))
            .collect();

        trace!(seed, therapy = ?self.therapy, treatment_cost, "sampled parameter set");

        ParameterSet::sampled(
            self.therapy,
            TransitionMatrix::from_rows_unchecked(rows),
            annual_state_costs,
            annual_state_utilities,
            self.discount_rate,
        )
    }
}

/// Rescale independently sampled transition probabilities to sum to one.
///
/// Rows whose sum is exactly 1 are left untouched. The rescaled cells are no
/// longer marginally distributed as configured.
pub fn normalize_row(row: &mut [f64]) {
    let row_sum: f64 = row.iter().sum();
    if row_sum != 1.0 {
        for value in row.iter_mut() {
            *value /= row_sum;
        }
    }
}

fn build_all(dists: &[ParamDistribution]) -> Result<Vec<ParamSampler>, ModelError> {
    dists.iter().map(ParamDistribution::build).collect()
}

fn ensure_len(context: &'static str, got: usize) -> Result<(), ModelError> {
    if got == HealthState::COUNT {
        return Ok(());
    }
    Err(ModelError::LengthMismatch {
        context,
        expected: HealthState::COUNT,
        got,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_gives_identical_parameters() {
        let generator = ParameterGenerator::new(Therapy::Daily, 0.0).unwrap();
        let a = generator.get_new_parameters(11);
        let b = generator.get_new_parameters(11);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_give_different_parameters() {
        let generator = ParameterGenerator::new(Therapy::Intermittent, 0.0).unwrap();
        let a = generator.get_new_parameters(0);
        let b = generator.get_new_parameters(1);
        assert_ne!(a.transition_matrix(), b.transition_matrix());
    }

    #[test]
    fn sampled_rows_are_stochastic() {
        for therapy in Therapy::ALL {
            let generator = ParameterGenerator::new(therapy, 0.03).unwrap();
            for seed in 0..50 {
                let params = generator.get_new_parameters(seed);
                for row in params.transition_matrix().rows() {
                    assert!(row.iter().all(|p| *p >= 0.0));
                    let sum: f64 = row.iter().sum();
                    assert!((sum - 1.0).abs() < 1e-9, "row sum {sum}");
                }
                assert_eq!(params.discount_rate(), 0.03);
                assert_eq!(params.initial_state(), HealthState::Well);
            }
        }
    }

    #[test]
    fn normalize_row_rescales_only_when_needed() {
        let mut row = vec![0.2, 0.2, 0.6];
        let before = row.clone();
        normalize_row(&mut row);
        assert_eq!(row, before);

        let mut row = vec![1.0, 2.0, 1.0];
        normalize_row(&mut row);
        assert_eq!(row, vec![0.25, 0.5, 0.25]);
    }

    #[test]
    fn treatment_cost_is_added_to_every_state_cost() {
        let fixed = |value| ParamDistribution::Fixed { value };
        let distributions = TherapyDistributions {
            transition: vec![
                vec![fixed(1.0), fixed(0.0), fixed(0.0)],
                vec![fixed(0.0), fixed(1.0), fixed(0.0)],
                vec![fixed(0.0), fixed(0.0), fixed(1.0)],
            ],
            annual_state_costs: vec![fixed(1.0), fixed(2.0), fixed(3.0)],
            annual_state_utilities: vec![fixed(0.9), fixed(0.5), fixed(0.1)],
            annual_treatment_cost: Some(fixed(10.0)),
        };
        let generator =
            ParameterGenerator::with_distributions(Therapy::Daily, &distributions, 0.0).unwrap();
        let params = generator.get_new_parameters(3);
        assert_eq!(params.annual_state_costs(), &[11.0, 12.0, 13.0]);
        assert_eq!(params.annual_state_utilities(), &[0.9, 0.5, 0.1]);
        assert_eq!(params.annual_treatment_cost(), 0.0);
    }

    #[test]
    fn rejects_non_probability_cells() {
        let mut distributions = TherapyDistributions::for_therapy(Therapy::Daily);
        distributions.transition[1][2] = ParamDistribution::Gamma {
            shape: 1.0,
            scale: 1.0,
        };
        let err = ParameterGenerator::with_distributions(Therapy::Daily, &distributions, 0.0)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidTransitionRow { row: 1, .. }));
    }

    #[test]
    fn rejects_missing_state_cost() {
        let mut distributions = TherapyDistributions::for_therapy(Therapy::Intermittent);
        distributions.annual_state_costs.pop();
        assert!(
            ParameterGenerator::with_distributions(Therapy::Intermittent, &distributions, 0.0)
                .is_err()
        );
    }
}
