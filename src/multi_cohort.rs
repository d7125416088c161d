//! Probabilistic sensitivity analysis over many cohorts
//!
//! Each cohort is simulated under its own parameter draw (seed = cohort
//! index). Only the cohort means are kept, so the second-order statistics
//! describe parameter uncertainty rather than patient heterogeneity.

use std::collections::HashSet;

use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::cohort::{Cohort, CohortOutcomes};
use crate::generator::ParameterSource;
use crate::stats::SummaryStat;
use crate::ModelError;

/// Cohort-level means of one parameter draw
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CohortMeans {
    /// `None` when no patient of the cohort had an exacerbation
    pub time_to_exacerbation: Option<f64>,
    pub cost: f64,
    pub utility: f64,
}

impl CohortMeans {
    pub fn from_outcomes(outcomes: &CohortOutcomes) -> Self {
        Self {
            time_to_exacerbation: outcomes.mean_time_to_exacerbation(),
            cost: outcomes.stat_cost().mean(),
            utility: outcomes.stat_utility().mean(),
        }
    }
}

/// Cohorts simulated under independently sampled parameter sets
#[derive(Debug, Clone)]
pub struct MultiCohort<S> {
    ids: Vec<u64>,
    pop_size: usize,
    source: S,
}

impl<S: ParameterSource> MultiCohort<S> {
    /// `n_cohorts` cohorts with ids `0..n_cohorts`
    pub fn new(n_cohorts: usize, pop_size: usize, source: S) -> Result<Self, ModelError> {
        Self::with_ids((0..n_cohorts as u64).collect(), pop_size, source)
    }

    /// Cohorts with explicit ids; the i-th cohort still uses seed `i`.
    pub fn with_ids(ids: Vec<u64>, pop_size: usize, source: S) -> Result<Self, ModelError> {
        if ids.is_empty() {
            return Err(ModelError::InvalidConfig(
                "at least one cohort is required".to_string(),
            ));
        }
        if pop_size == 0 {
            return Err(ModelError::InvalidConfig(
                "pop_size must be greater than zero".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(ids.len());
        if let Some(dup) = ids.iter().find(|id| !seen.insert(**id)) {
            return Err(ModelError::InvalidConfig(format!(
                "duplicate cohort id {dup}"
            )));
        }
        let max_id = ids.iter().copied().max().unwrap_or_default();
        max_id
            .checked_mul(pop_size as u64)
            .and_then(|first| first.checked_add(pop_size as u64 - 1))
            .ok_or_else(|| {
                ModelError::InvalidConfig(format!(
                    "cohort id {max_id} with pop_size {pop_size} overflows patient ids"
                ))
            })?;

        Ok(Self {
            ids,
            pop_size,
            source,
        })
    }

    pub fn n_cohorts(&self) -> usize {
        self.ids.len()
    }

    pub fn pop_size(&self) -> usize {
        self.pop_size
    }

    pub fn ids(&self) -> &[u64] {
        &self.ids
    }

    /// Simulate all cohorts for `n_time_steps` steps.
    pub fn simulate(&self, n_time_steps: usize) -> MultiCohortOutcomes {
        info!(
            therapy = ?self.source.therapy(),
            n_cohorts = self.ids.len(),
            pop_size = self.pop_size,
            n_time_steps,
            "simulating multi-cohort"
        );

        let means: Vec<CohortMeans> = self
            .ids
            .par_iter()
            .enumerate()
            .map(|(i, &id)| {
                let params = self.source.get_new_parameters(i as u64);
                let cohort = Cohort::from_validated(id, self.pop_size, params);
                CohortMeans::from_outcomes(&cohort.simulate(n_time_steps))
            })
            .collect();

        let outcomes = MultiCohortOutcomes::from_cohort_means(&means);
        info!(
            therapy = ?self.source.therapy(),
            mean_cost = outcomes.stat_mean_cost().mean(),
            mean_utility = outcomes.stat_mean_utility().mean(),
            "multi-cohort finished"
        );
        outcomes
    }
}

/// Cohort-mean series and their second-order summaries
#[derive(Debug, Clone, Serialize)]
pub struct MultiCohortOutcomes {
    mean_times_to_exacerbation: Vec<Option<f64>>,
    stat_mean_time_to_exacerbation: SummaryStat,
    stat_mean_cost: SummaryStat,
    stat_mean_utility: SummaryStat,
}

impl MultiCohortOutcomes {
    /// Summarize cohort means in cohort order.
    ///
    /// Cohorts without any exacerbation keep a `None` entry and are left out
    /// of the time-to-exacerbation summary.
    pub fn from_cohort_means(means: &[CohortMeans]) -> Self {
        let mean_times_to_exacerbation: Vec<Option<f64>> =
            means.iter().map(|m| m.time_to_exacerbation).collect();
        let observed_times = mean_times_to_exacerbation.iter().flatten().copied().collect();
        let costs = means.iter().map(|m| m.cost).collect();
        let utilities = means.iter().map(|m| m.utility).collect();

        Self {
            mean_times_to_exacerbation,
            stat_mean_time_to_exacerbation: SummaryStat::new(
                "Average time to asthma exacerbation",
                observed_times,
            ),
            stat_mean_cost: SummaryStat::new("Average cost", costs),
            stat_mean_utility: SummaryStat::new("Average QALY", utilities),
        }
    }

    pub fn len(&self) -> usize {
        self.mean_times_to_exacerbation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean_times_to_exacerbation.is_empty()
    }

    pub fn mean_times_to_exacerbation(&self) -> &[Option<f64>] {
        &self.mean_times_to_exacerbation
    }

    pub fn mean_costs(&self) -> &[f64] {
        self.stat_mean_cost.data()
    }

    pub fn mean_utilities(&self) -> &[f64] {
        self.stat_mean_utility.data()
    }

    pub fn stat_mean_time_to_exacerbation(&self) -> &SummaryStat {
        &self.stat_mean_time_to_exacerbation
    }

    pub fn stat_mean_cost(&self) -> &SummaryStat {
        &self.stat_mean_cost
    }

    pub fn stat_mean_utility(&self) -> &SummaryStat {
        &self.stat_mean_utility
    }
}
