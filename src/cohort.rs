//! Cohort simulation
//!
//! A cohort runs `pop_size` independent patients under one parameter set and
//! summarizes their times to first exacerbation, discounted costs and
//! discounted utilities.

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::params::ParameterSet;
use crate::patient::{Patient, PatientOutcome};
use crate::stats::SummaryStat;
use crate::ModelError;

/// Population of patients sharing one parameter set
#[derive(Debug, Clone)]
pub struct Cohort {
    id: u64,
    pop_size: usize,
    params: ParameterSet,
}

impl Cohort {
    pub fn new(id: u64, pop_size: usize, params: ParameterSet) -> Result<Self, ModelError> {
        if pop_size == 0 {
            return Err(ModelError::InvalidConfig(
                "pop_size must be greater than zero".to_string(),
            ));
        }
        // the largest patient id must fit in u64
        id.checked_mul(pop_size as u64)
            .and_then(|first| first.checked_add(pop_size as u64 - 1))
            .ok_or_else(|| {
                ModelError::InvalidConfig(format!(
                    "cohort id {id} with pop_size {pop_size} overflows patient ids"
                ))
            })?;

        Ok(Self {
            id,
            pop_size,
            params,
        })
    }

    /// Construct from an id/size pair already checked by the caller.
    pub(crate) fn from_validated(id: u64, pop_size: usize, params: ParameterSet) -> Self {
        debug_assert!(pop_size > 0);
        Self {
            id,
            pop_size,
            params,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn pop_size(&self) -> usize {
        self.pop_size
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Globally unique id (and random seed) of the `index`-th patient
    pub fn patient_id(&self, index: usize) -> u64 {
        self.id * self.pop_size as u64 + index as u64
    }

    /// Simulate every patient for `n_time_steps` steps and summarize.
    pub fn simulate(&self, n_time_steps: usize) -> CohortOutcomes {
        let patients: Vec<PatientOutcome> = (0..self.pop_size)
            .into_par_iter()
            .map(|i| {
                let mut patient = Patient::new(self.patient_id(i), &self.params);
                patient.simulate(n_time_steps);
                patient.outcome()
            })
            .collect();

        let outcomes = CohortOutcomes::from_patients(&patients);
        debug!(
            cohort_id = self.id,
            pop_size = self.pop_size,
            events = outcomes.times_to_exacerbation().len(),
            mean_cost = outcomes.stat_cost().mean(),
            mean_utility = outcomes.stat_utility().mean(),
            "simulated cohort"
        );
        outcomes
    }
}

/// Patient-level outcome series of one simulated cohort
#[derive(Debug, Clone, Serialize)]
pub struct CohortOutcomes {
    stat_time_to_exacerbation: SummaryStat,
    stat_cost: SummaryStat,
    stat_utility: SummaryStat,
}

impl CohortOutcomes {
    /// Collect and summarize patient outcomes in the given order.
    ///
    /// Patients without an exacerbation contribute no event time.
    pub fn from_patients(patients: &[PatientOutcome]) -> Self {
        let times = patients
            .iter()
            .filter_map(|p| p.time_to_exacerbation)
            .collect();
        let costs = patients.iter().map(|p| p.discounted_cost).collect();
        let utilities = patients.iter().map(|p| p.discounted_utility).collect();

        Self {
            stat_time_to_exacerbation: SummaryStat::new("Time until asthma exacerbation", times),
            stat_cost: SummaryStat::new("Discounted cost", costs),
            stat_utility: SummaryStat::new("Discounted utility", utilities),
        }
    }

    pub fn times_to_exacerbation(&self) -> &[f64] {
        self.stat_time_to_exacerbation.data()
    }

    pub fn costs(&self) -> &[f64] {
        self.stat_cost.data()
    }

    pub fn utilities(&self) -> &[f64] {
        self.stat_utility.data()
    }

    pub fn stat_time_to_exacerbation(&self) -> &SummaryStat {
        &self.stat_time_to_exacerbation
    }

    pub fn stat_cost(&self) -> &SummaryStat {
        &self.stat_cost
    }

    pub fn stat_utility(&self) -> &SummaryStat {
        &self.stat_utility
    }

    /// Mean time to first exacerbation, `None` if no patient had one
    pub fn mean_time_to_exacerbation(&self) -> Option<f64> {
        if self.stat_time_to_exacerbation.is_empty() {
            None
        } else {
            Some(self.stat_time_to_exacerbation.mean())
        }
    }
}
