//! Markov cohort simulation of inhaled-corticosteroid therapy for asthma
//!
//! Patients move weekly between WELL, SUBOPTIMAL and EXACERBATION states.
//! A [`Cohort`] simulates a population under one fixed [`ParameterSet`];
//! a [`MultiCohort`] repeats that for independently sampled parameter sets
//! to propagate parameter uncertainty into the outcome estimates.

pub mod cohort;
pub mod config;
pub mod data;
pub mod distributions;
pub mod generator;
pub mod logging;
pub mod multi_cohort;
pub mod params;
pub mod patient;
pub mod report;
pub mod state;
pub mod stats;

use thiserror::Error;

// Re-export main types
pub use cohort::{Cohort, CohortOutcomes};
pub use config::RunConfig;
pub use distributions::{fit_beta_moments, ParamDistribution, ParamSampler};
pub use generator::{normalize_row, ParameterGenerator, ParameterSource, TherapyDistributions};
pub use multi_cohort::{MultiCohort, MultiCohortOutcomes};
pub use params::{AgeGroup, ParameterSet, Therapy, TransitionMatrix};
pub use patient::{MarkovJump, Patient, PatientStateMonitor};
pub use state::HealthState;
pub use stats::{DifferenceStat, IntervalKind, SummaryStat};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid distribution: {0}")]
    InvalidDistribution(String),
    #[error("{context} length mismatch: expected {expected}, got {got}")]
    LengthMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("transition matrix row {row} is not a probability distribution: {reason}")]
    InvalidTransitionRow { row: usize, reason: String },
    #[error("{0} interval is not available for this statistic")]
    UnsupportedInterval(&'static str),
}
