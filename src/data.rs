//! Fixed model inputs
//!
//! Weekly transition matrices per age group and therapy, weekly state costs,
//! and state utilities. Rows and entries follow [`crate::HealthState`] order.

/// Cohort population size for the base-case analysis
pub const POP_SIZE: usize = 10_000;
/// Number of weekly cycles simulated
pub const SIM_TIME_STEPS: usize = 52;
/// Significance level for reported intervals
pub const ALPHA: f64 = 0.05;
/// Discount rate
pub const DISCOUNT: f64 = 0.0;

/// Number of cohorts in the probabilistic sensitivity analysis
pub const N_COHORTS: usize = 1000;
/// Population of each cohort in the probabilistic sensitivity analysis
pub const PSA_POP_SIZE: usize = 259;

pub type Matrix3 = [[f64; 3]; 3];

/// School children, daily ICS
pub const S_TRANS_MATRIX_DAILY: Matrix3 = [
    [0.933, 0.058, 0.009],
    [0.887, 0.097, 0.016],
    [0.255, 0.733, 0.012],
];

/// School children, intermittent ICS
pub const S_TRANS_MATRIX_INTERMITTENT: Matrix3 = [
    [0.858, 0.132, 0.010],
    [0.817, 0.160, 0.023],
    [0.105, 0.878, 0.017],
];

/// Preschool children, daily ICS
pub const PS_TRANS_MATRIX_DAILY: Matrix3 = [
    [0.810, 0.181, 0.009],
    [0.520, 0.464, 0.016],
    [0.255, 0.723, 0.022],
];

/// Preschool children, intermittent ICS
pub const PS_TRANS_MATRIX_INTERMITTENT: Matrix3 = [
    [0.780, 0.210, 0.010],
    [0.450, 0.529, 0.021],
    [0.105, 0.876, 0.019],
];

pub const S_HEALTH_COST_DAILY: [f64; 3] = [2.51, 33.23, 397.40];
pub const S_HEALTH_COST_INTERMITTENT: [f64; 3] = [2.11, 32.83, 397.40];
pub const PS_HEALTH_COST_DAILY: [f64; 3] = [2.70, 33.42, 397.59];
pub const PS_HEALTH_COST_INTERMITTENT: [f64; 3] = [2.11, 32.83, 397.59];

/// Health utility of each state, shared by both therapies and age groups
pub const ANNUAL_STATE_UTILITY: [f64; 3] = [0.989, 0.705, 0.275];
