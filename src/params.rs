//! Model parameters
//!
//! A [`ParameterSet`] is the immutable input bundle for one cohort run. It is
//! either the deterministic base case for a therapy and age group, or a draw
//! from a [`crate::ParameterGenerator`].

use serde::{Deserialize, Serialize};

use crate::data;
use crate::state::HealthState;
use crate::ModelError;

/// Daily vs intermittent inhaled-corticosteroid therapy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Therapy {
    Daily,
    Intermittent,
}

impl Therapy {
    pub const ALL: [Therapy; 2] = [Therapy::Daily, Therapy::Intermittent];

    pub fn label(self) -> &'static str {
        match self {
            Therapy::Daily => "Daily ICS Therapy",
            Therapy::Intermittent => "Intermittent ICS Therapy",
        }
    }

    /// Short identifier used in file names
    pub fn slug(self) -> &'static str {
        match self {
            Therapy::Daily => "daily",
            Therapy::Intermittent => "intermittent",
        }
    }
}

/// Patient population the canonical tables were estimated for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeGroup {
    #[default]
    School,
    Preschool,
}

/// Row-stochastic matrix over [`HealthState`]s
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionMatrix {
    rows: Vec<Vec<f64>>,
}

impl TransitionMatrix {
    /// Allowed deviation of a row sum from 1
    pub const ROW_SUM_TOLERANCE: f64 = 1e-9;

    /// Build a validated matrix
    ///
    /// Fails unless the matrix is `HealthState::COUNT` square and every row
    /// is a probability distribution.
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self, ModelError> {
        if rows.len() != HealthState::COUNT {
            return Err(ModelError::LengthMismatch {
                context: "transition matrix rows",
                expected: HealthState::COUNT,
                got: rows.len(),
            });
        }

        for (i, row) in rows.iter().enumerate() {
            if row.len() != HealthState::COUNT {
                return Err(ModelError::LengthMismatch {
                    context: "transition matrix columns",
                    expected: HealthState::COUNT,
                    got: row.len(),
                });
            }
            if let Some(p) = row.iter().find(|p| !p.is_finite() || **p < 0.0) {
                return Err(ModelError::InvalidTransitionRow {
                    row: i,
                    reason: format!("entry {p} is not a finite non-negative probability"),
                });
            }
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > Self::ROW_SUM_TOLERANCE {
                return Err(ModelError::InvalidTransitionRow {
                    row: i,
                    reason: format!("row sums to {sum}"),
                });
            }
        }

        Ok(Self { rows })
    }

    /// Wrap rows that are row-stochastic by construction.
    pub(crate) fn from_rows_unchecked(rows: Vec<Vec<f64>>) -> Self {
        debug_assert_eq!(rows.len(), HealthState::COUNT);
        Self { rows }
    }

    pub fn from_array(matrix: data::Matrix3) -> Self {
        Self::from_rows_unchecked(matrix.iter().map(|row| row.to_vec()).collect())
    }

    /// Canonical matrix for a therapy arm and age group
    pub fn canonical(therapy: Therapy, age_group: AgeGroup) -> Self {
        let matrix = match (age_group, therapy) {
            (AgeGroup::School, Therapy::Daily) => data::S_TRANS_MATRIX_DAILY,
            (AgeGroup::School, Therapy::Intermittent) => data::S_TRANS_MATRIX_INTERMITTENT,
            (AgeGroup::Preschool, Therapy::Daily) => data::PS_TRANS_MATRIX_DAILY,
            (AgeGroup::Preschool, Therapy::Intermittent) => data::PS_TRANS_MATRIX_INTERMITTENT,
        };
        Self::from_array(matrix)
    }

    pub fn row(&self, state: HealthState) -> &[f64] {
        &self.rows[state.index()]
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn get(&self, from: HealthState, to: HealthState) -> f64 {
        self.rows[from.index()][to.index()]
    }
}

/// Inputs for simulating one cohort
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSet {
    therapy: Therapy,
    initial_state: HealthState,
    annual_state_costs: Vec<f64>,
    annual_state_utilities: Vec<f64>,
    annual_treatment_cost: f64,
    discount_rate: f64,
    transition_matrix: TransitionMatrix,
}

impl ParameterSet {
    /// Build a validated parameter set
    pub fn new(
        therapy: Therapy,
        initial_state: HealthState,
        transition_matrix: TransitionMatrix,
        annual_state_costs: Vec<f64>,
        annual_state_utilities: Vec<f64>,
        annual_treatment_cost: f64,
        discount_rate: f64,
    ) -> Result<Self, ModelError> {
        check_table("annual state costs", &annual_state_costs)?;
        check_table("annual state utilities", &annual_state_utilities)?;
        if !annual_treatment_cost.is_finite() {
            return Err(ModelError::InvalidConfig(
                "annual treatment cost must be finite".to_string(),
            ));
        }
        if !discount_rate.is_finite() || discount_rate < 0.0 {
            return Err(ModelError::InvalidConfig(
                "discount rate must be finite and >= 0".to_string(),
            ));
        }

        Ok(Self {
            therapy,
            initial_state,
            annual_state_costs,
            annual_state_utilities,
            annual_treatment_cost,
            discount_rate,
            transition_matrix,
        })
    }

    /// Deterministic base-case inputs for a therapy and age group
    pub fn base_case(therapy: Therapy, age_group: AgeGroup, discount_rate: f64) -> Self {
        let costs = match (age_group, therapy) {
            (AgeGroup::School, Therapy::Daily) => data::S_HEALTH_COST_DAILY,
            (AgeGroup::School, Therapy::Intermittent) => data::S_HEALTH_COST_INTERMITTENT,
            (AgeGroup::Preschool, Therapy::Daily) => data::PS_HEALTH_COST_DAILY,
            (AgeGroup::Preschool, Therapy::Intermittent) => data::PS_HEALTH_COST_INTERMITTENT,
        };

        Self {
            therapy,
            initial_state: HealthState::Well,
            annual_state_costs: costs.to_vec(),
            annual_state_utilities: data::ANNUAL_STATE_UTILITY.to_vec(),
            annual_treatment_cost: 0.0,
            discount_rate,
            transition_matrix: TransitionMatrix::canonical(therapy, age_group),
        }
    }

    /// Assemble a sampled set whose tables are sized and row-normalized by
    /// the generator.
    pub(crate) fn sampled(
        therapy: Therapy,
        transition_matrix: TransitionMatrix,
        annual_state_costs: Vec<f64>,
        annual_state_utilities: Vec<f64>,
        discount_rate: f64,
    ) -> Self {
        Self {
            therapy,
            initial_state: HealthState::Well,
            annual_state_costs,
            annual_state_utilities,
            annual_treatment_cost: 0.0,
            discount_rate,
            transition_matrix,
        }
    }

    pub fn therapy(&self) -> Therapy {
        self.therapy
    }

    pub fn initial_state(&self) -> HealthState {
        self.initial_state
    }

    pub fn annual_state_cost(&self, state: HealthState) -> f64 {
        self.annual_state_costs[state.index()]
    }

    pub fn annual_state_utility(&self, state: HealthState) -> f64 {
        self.annual_state_utilities[state.index()]
    }

    pub fn annual_state_costs(&self) -> &[f64] {
        &self.annual_state_costs
    }

    pub fn annual_state_utilities(&self) -> &[f64] {
        &self.annual_state_utilities
    }

    pub fn annual_treatment_cost(&self) -> f64 {
        self.annual_treatment_cost
    }

    pub fn discount_rate(&self) -> f64 {
        self.discount_rate
    }

    pub fn transition_matrix(&self) -> &TransitionMatrix {
        &self.transition_matrix
    }
}

fn check_table(context: &'static str, values: &[f64]) -> Result<(), ModelError> {
    if values.len() != HealthState::COUNT {
        return Err(ModelError::LengthMismatch {
            context,
            expected: HealthState::COUNT,
            got: values.len(),
        });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::InvalidConfig(format!(
            "{context} must be finite"
        )));
    }
    Ok(())
}
