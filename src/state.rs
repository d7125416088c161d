//! Health states
//!
//! The model tracks three ordered states. Each state's index addresses the
//! rows/columns of the transition matrix and the cost and utility tables.

use serde::{Deserialize, Serialize};

/// Health state of a patient
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// Symptoms controlled
    #[default]
    Well,
    /// Suboptimal control
    Suboptimal,
    /// Disease-active state (asthma exacerbation)
    Exacerbation,
}

impl HealthState {
    /// Number of states
    pub const COUNT: usize = 3;

    /// All states in index order
    pub const ALL: [HealthState; Self::COUNT] = [
        HealthState::Well,
        HealthState::Suboptimal,
        HealthState::Exacerbation,
    ];

    /// Stable table index of this state
    pub fn index(self) -> usize {
        match self {
            HealthState::Well => 0,
            HealthState::Suboptimal => 1,
            HealthState::Exacerbation => 2,
        }
    }

    /// State for a table index, `None` when out of range
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn is_disease_active(self) -> bool {
        self == HealthState::Exacerbation
    }

    pub fn label(self) -> &'static str {
        match self {
            HealthState::Well => "WELL",
            HealthState::Suboptimal => "SUBOPTIMAL",
            HealthState::Exacerbation => "EXACERBATION",
        }
    }
}
