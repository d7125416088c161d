use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data;
use crate::generator::TherapyDistributions;
use crate::params::{AgeGroup, Therapy};
use crate::ModelError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub n_time_steps: usize,
    pub alpha: f64,
    pub discount_rate: f64,
    pub age_group: AgeGroup,
    pub base_case: BaseCaseConfig,
    pub sensitivity: SensitivityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseCaseConfig {
    pub pop_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityConfig {
    pub n_cohorts: usize,
    pub pop_size: usize,
    /// Replaces the built-in distribution library of the daily arm
    pub daily: Option<TherapyDistributions>,
    /// Replaces the built-in distribution library of the intermittent arm
    pub intermittent: Option<TherapyDistributions>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            n_time_steps: data::SIM_TIME_STEPS,
            alpha: data::ALPHA,
            discount_rate: data::DISCOUNT,
            age_group: AgeGroup::School,
            base_case: BaseCaseConfig::default(),
            sensitivity: SensitivityConfig::default(),
        }
    }
}

impl Default for BaseCaseConfig {
    fn default() -> Self {
        Self {
            pop_size: data::POP_SIZE,
        }
    }
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            n_cohorts: data::N_COHORTS,
            pop_size: data::PSA_POP_SIZE,
            daily: None,
            intermittent: None,
        }
    }
}

impl SensitivityConfig {
    pub fn distributions_for(&self, therapy: Therapy) -> TherapyDistributions {
        let configured = match therapy {
            Therapy::Daily => self.daily.as_ref(),
            Therapy::Intermittent => self.intermittent.as_ref(),
        };
        configured
            .cloned()
            .unwrap_or_else(|| TherapyDistributions::for_therapy(therapy))
    }
}

impl RunConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ModelError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ModelError> {
        let config: RunConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.n_time_steps == 0 {
            return Err(ModelError::InvalidConfig(
                "n_time_steps must be greater than zero".to_string(),
            ));
        }

        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(ModelError::InvalidConfig(
                "alpha must be in (0, 1)".to_string(),
            ));
        }

        if !self.discount_rate.is_finite() || self.discount_rate < 0.0 {
            return Err(ModelError::InvalidConfig(
                "discount_rate must be finite and >= 0".to_string(),
            ));
        }

        if self.base_case.pop_size == 0 {
            return Err(ModelError::InvalidConfig(
                "base_case.pop_size must be greater than zero".to_string(),
            ));
        }

        if self.sensitivity.n_cohorts == 0 {
            return Err(ModelError::InvalidConfig(
                "sensitivity.n_cohorts must be greater than zero".to_string(),
            ));
        }

        if self.sensitivity.pop_size == 0 {
            return Err(ModelError::InvalidConfig(
                "sensitivity.pop_size must be greater than zero".to_string(),
            ));
        }

        for distributions in [&self.sensitivity.daily, &self.sensitivity.intermittent]
            .into_iter()
            .flatten()
        {
            distributions.validate()?;
        }

        Ok(())
    }

    /// `(1 - alpha)` as a whole percentage, e.g. `95`
    pub fn coverage_percent(&self) -> f64 {
        ((1.0 - self.alpha) * 100.0).round()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::ParamDistribution;

    #[test]
    fn defaults_are_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.n_time_steps, 52);
        assert_eq!(config.sensitivity.n_cohorts, 1000);
        assert_eq!(config.sensitivity.pop_size, 259);
        assert_eq!(config.coverage_percent(), 95.0);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = RunConfig::from_toml_str(
            "discount_rate = 0.03\nage_group = \"preschool\"\n[sensitivity]\nn_cohorts = 20\n",
        )
        .unwrap();
        assert_eq!(config.discount_rate, 0.03);
        assert_eq!(config.age_group, AgeGroup::Preschool);
        assert_eq!(config.sensitivity.n_cohorts, 20);
        assert_eq!(config.sensitivity.pop_size, 259);
        assert_eq!(config.base_case.pop_size, 10_000);
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/default.toml");
        assert_eq!(RunConfig::from_toml_file(&path).unwrap(), RunConfig::default());
    }

    #[test]
    fn rejects_invalid_alpha() {
        assert!(matches!(
            RunConfig::from_toml_str("alpha = 1.5"),
            Err(ModelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_zero_population() {
        assert!(RunConfig::from_toml_str("[base_case]\npop_size = 0").is_err());
    }

    #[test]
    fn distribution_override_replaces_default_library() {
        let mut config = RunConfig::default();
        let mut custom = TherapyDistributions::for_therapy(Therapy::Daily);
        custom.annual_treatment_cost = Some(ParamDistribution::Fixed { value: 5.0 });
        config.sensitivity.daily = Some(custom.clone());

        assert_eq!(config.sensitivity.distributions_for(Therapy::Daily), custom);
        assert_eq!(
            config.sensitivity.distributions_for(Therapy::Intermittent),
            TherapyDistributions::for_therapy(Therapy::Intermittent)
        );
    }
}
