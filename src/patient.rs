//! Patient-level Markov simulation
//!
//! A [`Patient`] walks the transition matrix of its [`ParameterSet`] for a
//! fixed number of weekly steps using a random stream seeded by its id. The
//! [`PatientStateMonitor`] records the first exacerbation and accrues
//! half-cycle-corrected, discounted cost and utility.

use rand::distributions::OpenClosed01;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::params::{ParameterSet, TransitionMatrix};
use crate::state::HealthState;

/// Discrete inverse-CDF sampler over transition-matrix rows
#[derive(Debug, Clone, Copy)]
pub struct MarkovJump<'a> {
    matrix: &'a TransitionMatrix,
}

impl<'a> MarkovJump<'a> {
    pub fn new(matrix: &'a TransitionMatrix) -> Self {
        Self { matrix }
    }

    /// Sample the state after one step from `current`.
    pub fn next_state<R: Rng + ?Sized>(&self, current: HealthState, rng: &mut R) -> HealthState {
        let u: f64 = rng.sample(OpenClosed01);
        self.state_for_draw(current, u)
    }

    /// Invert the cumulative distribution of row `current` at `u`.
    ///
    /// The first state whose cumulative probability reaches `u` wins. If
    /// rounding leaves the row total below `u`, the last reachable state is
    /// returned.
    pub fn state_for_draw(&self, current: HealthState, u: f64) -> HealthState {
        let row = self.matrix.row(current);
        let mut cumulative = 0.0;
        for (j, p) in row.iter().enumerate() {
            cumulative += p;
            if cumulative >= u {
                return HealthState::ALL[j];
            }
        }

        row.iter()
            .rposition(|p| *p > 0.0)
            .map_or(current, |j| HealthState::ALL[j])
    }
}

/// Running discounted cost and utility of one patient
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostUtilityMonitor {
    total_discounted_cost: f64,
    total_discounted_utility: f64,
}

impl CostUtilityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accrue the step from `current` to `next` taken at step `k`.
    pub fn update(
        &mut self,
        params: &ParameterSet,
        k: usize,
        current: HealthState,
        next: HealthState,
    ) {
        let cost = 0.5 * (params.annual_state_cost(current) + params.annual_state_cost(next))
            + params.annual_treatment_cost();
        let utility =
            0.5 * (params.annual_state_utility(current) + params.annual_state_utility(next));

        // mid-step discounting at half the rate over 2k+1 half periods
        let rate = params.discount_rate() / 2.0;
        let period = (2 * k + 1) as f64;
        self.total_discounted_cost += present_value(cost, rate, period);
        self.total_discounted_utility += present_value(utility, rate, period);
    }

    pub fn total_discounted_cost(&self) -> f64 {
        self.total_discounted_cost
    }

    pub fn total_discounted_utility(&self) -> f64 {
        self.total_discounted_utility
    }
}

/// Present value of a single payment made after `period` periods
pub fn present_value(payment: f64, rate: f64, period: f64) -> f64 {
    payment / (1.0 + rate).powf(period)
}

/// Current state, first exacerbation time and accrued outcomes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatientStateMonitor {
    current_state: HealthState,
    time_to_exacerbation: Option<f64>,
    cost_utility: CostUtilityMonitor,
}

impl PatientStateMonitor {
    pub fn new(initial_state: HealthState) -> Self {
        Self {
            current_state: initial_state,
            time_to_exacerbation: None,
            cost_utility: CostUtilityMonitor::new(),
        }
    }

    /// Record the transition to `new_state` taken at step `k`.
    pub fn update(&mut self, params: &ParameterSet, k: usize, new_state: HealthState) {
        if self.time_to_exacerbation.is_none()
            && !self.current_state.is_disease_active()
            && new_state.is_disease_active()
        {
            self.time_to_exacerbation = Some(k as f64 + 0.5);
        }

        self.cost_utility.update(params, k, self.current_state, new_state);
        self.current_state = new_state;
    }

    pub fn current_state(&self) -> HealthState {
        self.current_state
    }

    /// Half-cycle-corrected time of first entry into EXACERBATION
    pub fn time_to_exacerbation(&self) -> Option<f64> {
        self.time_to_exacerbation
    }

    pub fn cost_utility(&self) -> &CostUtilityMonitor {
        &self.cost_utility
    }
}

/// Outcome of one simulated patient
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PatientOutcome {
    pub id: u64,
    pub time_to_exacerbation: Option<f64>,
    pub discounted_cost: f64,
    pub discounted_utility: f64,
}

/// One simulated individual
#[derive(Debug, Clone)]
pub struct Patient<'a> {
    id: u64,
    params: &'a ParameterSet,
    monitor: PatientStateMonitor,
}

impl<'a> Patient<'a> {
    /// Create a patient; `id` is also the seed of its random stream.
    pub fn new(id: u64, params: &'a ParameterSet) -> Self {
        Self {
            id,
            params,
            monitor: PatientStateMonitor::new(params.initial_state()),
        }
    }

    /// Advance the patient through exactly `n_time_steps` transitions.
    pub fn simulate(&mut self, n_time_steps: usize) {
        self.run(n_time_steps, |_| {});
    }

    /// Like [`Patient::simulate`], returning the visited states including
    /// the initial one.
    pub fn simulate_trajectory(&mut self, n_time_steps: usize) -> Vec<HealthState> {
        let mut path = Vec::with_capacity(n_time_steps + 1);
        path.push(self.monitor.current_state());
        self.run(n_time_steps, |state| path.push(state));
        path
    }

    fn run(&mut self, n_time_steps: usize, mut on_step: impl FnMut(HealthState)) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.id);
        let jump = MarkovJump::new(self.params.transition_matrix());

        for k in 0..n_time_steps {
            let next = jump.next_state(self.monitor.current_state(), &mut rng);
            self.monitor.update(self.params, k, next);
            on_step(next);
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state_monitor(&self) -> &PatientStateMonitor {
        &self.monitor
    }

    pub fn outcome(&self) -> PatientOutcome {
        PatientOutcome {
            id: self.id,
            time_to_exacerbation: self.monitor.time_to_exacerbation(),
            discounted_cost: self.monitor.cost_utility().total_discounted_cost(),
            discounted_utility: self.monitor.cost_utility().total_discounted_utility(),
        }
    }
}
