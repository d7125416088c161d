use std::collections::HashSet;

use proptest::prelude::*;

use markov_cohort::{
    normalize_row, AgeGroup, Cohort, HealthState, MarkovJump, ParameterGenerator, ParameterSet,
    ParameterSource, Patient, Therapy,
};

fn therapy_strategy() -> impl Strategy<Value = Therapy> {
    prop_oneof![Just(Therapy::Daily), Just(Therapy::Intermittent)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn generated_rows_are_distributions(seed in any::<u64>(), therapy in therapy_strategy()) {
        let generator = ParameterGenerator::new(therapy, 0.0).unwrap();
        let params = generator.get_new_parameters(seed);
        for row in params.transition_matrix().rows() {
            prop_assert!(row.iter().all(|p| *p >= 0.0));
            let sum: f64 = row.iter().sum();
            prop_assert!((sum - 1.0).abs() <= 1e-9, "row sums to {}", sum);
        }
    }

    #[test]
    fn generator_is_deterministic(seed in any::<u64>(), therapy in therapy_strategy()) {
        let generator = ParameterGenerator::new(therapy, 0.03).unwrap();
        prop_assert_eq!(
            generator.get_new_parameters(seed),
            generator.get_new_parameters(seed)
        );
    }

    #[test]
    fn patient_replay_is_identical(id in any::<u64>(), steps in 0usize..80) {
        let params = ParameterSet::base_case(Therapy::Daily, AgeGroup::Preschool, 0.03);
        let mut first = Patient::new(id, &params);
        let mut second = Patient::new(id, &params);
        prop_assert_eq!(first.simulate_trajectory(steps), second.simulate_trajectory(steps));
        prop_assert_eq!(first.outcome(), second.outcome());
    }

    #[test]
    fn first_passage_is_half_step_after_first_entry(id in any::<u64>(), steps in 1usize..80) {
        let params = ParameterSet::base_case(Therapy::Intermittent, AgeGroup::School, 0.0);
        let mut patient = Patient::new(id, &params);
        let path = patient.simulate_trajectory(steps);

        let first_entry = path
            .windows(2)
            .position(|w| !w[0].is_disease_active() && w[1].is_disease_active());
        prop_assert_eq!(
            patient.outcome().time_to_exacerbation,
            first_entry.map(|k| k as f64 + 0.5)
        );
    }

    #[test]
    fn undiscounted_cost_is_plain_step_sum(id in any::<u64>(), steps in 1usize..60) {
        let params = ParameterSet::base_case(Therapy::Daily, AgeGroup::School, 0.0);
        let mut patient = Patient::new(id, &params);
        let path = patient.simulate_trajectory(steps);

        let mut expected = 0.0;
        for w in path.windows(2) {
            expected += 0.5 * (params.annual_state_cost(w[0]) + params.annual_state_cost(w[1]))
                + params.annual_treatment_cost();
        }
        prop_assert_eq!(patient.outcome().discounted_cost, expected);
    }

    #[test]
    fn patient_ids_are_unique_across_cohorts(n_cohorts in 1u64..40, pop_size in 1usize..40) {
        let params = ParameterSet::base_case(Therapy::Daily, AgeGroup::School, 0.0);
        let mut seen = HashSet::new();
        for id in 0..n_cohorts {
            let cohort = Cohort::new(id, pop_size, params.clone()).unwrap();
            for i in 0..pop_size {
                prop_assert!(seen.insert(cohort.patient_id(i)));
            }
        }
        prop_assert_eq!(seen.len(), n_cohorts as usize * pop_size);
    }

    #[test]
    fn normalized_rows_sum_to_one(row in prop::collection::vec(0.001f64..1.0, 1..6)) {
        let mut row = row;
        normalize_row(&mut row);
        let sum: f64 = row.iter().sum();
        prop_assert!((sum - 1.0).abs() <= 1e-9);
    }

    #[test]
    fn jump_never_lands_on_zero_probability_state(u in 0.0f64..=1.0) {
        let params = ParameterSet::base_case(Therapy::Daily, AgeGroup::School, 0.0);
        let jump = MarkovJump::new(params.transition_matrix());
        for state in HealthState::ALL {
            let next = jump.state_for_draw(state, u);
            prop_assert!(u == 0.0 || params.transition_matrix().get(state, next) > 0.0);
        }
    }
}
