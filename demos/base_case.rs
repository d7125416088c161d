//! Base-case example
//!
//! Simulates both therapy arms as single cohorts, prints the outcome blocks
//! and writes one sample patient trajectory per arm to CSV.

use markov_cohort::report::{cohort_outcome_text, comparative_cohort_text};
use markov_cohort::{data, AgeGroup, Cohort, ParameterSet, Patient, Therapy};
use std::fs::{self, File};
use std::io::Write;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Running base-case Markov cohort simulation...\n");

    fs::create_dir_all("out")?;

    let pop_size = 2_000;
    let n_time_steps = data::SIM_TIME_STEPS;

    println!("Configuration:");
    println!("  Population per arm: {pop_size}");
    println!("  Weekly time steps: {n_time_steps}");
    println!("  Discount rate: {}", data::DISCOUNT);
    println!();

    let daily_params = ParameterSet::base_case(Therapy::Daily, AgeGroup::School, data::DISCOUNT);
    let inter_params =
        ParameterSet::base_case(Therapy::Intermittent, AgeGroup::School, data::DISCOUNT);

    let daily = Cohort::new(0, pop_size, daily_params.clone())?.simulate(n_time_steps);
    let intermittent = Cohort::new(1, pop_size, inter_params.clone())?.simulate(n_time_steps);

    println!("{}\n", cohort_outcome_text(Therapy::Daily, &daily, data::ALPHA));
    println!(
        "{}\n",
        cohort_outcome_text(Therapy::Intermittent, &intermittent, data::ALPHA)
    );
    println!(
        "{}",
        comparative_cohort_text(&daily, &intermittent, data::ALPHA)?
    );

    // patient 0 of each arm, same random stream
    let csv_path = "out/trajectories.csv";
    let mut file = File::create(csv_path)?;
    writeln!(file, "step,daily_state,intermittent_state")?;

    let daily_path = Patient::new(0, &daily_params).simulate_trajectory(n_time_steps);
    let inter_path = Patient::new(0, &inter_params).simulate_trajectory(n_time_steps);
    for (step, (d, i)) in daily_path.iter().zip(&inter_path).enumerate() {
        writeln!(file, "{},{},{}", step, d.label(), i.label())?;
    }

    println!("\nCSV output written to: {}", csv_path);
    println!("Done!");

    Ok(())
}
