use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use markov_cohort::logging::init_tracing;
use markov_cohort::report::{
    cohort_outcome_text, comparative_cohort_text, comparative_multi_cohort_text,
    create_timestamped_output_dir, multi_cohort_outcome_text, write_cohort_csv,
    write_event_times_csv, write_multi_cohort_csv, write_summary_json, RunSummary,
    TherapySummary,
};
use markov_cohort::{
    Cohort, CohortOutcomes, MultiCohort, MultiCohortOutcomes, ParameterGenerator, ParameterSet,
    RunConfig, Therapy,
};

#[derive(Debug, Parser)]
#[command(name = "markov-cohort")]
#[command(about = "Markov cohort simulation of daily vs intermittent ICS therapy for asthma")]
struct Cli {
    /// TOML run configuration; built-in defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true, default_value = "output-markov-cohort")]
    outdir: PathBuf,

    /// Print results without writing CSV/JSON files
    #[arg(long, global = true, default_value_t = false)]
    no_export: bool,

    #[arg(long, global = true)]
    n_time_steps: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Simulate one therapy as a single base-case cohort
    Run {
        #[arg(long, value_enum, default_value_t = TherapyArg::Daily)]
        therapy: TherapyArg,

        #[arg(long)]
        pop_size: Option<usize>,

        #[arg(long, default_value_t = 1)]
        cohort_id: u64,
    },
    /// Simulate both therapies as base-case cohorts and compare them
    Compare {
        #[arg(long)]
        pop_size: Option<usize>,
    },
    /// Probabilistic sensitivity analysis over sampled parameter sets
    Sensitivity {
        #[arg(long)]
        n_cohorts: Option<usize>,

        #[arg(long)]
        pop_size: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TherapyArg {
    Daily,
    Intermittent,
}

impl From<TherapyArg> for Therapy {
    fn from(arg: TherapyArg) -> Self {
        match arg {
            TherapyArg::Daily => Therapy::Daily,
            TherapyArg::Intermittent => Therapy::Intermittent,
        }
    }
}

fn load_config(cli: &Cli) -> Result<RunConfig> {
    let mut config = match &cli.config {
        Some(path) => RunConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RunConfig::default(),
    };

    if let Some(n_time_steps) = cli.n_time_steps {
        config.n_time_steps = n_time_steps;
    }
    match cli.command {
        Command::Run { pop_size, .. } | Command::Compare { pop_size } => {
            if let Some(pop_size) = pop_size {
                config.base_case.pop_size = pop_size;
            }
        }
        Command::Sensitivity {
            n_cohorts,
            pop_size,
        } => {
            if let Some(n_cohorts) = n_cohorts {
                config.sensitivity.n_cohorts = n_cohorts;
            }
            if let Some(pop_size) = pop_size {
                config.sensitivity.pop_size = pop_size;
            }
        }
    }

    config.validate().context("invalid run configuration")?;
    Ok(config)
}

fn simulate_base_case(config: &RunConfig, therapy: Therapy, cohort_id: u64) -> Result<CohortOutcomes> {
    let params = ParameterSet::base_case(therapy, config.age_group, config.discount_rate);
    let cohort = Cohort::new(cohort_id, config.base_case.pop_size, params)
        .with_context(|| format!("failed to build {} cohort", therapy.slug()))?;
    info!(
        therapy = therapy.slug(),
        cohort_id,
        pop_size = config.base_case.pop_size,
        n_time_steps = config.n_time_steps,
        "simulating base-case cohort"
    );
    Ok(cohort.simulate(config.n_time_steps))
}

fn simulate_sensitivity(config: &RunConfig, therapy: Therapy) -> Result<MultiCohortOutcomes> {
    let distributions = config.sensitivity.distributions_for(therapy);
    let generator =
        ParameterGenerator::with_distributions(therapy, &distributions, config.discount_rate)
            .with_context(|| format!("failed to build {} parameter generator", therapy.slug()))?;
    let multi = MultiCohort::new(
        config.sensitivity.n_cohorts,
        config.sensitivity.pop_size,
        generator,
    )
    .with_context(|| format!("failed to build {} multi-cohort", therapy.slug()))?;
    Ok(multi.simulate(config.n_time_steps))
}

fn export_cohort(dir: &Path, therapy: Therapy, outcomes: &CohortOutcomes) -> Result<()> {
    write_cohort_csv(&dir.join(format!("{}_patients.csv", therapy.slug())), outcomes)
        .context("failed to write patient outcomes")?;
    write_event_times_csv(
        &dir.join(format!("{}_exacerbation_times.csv", therapy.slug())),
        outcomes,
    )
    .context("failed to write exacerbation times")?;
    Ok(())
}

fn export_summary(dir: &Path, summary: &RunSummary) -> Result<()> {
    write_summary_json(&dir.join("summary.json"), summary).context("failed to write summary")?;
    println!("wrote {}", dir.display());
    Ok(())
}

fn run_single(cli: &Cli, config: &RunConfig, therapy: Therapy, cohort_id: u64) -> Result<()> {
    let outcomes = simulate_base_case(config, therapy, cohort_id)?;
    println!("{}", cohort_outcome_text(therapy, &outcomes, config.alpha));

    if !cli.no_export {
        let dir = create_timestamped_output_dir(&cli.outdir)?;
        export_cohort(&dir, therapy, &outcomes)?;
        let summary = RunSummary::new(
            "run",
            config,
            vec![TherapySummary::from_cohort(therapy, &outcomes, config.alpha)],
        );
        export_summary(&dir, &summary)?;
    }
    Ok(())
}

fn run_compare(cli: &Cli, config: &RunConfig) -> Result<()> {
    let daily = simulate_base_case(config, Therapy::Daily, 0)?;
    let intermittent = simulate_base_case(config, Therapy::Intermittent, 1)?;

    println!("{}\n", cohort_outcome_text(Therapy::Daily, &daily, config.alpha));
    println!(
        "{}\n",
        cohort_outcome_text(Therapy::Intermittent, &intermittent, config.alpha)
    );
    println!(
        "{}",
        comparative_cohort_text(&daily, &intermittent, config.alpha)?
    );

    if !cli.no_export {
        let dir = create_timestamped_output_dir(&cli.outdir)?;
        export_cohort(&dir, Therapy::Daily, &daily)?;
        export_cohort(&dir, Therapy::Intermittent, &intermittent)?;
        let summary = RunSummary::new(
            "compare",
            config,
            vec![
                TherapySummary::from_cohort(Therapy::Daily, &daily, config.alpha),
                TherapySummary::from_cohort(Therapy::Intermittent, &intermittent, config.alpha),
            ],
        );
        export_summary(&dir, &summary)?;
    }
    Ok(())
}

fn run_sensitivity(cli: &Cli, config: &RunConfig) -> Result<()> {
    let daily = simulate_sensitivity(config, Therapy::Daily)?;
    let intermittent = simulate_sensitivity(config, Therapy::Intermittent)?;

    println!(
        "{}\n",
        multi_cohort_outcome_text(Therapy::Daily, &daily, config.alpha)
    );
    println!(
        "{}\n",
        multi_cohort_outcome_text(Therapy::Intermittent, &intermittent, config.alpha)
    );
    println!(
        "{}",
        comparative_multi_cohort_text(&daily, &intermittent, config.alpha)?
    );

    if !cli.no_export {
        let dir = create_timestamped_output_dir(&cli.outdir)?;
        for (therapy, outcomes) in [
            (Therapy::Daily, &daily),
            (Therapy::Intermittent, &intermittent),
        ] {
            write_multi_cohort_csv(
                &dir.join(format!("{}_cohort_means.csv", therapy.slug())),
                outcomes,
            )
            .context("failed to write cohort means")?;
        }
        let summary = RunSummary::new(
            "sensitivity",
            config,
            vec![
                TherapySummary::from_multi_cohort(Therapy::Daily, &daily, config.alpha),
                TherapySummary::from_multi_cohort(
                    Therapy::Intermittent,
                    &intermittent,
                    config.alpha,
                ),
            ],
        );
        export_summary(&dir, &summary)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Command::Run {
            therapy, cohort_id, ..
        } => run_single(&cli, &config, therapy.into(), cohort_id),
        Command::Compare { .. } => run_compare(&cli, &config),
        Command::Sensitivity { .. } => run_sensitivity(&cli, &config),
    }
}
