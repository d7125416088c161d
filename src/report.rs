//! Outcome reporting: console text blocks, CSV series and a JSON summary.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use csv::Writer;
use serde::Serialize;

use crate::cohort::CohortOutcomes;
use crate::config::RunConfig;
use crate::multi_cohort::MultiCohortOutcomes;
use crate::params::Therapy;
use crate::stats::{DifferenceStat, IntervalKind, SummaryStat};
use crate::ModelError;

/// Decimal places and grouping used when printing one outcome.
#[derive(Debug, Clone, Copy)]
struct Precision {
    decimals: usize,
    thousands: bool,
}

const TWO_DECIMALS: Precision = Precision {
    decimals: 2,
    thousands: false,
};
const WHOLE_CURRENCY: Precision = Precision {
    decimals: 0,
    thousands: true,
};
const CURRENCY: Precision = Precision {
    decimals: 2,
    thousands: true,
};

fn coverage(alpha: f64) -> String {
    format!("{:.0}%", (1.0 - alpha) * 100.0)
}

fn interval_noun(kind: IntervalKind) -> &'static str {
    match kind {
        IntervalKind::Confidence => "confidence",
        IntervalKind::Prediction => "uncertainty",
    }
}

fn estimate_line(
    subject: &str,
    stat: &SummaryStat,
    kind: IntervalKind,
    alpha: f64,
    precision: Precision,
) -> String {
    format!(
        "  Estimate of {subject} and {} {} interval: {}",
        coverage(alpha),
        interval_noun(kind),
        stat.formatted_mean_and_interval(kind, alpha, precision.decimals, precision.thousands)
    )
}

fn difference_line(
    diff: &DifferenceStat,
    kind: IntervalKind,
    alpha: f64,
    precision: Precision,
) -> Result<String, ModelError> {
    Ok(format!(
        "{} and {} {} interval: {}",
        diff.name(),
        coverage(alpha),
        interval_noun(kind),
        diff.formatted_mean_and_interval(kind, alpha, precision.decimals, precision.thousands)?
    ))
}

/// Outcome block of one therapy simulated as a single cohort.
pub fn cohort_outcome_text(therapy: Therapy, outcomes: &CohortOutcomes, alpha: f64) -> String {
    let kind = IntervalKind::Confidence;
    [
        therapy.label().to_string(),
        estimate_line(
            "mean time to asthma exacerbation",
            outcomes.stat_time_to_exacerbation(),
            kind,
            alpha,
            TWO_DECIMALS,
        ),
        estimate_line(
            "discounted cost",
            outcomes.stat_cost(),
            kind,
            alpha,
            WHOLE_CURRENCY,
        ),
        estimate_line(
            "discounted utility",
            outcomes.stat_utility(),
            kind,
            alpha,
            TWO_DECIMALS,
        ),
    ]
    .join("\n")
}

/// Outcome block of one therapy simulated as a multi-cohort.
///
/// Intervals are percentile intervals over the cohort means.
pub fn multi_cohort_outcome_text(
    therapy: Therapy,
    outcomes: &MultiCohortOutcomes,
    alpha: f64,
) -> String {
    let kind = IntervalKind::Prediction;
    [
        therapy.label().to_string(),
        estimate_line(
            "mean time to asthma exacerbation",
            outcomes.stat_mean_time_to_exacerbation(),
            kind,
            alpha,
            TWO_DECIMALS,
        ),
        estimate_line(
            "mean discounted cost",
            outcomes.stat_mean_cost(),
            kind,
            alpha,
            CURRENCY,
        ),
        estimate_line(
            "mean discounted utility",
            outcomes.stat_mean_utility(),
            kind,
            alpha,
            TWO_DECIMALS,
        ),
    ]
    .join("\n")
}

/// Intermittent minus daily for two independently simulated cohorts.
pub fn comparative_cohort_text(
    daily: &CohortOutcomes,
    intermittent: &CohortOutcomes,
    alpha: f64,
) -> Result<String, ModelError> {
    let kind = IntervalKind::Confidence;
    let cost = DifferenceStat::independent(
        "Increase in mean discounted cost",
        intermittent.costs(),
        daily.costs(),
    );
    let utility = DifferenceStat::independent(
        "Increase in mean discounted utility",
        intermittent.utilities(),
        daily.utilities(),
    );

    Ok([
        difference_line(&cost, kind, alpha, CURRENCY)?,
        difference_line(&utility, kind, alpha, TWO_DECIMALS)?,
    ]
    .join("\n"))
}

/// Intermittent minus daily, paired by parameter draw.
///
/// Cohort pairs where either arm had no exacerbation are skipped for the
/// time-to-exacerbation difference.
pub fn comparative_multi_cohort_text(
    daily: &MultiCohortOutcomes,
    intermittent: &MultiCohortOutcomes,
    alpha: f64,
) -> Result<String, ModelError> {
    let kind = IntervalKind::Prediction;
    let (inter_times, daily_times) = paired_present(
        intermittent.mean_times_to_exacerbation(),
        daily.mean_times_to_exacerbation(),
    )?;

    let time = DifferenceStat::paired(
        "Increase in mean asthma exacerbation time",
        &inter_times,
        &daily_times,
    )?;
    let cost = DifferenceStat::paired(
        "Increase in mean discounted cost",
        intermittent.mean_costs(),
        daily.mean_costs(),
    )?;
    let utility = DifferenceStat::paired(
        "Increase in mean discounted utility",
        intermittent.mean_utilities(),
        daily.mean_utilities(),
    )?;

    Ok([
        difference_line(&time, kind, alpha, TWO_DECIMALS)?,
        difference_line(&cost, kind, alpha, CURRENCY)?,
        difference_line(&utility, kind, alpha, TWO_DECIMALS)?,
    ]
    .join("\n"))
}

/// Keep index pairs where both series have a value.
fn paired_present(
    x: &[Option<f64>],
    y_ref: &[Option<f64>],
) -> Result<(Vec<f64>, Vec<f64>), ModelError> {
    ensure_len("paired exacerbation times", y_ref.len(), x.len())?;
    Ok(x.iter()
        .zip(y_ref)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .unzip())
}

pub fn create_timestamped_output_dir(output_root: &Path) -> Result<PathBuf, ModelError> {
    fs::create_dir_all(output_root)?;

    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let mut output_dir = output_root.join(&timestamp);
    let mut counter = 1_u32;

    while output_dir.exists() {
        output_dir = output_root.join(format!("{timestamp}-{counter:02}"));
        counter += 1;
    }

    fs::create_dir_all(&output_dir)?;
    Ok(output_dir)
}

fn ensure_len(context: &'static str, expected: usize, actual: usize) -> Result<(), ModelError> {
    if expected == actual {
        return Ok(());
    }

    Err(ModelError::LengthMismatch {
        context,
        expected,
        got: actual,
    })
}

fn fmt_f64(value: f64) -> String {
    format!("{value:.10}")
}

fn fmt_option_f64(value: Option<f64>) -> String {
    value.map(fmt_f64).unwrap_or_default()
}

/// Per-patient discounted cost and utility, one row per patient.
pub fn write_cohort_csv(path: &Path, outcomes: &CohortOutcomes) -> Result<(), ModelError> {
    let costs = outcomes.costs();
    let utilities = outcomes.utilities();
    ensure_len("cohort utilities", costs.len(), utilities.len())?;

    let mut writer = Writer::from_path(path)?;
    writer.write_record(["patient_index", "discounted_cost", "discounted_utility"])?;
    for (idx, (cost, utility)) in costs.iter().zip(utilities).enumerate() {
        writer.write_record([idx.to_string(), fmt_f64(*cost), fmt_f64(*utility)])?;
    }

    writer.flush()?;
    Ok(())
}

/// Observed first-exacerbation times of a cohort.
pub fn write_event_times_csv(path: &Path, outcomes: &CohortOutcomes) -> Result<(), ModelError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["event_index", "time_to_exacerbation"])?;
    for (idx, time) in outcomes.times_to_exacerbation().iter().enumerate() {
        writer.write_record([idx.to_string(), fmt_f64(*time)])?;
    }

    writer.flush()?;
    Ok(())
}

/// Cohort means of a multi-cohort run, one row per cohort.
///
/// Cohorts without an exacerbation leave the time column empty.
pub fn write_multi_cohort_csv(
    path: &Path,
    outcomes: &MultiCohortOutcomes,
) -> Result<(), ModelError> {
    let times = outcomes.mean_times_to_exacerbation();
    ensure_len("multi-cohort mean costs", times.len(), outcomes.mean_costs().len())?;
    ensure_len(
        "multi-cohort mean utilities",
        times.len(),
        outcomes.mean_utilities().len(),
    )?;

    let mut writer = Writer::from_path(path)?;
    writer.write_record([
        "cohort_index",
        "mean_time_to_exacerbation",
        "mean_cost",
        "mean_utility",
    ])?;
    for idx in 0..times.len() {
        writer.write_record([
            idx.to_string(),
            fmt_option_f64(times[idx]),
            fmt_f64(outcomes.mean_costs()[idx]),
            fmt_f64(outcomes.mean_utilities()[idx]),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// One summarized outcome in `summary.json`. NaN estimates serialize as null.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub st_dev: f64,
    pub interval_kind: IntervalKind,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl OutcomeSummary {
    pub fn from_stat(stat: &SummaryStat, kind: IntervalKind, alpha: f64) -> Self {
        let interval = stat.interval(kind, alpha);
        Self {
            name: stat.name().to_string(),
            count: stat.count(),
            mean: stat.mean(),
            st_dev: stat.st_dev(),
            interval_kind: kind,
            lower: interval.map(|i| i.lower),
            upper: interval.map(|i| i.upper),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TherapySummary {
    pub therapy: Therapy,
    pub outcomes: Vec<OutcomeSummary>,
}

impl TherapySummary {
    pub fn from_cohort(therapy: Therapy, outcomes: &CohortOutcomes, alpha: f64) -> Self {
        let kind = IntervalKind::Confidence;
        Self {
            therapy,
            outcomes: [
                outcomes.stat_time_to_exacerbation(),
                outcomes.stat_cost(),
                outcomes.stat_utility(),
            ]
            .into_iter()
            .map(|stat| OutcomeSummary::from_stat(stat, kind, alpha))
            .collect(),
        }
    }

    pub fn from_multi_cohort(therapy: Therapy, outcomes: &MultiCohortOutcomes, alpha: f64) -> Self {
        let kind = IntervalKind::Prediction;
        Self {
            therapy,
            outcomes: [
                outcomes.stat_mean_time_to_exacerbation(),
                outcomes.stat_mean_cost(),
                outcomes.stat_mean_utility(),
            ]
            .into_iter()
            .map(|stat| OutcomeSummary::from_stat(stat, kind, alpha))
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub mode: String,
    pub generated_at: String,
    pub config: RunConfig,
    pub therapies: Vec<TherapySummary>,
}

impl RunSummary {
    pub fn new(mode: impl Into<String>, config: &RunConfig, therapies: Vec<TherapySummary>) -> Self {
        Self {
            mode: mode.into(),
            generated_at: Utc::now().to_rfc3339(),
            config: config.clone(),
            therapies,
        }
    }
}

pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<(), ModelError> {
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multi_cohort::CohortMeans;
    use crate::patient::PatientOutcome;

    fn outcome(id: u64, time: Option<f64>, cost: f64, utility: f64) -> PatientOutcome {
        PatientOutcome {
            id,
            time_to_exacerbation: time,
            discounted_cost: cost,
            discounted_utility: utility,
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "markov-cohort-report-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn cohort_block_lists_three_outcomes() {
        let outcomes = CohortOutcomes::from_patients(&[
            outcome(0, Some(2.5), 1200.0, 40.0),
            outcome(1, Some(4.5), 1800.0, 42.0),
            outcome(2, None, 1500.0, 44.0),
        ]);
        let text = cohort_outcome_text(Therapy::Daily, &outcomes, 0.05);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Daily ICS Therapy");
        assert!(lines[1].contains("95% confidence interval: 3.50 ("));
        assert!(lines[2].contains("1,500 ("));
        assert!(lines[3].contains("42.00 ("));
    }

    #[test]
    fn empty_event_series_prints_na() {
        let outcomes = CohortOutcomes::from_patients(&[outcome(0, None, 10.0, 1.0)]);
        let text = cohort_outcome_text(Therapy::Intermittent, &outcomes, 0.05);
        assert!(text.lines().nth(1).unwrap().ends_with(": NA"));
    }

    #[test]
    fn multi_cohort_block_uses_uncertainty_intervals() {
        let means: Vec<CohortMeans> = (0..20)
            .map(|i| CohortMeans {
                time_to_exacerbation: Some(10.0 + i as f64),
                cost: 1000.0 + i as f64,
                utility: 40.0,
            })
            .collect();
        let outcomes = MultiCohortOutcomes::from_cohort_means(&means);
        let text = multi_cohort_outcome_text(Therapy::Daily, &outcomes, 0.05);
        assert_eq!(text.matches("95% uncertainty interval").count(), 3);
        assert!(text.contains("1,009.50 ("));
    }

    #[test]
    fn paired_times_skip_missing_cohorts() {
        let (x, y) =
            paired_present(&[Some(1.0), None, Some(3.0)], &[Some(0.5), Some(2.0), None]).unwrap();
        assert_eq!(x, vec![1.0]);
        assert_eq!(y, vec![0.5]);
        assert!(paired_present(&[Some(1.0)], &[]).is_err());
    }

    #[test]
    fn comparative_multi_cohort_reports_three_differences() {
        let daily = MultiCohortOutcomes::from_cohort_means(&[
            CohortMeans {
                time_to_exacerbation: Some(10.0),
                cost: 100.0,
                utility: 40.0,
            },
            CohortMeans {
                time_to_exacerbation: Some(12.0),
                cost: 120.0,
                utility: 41.0,
            },
        ]);
        let inter = MultiCohortOutcomes::from_cohort_means(&[
            CohortMeans {
                time_to_exacerbation: Some(9.0),
                cost: 90.0,
                utility: 39.0,
            },
            CohortMeans {
                time_to_exacerbation: Some(11.0),
                cost: 100.0,
                utility: 40.0,
            },
        ]);
        let text = comparative_multi_cohort_text(&daily, &inter, 0.05).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Increase in mean asthma exacerbation time"));
        assert!(lines[0].contains(": -1.00 ("));
        assert!(lines[1].contains(": -15.00 ("));
    }

    #[test]
    fn csv_and_json_exports() {
        let dir = scratch_dir("export");
        let outcomes = CohortOutcomes::from_patients(&[
            outcome(0, Some(1.5), 10.0, 1.0),
            outcome(1, None, 20.0, 2.0),
        ]);

        let cohort_path = dir.join("cohort.csv");
        write_cohort_csv(&cohort_path, &outcomes).unwrap();
        let cohort_csv = fs::read_to_string(&cohort_path).unwrap();
        assert_eq!(cohort_csv.lines().count(), 3);
        assert!(cohort_csv.starts_with("patient_index,discounted_cost,discounted_utility"));

        let events_path = dir.join("events.csv");
        write_event_times_csv(&events_path, &outcomes).unwrap();
        assert_eq!(fs::read_to_string(&events_path).unwrap().lines().count(), 2);

        let multi = MultiCohortOutcomes::from_cohort_means(&[CohortMeans {
            time_to_exacerbation: None,
            cost: 5.0,
            utility: 0.5,
        }]);
        let multi_path = dir.join("multi.csv");
        write_multi_cohort_csv(&multi_path, &multi).unwrap();
        let multi_csv = fs::read_to_string(&multi_path).unwrap();
        assert!(multi_csv.lines().nth(1).unwrap().starts_with("0,,5.0"));

        let summary = RunSummary::new(
            "compare",
            &RunConfig::default(),
            vec![TherapySummary::from_cohort(Therapy::Daily, &outcomes, 0.05)],
        );
        let json_path = dir.join("summary.json");
        write_summary_json(&json_path, &summary).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(value["mode"], "compare");
        assert_eq!(value["therapies"][0]["outcomes"][1]["mean"], 15.0);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn timestamped_dirs_do_not_collide() {
        let root = scratch_dir("timestamps");
        let first = create_timestamped_output_dir(&root).unwrap();
        let second = create_timestamped_output_dir(&root).unwrap();
        assert_ne!(first, second);
        assert!(first.is_dir() && second.is_dir());
        fs::remove_dir_all(&root).unwrap();
    }
}
