//! Summary statistics over outcome series
//!
//! Only what the cohort pipeline reports: mean, sample standard deviation,
//! t-based confidence interval, percentile prediction interval, and
//! paired/independent mean differences.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::ModelError;

/// Which interval to report around a mean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalKind {
    /// Uncertainty of the mean
    Confidence,
    /// Spread of individual observations (percentile interval)
    Prediction,
}

impl IntervalKind {
    pub fn label(self) -> &'static str {
        match self {
            IntervalKind::Confidence => "confidence",
            IntervalKind::Prediction => "prediction",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

/// Summary of one series of observations
#[derive(Debug, Clone, Serialize)]
pub struct SummaryStat {
    name: String,
    data: Vec<f64>,
    mean: f64,
    st_dev: f64,
}

impl SummaryStat {
    /// Summarize `data`. An empty series has NaN mean and st_dev.
    pub fn new(name: impl Into<String>, data: Vec<f64>) -> Self {
        let n = data.len();
        let mean = if n == 0 {
            f64::NAN
        } else {
            data.iter().sum::<f64>() / n as f64
        };
        let st_dev = if n < 2 {
            f64::NAN
        } else {
            let ss: f64 = data.iter().map(|x| (x - mean).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        };

        Self {
            name: name.into(),
            data,
            mean,
            st_dev,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn count(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample standard deviation (n - 1 denominator)
    pub fn st_dev(&self) -> f64 {
        self.st_dev
    }

    /// `mean ± t(1 - alpha/2, n - 1) · st_dev / √n`; needs two observations.
    pub fn confidence_interval(&self, alpha: f64) -> Option<Interval> {
        let n = self.count();
        if n < 2 {
            return None;
        }
        let half_width = t_quantile(alpha, (n - 1) as f64)? * self.st_dev / (n as f64).sqrt();
        Some(Interval {
            lower: self.mean - half_width,
            upper: self.mean + half_width,
        })
    }

    /// Empirical `alpha/2` and `1 - alpha/2` percentiles.
    pub fn prediction_interval(&self, alpha: f64) -> Option<Interval> {
        if self.is_empty() {
            return None;
        }
        let mut sorted = self.data.clone();
        sorted.sort_by(f64::total_cmp);
        Some(Interval {
            lower: percentile(&sorted, alpha / 2.0),
            upper: percentile(&sorted, 1.0 - alpha / 2.0),
        })
    }

    pub fn interval(&self, kind: IntervalKind, alpha: f64) -> Option<Interval> {
        match kind {
            IntervalKind::Confidence => self.confidence_interval(alpha),
            IntervalKind::Prediction => self.prediction_interval(alpha),
        }
    }

    /// `"mean (lower, upper)"`, or `"NA"` for an empty series.
    pub fn formatted_mean_and_interval(
        &self,
        kind: IntervalKind,
        alpha: f64,
        decimals: usize,
        thousands: bool,
    ) -> String {
        if self.is_empty() {
            return "NA".to_string();
        }
        format_estimate_interval(
            self.mean,
            self.interval(kind, alpha),
            decimals,
            thousands,
        )
    }
}

/// Mean difference `x - y_ref` between two outcome series
#[derive(Debug, Clone)]
pub enum DifferenceStat {
    /// Observations matched by index (same parameter draw)
    Paired { name: String, diff: SummaryStat },
    /// Unmatched samples
    Independent {
        name: String,
        x: SummaryStat,
        y_ref: SummaryStat,
    },
}

impl DifferenceStat {
    pub fn paired(name: impl Into<String>, x: &[f64], y_ref: &[f64]) -> Result<Self, ModelError> {
        if x.len() != y_ref.len() {
            return Err(ModelError::LengthMismatch {
                context: "paired difference",
                expected: y_ref.len(),
                got: x.len(),
            });
        }
        let name = name.into();
        let diffs = x.iter().zip(y_ref).map(|(a, b)| a - b).collect();
        Ok(DifferenceStat::Paired {
            diff: SummaryStat::new(name.clone(), diffs),
            name,
        })
    }

    pub fn independent(name: impl Into<String>, x: &[f64], y_ref: &[f64]) -> Self {
        DifferenceStat::Independent {
            name: name.into(),
            x: SummaryStat::new("x", x.to_vec()),
            y_ref: SummaryStat::new("y_ref", y_ref.to_vec()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DifferenceStat::Paired { name, .. } | DifferenceStat::Independent { name, .. } => name,
        }
    }

    pub fn mean(&self) -> f64 {
        match self {
            DifferenceStat::Paired { diff, .. } => diff.mean(),
            DifferenceStat::Independent { x, y_ref, .. } => x.mean() - y_ref.mean(),
        }
    }

    /// Interval around the mean difference.
    ///
    /// Independent samples support only the Welch confidence interval.
    pub fn interval(&self, kind: IntervalKind, alpha: f64) -> Result<Option<Interval>, ModelError> {
        match (self, kind) {
            (DifferenceStat::Paired { diff, .. }, _) => Ok(diff.interval(kind, alpha)),
            (DifferenceStat::Independent { x, y_ref, .. }, IntervalKind::Confidence) => {
                Ok(welch_interval(x, y_ref, alpha))
            }
            (DifferenceStat::Independent { .. }, IntervalKind::Prediction) => {
                Err(ModelError::UnsupportedInterval(kind.label()))
            }
        }
    }

    pub fn formatted_mean_and_interval(
        &self,
        kind: IntervalKind,
        alpha: f64,
        decimals: usize,
        thousands: bool,
    ) -> Result<String, ModelError> {
        let interval = self.interval(kind, alpha)?;
        let mean = self.mean();
        if mean.is_nan() {
            return Ok("NA".to_string());
        }
        Ok(format_estimate_interval(mean, interval, decimals, thousands))
    }
}

fn welch_interval(x: &SummaryStat, y: &SummaryStat, alpha: f64) -> Option<Interval> {
    let (n_x, n_y) = (x.count() as f64, y.count() as f64);
    if x.count() < 2 || y.count() < 2 {
        return None;
    }
    let v_x = x.st_dev().powi(2) / n_x;
    let v_y = y.st_dev().powi(2) / n_y;
    let se = (v_x + v_y).sqrt();
    let mean = x.mean() - y.mean();
    if se == 0.0 {
        return Some(Interval {
            lower: mean,
            upper: mean,
        });
    }
    let dof = (v_x + v_y).powi(2) / (v_x.powi(2) / (n_x - 1.0) + v_y.powi(2) / (n_y - 1.0));
    let half_width = t_quantile(alpha, dof)? * se;
    Some(Interval {
        lower: mean - half_width,
        upper: mean + half_width,
    })
}

fn t_quantile(alpha: f64, dof: f64) -> Option<f64> {
    let t = StudentsT::new(0.0, 1.0, dof).ok()?;
    Some(t.inverse_cdf(1.0 - alpha / 2.0))
}

/// Linear-interpolation percentile of sorted data, `q` in [0, 1]
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

fn format_estimate_interval(
    estimate: f64,
    interval: Option<Interval>,
    decimals: usize,
    thousands: bool,
) -> String {
    let mean = format_number(estimate, decimals, thousands);
    match interval {
        Some(interval) => format!(
            "{mean} ({}, {})",
            format_number(interval.lower, decimals, thousands),
            format_number(interval.upper, decimals, thousands)
        ),
        None => mean,
    }
}

/// Fixed-point formatting with optional `,` thousands separators
pub fn format_number(value: f64, decimals: usize, thousands: bool) -> String {
    let raw = format!("{:.*}", decimals, value);
    if !thousands || !value.is_finite() {
        return raw;
    }

    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw.as_str()),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_and_sample_st_dev() {
        let stat = SummaryStat::new("x", vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_relative_eq!(stat.mean(), 5.0);
        assert_relative_eq!(stat.st_dev(), (32.0_f64 / 7.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn confidence_interval_matches_t_table() {
        let stat = SummaryStat::new("x", vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let ci = stat.confidence_interval(0.05).unwrap();
        // t(0.975, 4) = 2.776445
        let half = 2.776_445_105 * stat.st_dev() / 5.0_f64.sqrt();
        assert_relative_eq!(ci.lower, 3.0 - half, epsilon = 1e-6);
        assert_relative_eq!(ci.upper, 3.0 + half, epsilon = 1e-6);
    }

    #[test]
    fn prediction_interval_interpolates_percentiles() {
        let data: Vec<f64> = (0..=100).map(f64::from).rev().collect();
        let stat = SummaryStat::new("x", data);
        let pi = stat.prediction_interval(0.05).unwrap();
        assert_relative_eq!(pi.lower, 2.5, epsilon = 1e-12);
        assert_relative_eq!(pi.upper, 97.5, epsilon = 1e-12);
    }

    #[test]
    fn short_series_have_no_confidence_interval() {
        let stat = SummaryStat::new("x", vec![3.0]);
        assert!(stat.confidence_interval(0.05).is_none());
        let pi = stat.prediction_interval(0.05).unwrap();
        assert_eq!((pi.lower, pi.upper), (3.0, 3.0));
        assert_eq!(
            stat.formatted_mean_and_interval(IntervalKind::Confidence, 0.05, 2, false),
            "3.00"
        );
    }

    #[test]
    fn empty_series_formats_as_na() {
        let stat = SummaryStat::new("x", Vec::new());
        assert!(stat.mean().is_nan());
        assert_eq!(
            stat.formatted_mean_and_interval(IntervalKind::Prediction, 0.05, 2, false),
            "NA"
        );
    }

    #[test]
    fn thousands_separator_grouping() {
        assert_eq!(format_number(1234567.891, 2, true), "1,234,567.89");
        assert_eq!(format_number(-1234.0, 0, true), "-1,234");
        assert_eq!(format_number(999.5, 1, true), "999.5");
        assert_eq!(format_number(1234.5, 1, false), "1234.5");
    }

    #[test]
    fn paired_difference_uses_elementwise_differences() {
        let diff = DifferenceStat::paired("d", &[3.0, 5.0, 7.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_relative_eq!(diff.mean(), 3.0);
        let pi = diff.interval(IntervalKind::Prediction, 0.0).unwrap().unwrap();
        assert_eq!((pi.lower, pi.upper), (2.0, 4.0));
    }

    #[test]
    fn paired_difference_rejects_unequal_lengths() {
        assert!(DifferenceStat::paired("d", &[1.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn independent_difference_has_welch_interval_only() {
        let diff = DifferenceStat::independent("d", &[1.0, 2.0, 3.0, 4.0], &[0.0, 1.0, 1.0, 2.0]);
        assert_relative_eq!(diff.mean(), 1.5);
        let ci = diff
            .interval(IntervalKind::Confidence, 0.05)
            .unwrap()
            .unwrap();
        assert!(ci.lower < 1.5 && ci.upper > 1.5);
        assert!(matches!(
            diff.interval(IntervalKind::Prediction, 0.05),
            Err(ModelError::UnsupportedInterval(_))
        ));
    }
}
