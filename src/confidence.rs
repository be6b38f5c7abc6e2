//! Data confidence estimation
//!
//! Scores how much the day's data can be trusted, independently of the
//! readiness value itself. The score is additive:
//!
//! - +1 per present input (sleep, HRV, resting HR)
//! - +2 for a record dated today, +1 for yesterday
//! - +1 for consistent sleep over the last three series points, -1 when
//!   erratic; -1 for high HRV variability
//! - -1 in rolling mode with fewer than seven aggregated points
//!
//! 5 and above is high, 3 and above moderate, anything else low. Only the
//! first issue found is reported.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::aggregator::{mean_over_present, population_std_dev};
use crate::models::{DailyRecord, Insight, InsightKind, ProcessedPoint, ViewMode};

const SLEEP_SD_LIMIT: f64 = 2.0;
const HRV_CV_LIMIT: f64 = 0.25;
const CONSISTENCY_POINTS: usize = 3;
const ROLLING_MIN_POINTS: usize = 7;

/// Trust label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Moderate,
    High,
}

impl ConfidenceLevel {
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 5 => ConfidenceLevel::High,
            s if s >= 3 => ConfidenceLevel::Moderate,
            _ => ConfidenceLevel::Low,
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceLevel::Low => write!(f, "low"),
            ConfidenceLevel::Moderate => write!(f, "moderate"),
            ConfidenceLevel::High => write!(f, "high"),
        }
    }
}

/// Confidence label with the primary reason when not high
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    pub level: ConfidenceLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Confidence {
    pub fn to_insight(&self) -> Insight {
        let text = match &self.reason {
            Some(reason) => format!("Confidence: {}. {}", self.level, reason),
            None => format!("Confidence: {}", self.level),
        };
        Insight::new(InsightKind::Confidence, text)
    }
}

fn is_present(value: Option<f64>) -> bool {
    value.is_some_and(|v| v.is_finite() && v > 0.0)
}

/// Estimate confidence for the latest raw record and the active series
///
/// `records` is the raw input and `series` the active series after the
/// `days_to_show` cut.
pub fn estimate(
    records: &[DailyRecord],
    series: &[ProcessedPoint],
    mode: ViewMode,
    current_moment: DateTime<Utc>,
) -> Confidence {
    let Some(latest) = records.last() else {
        return Confidence {
            level: ConfidenceLevel::Low,
            reason: Some("No data available for today.".to_string()),
        };
    };

    let mut score = 0i32;
    let mut issues: Vec<String> = Vec::new();

    for (value, issue) in [
        (latest.sleep_hours, "Sleep data missing"),
        (latest.hrv_ms, "HRV data missing"),
        (latest.resting_hr_bpm, "Resting heart rate missing"),
    ] {
        if is_present(value) {
            score += 1;
        } else {
            issues.push(issue.to_string());
        }
    }

    let age_days = current_moment
        .date_naive()
        .signed_duration_since(latest.date)
        .num_days();
    match age_days {
        0 => score += 2,
        1 => {
            score += 1;
            issues.push("Data is from yesterday".to_string());
        }
        n if n > 1 => issues.push(format!("Data is {} days old", n)),
        _ => {}
    }

    if series.len() >= CONSISTENCY_POINTS {
        let last = &series[series.len() - CONSISTENCY_POINTS..];

        let sleep: Vec<Option<f64>> = last.iter().map(|p| p.metrics.sleep_hours).collect();
        // no sleep in the window is not erratic and still earns the bonus
        if population_std_dev(sleep).is_some_and(|sd| sd > SLEEP_SD_LIMIT) {
            score -= 1;
            issues.push("Sleep data is erratic".to_string());
        } else {
            score += 1;
        }

        let hrv: Vec<Option<f64>> = last.iter().map(|p| p.metrics.hrv_ms).collect();
        let hrv_cv = mean_over_present(hrv.iter().copied())
            .filter(|mean| *mean > 0.0)
            .zip(population_std_dev(hrv))
            .map(|(mean, sd)| sd / mean);
        if hrv_cv.is_some_and(|cv| cv > HRV_CV_LIMIT) {
            score -= 1;
            issues.push("HRV data shows high variability".to_string());
        }
    }

    if mode == ViewMode::Rolling && series.len() < ROLLING_MIN_POINTS {
        score -= 1;
        issues.push("Insufficient data for 7-day average".to_string());
    }

    let level = ConfidenceLevel::from_score(score);
    tracing::debug!(score, %level, issues = issues.len(), "Estimated data confidence");

    Confidence {
        level,
        reason: if level == ConfidenceLevel::High {
            None
        } else {
            issues.into_iter().next()
        },
    }
}
