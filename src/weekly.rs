//! Weekly summaries and the recommendation reliability signal

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::aggregator::{mean_over_present, window_mean, WEEK};
use crate::models::{DailyRecord, Metric};
use crate::normalizer::{readiness_value, sanitize};
use crate::scorer::{BandThresholds, TakeawayBand};

/// Mean values of one week
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyAverages {
    pub recovery: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub hrv_ms: Option<f64>,
    pub resting_hr_bpm: Option<f64>,
    pub feeling: Option<f64>,
    pub steps: Option<f64>,
    pub weight: Option<f64>,
    pub active_minutes: Option<f64>,
    pub strain: Option<f64>,
}

/// Percent change against the previous week
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTrends {
    pub feeling: Option<f64>,
    pub sleep: Option<f64>,
    pub steps: Option<f64>,
    pub weight: Option<f64>,
    pub recovery: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    /// 1-based
    pub week_number: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Records in this week; the last week may be partial
    pub days: usize,
    pub averages: WeeklyAverages,
    pub trends: WeeklyTrends,
}

impl WeeklySummary {
    pub fn label(&self) -> String {
        format!("Week {}", self.week_number)
    }

    pub fn date_range(&self) -> String {
        format!("{} - {}", self.start.format("%b %-d"), self.end.format("%b %-d"))
    }
}

/// Direction of a weekly trend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TrendIndicator {
    Up(f64),
    Down(f64),
    Flat,
}

impl TrendIndicator {
    /// Changes under one percent read as flat
    pub fn from_percent(value: f64) -> Self {
        if value.abs() < 1.0 {
            TrendIndicator::Flat
        } else if value > 0.0 {
            TrendIndicator::Up(value)
        } else {
            TrendIndicator::Down(value)
        }
    }
}

impl fmt::Display for TrendIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendIndicator::Up(v) => write!(f, "+{:.0}%", v),
            TrendIndicator::Down(v) => write!(f, "{:.0}%", v),
            TrendIndicator::Flat => write!(f, "flat"),
        }
    }
}

fn averages(week: &[DailyRecord]) -> WeeklyAverages {
    WeeklyAverages {
        recovery: window_mean(week, Metric::Readiness),
        sleep_hours: window_mean(week, Metric::Sleep),
        hrv_ms: window_mean(week, Metric::Hrv),
        resting_hr_bpm: window_mean(week, Metric::RestingHr),
        feeling: window_mean(week, Metric::Feeling),
        steps: window_mean(week, Metric::Steps),
        weight: window_mean(week, Metric::Weight),
        active_minutes: window_mean(week, Metric::ActiveMinutes),
        strain: mean_over_present(week.iter().map(|r| sanitize(r.strain))),
    }
}

fn percent_change(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    let previous = previous.filter(|p| *p != 0.0)?;
    Some((current? - previous) / previous * 100.0)
}

/// Split records into consecutive 7-record weeks from the start
pub fn weekly_summaries(records: &[DailyRecord]) -> Vec<WeeklySummary> {
    let mut summaries: Vec<WeeklySummary> = Vec::with_capacity(records.len().div_ceil(WEEK));

    for (index, week) in records.chunks(WEEK).enumerate() {
        let averages = averages(week);
        let trends = match summaries.last() {
            Some(prev) => WeeklyTrends {
                feeling: percent_change(averages.feeling, prev.averages.feeling),
                sleep: percent_change(averages.sleep_hours, prev.averages.sleep_hours),
                steps: percent_change(averages.steps, prev.averages.steps),
                weight: percent_change(averages.weight, prev.averages.weight),
                recovery: percent_change(averages.recovery, prev.averages.recovery),
            },
            None => WeeklyTrends::default(),
        };

        summaries.push(WeeklySummary {
            week_number: index + 1,
            start: week[0].date,
            end: week[week.len() - 1].date,
            days: week.len(),
            averages,
            trends,
        });
    }

    summaries
}

/// How often yesterday's recommendation matched today's outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReliabilitySignal {
    pub aligned_days: usize,
    pub days_checked: usize,
    pub text: String,
}

/// Allowed readiness drop after a day in each band
fn tolerated_drop(band: TakeawayBand) -> i64 {
    match band {
        TakeawayBand::High => -5,
        TakeawayBand::Moderate => -8,
        TakeawayBand::Low => -3,
    }
}

/// Reliability signal over the last seven records
///
/// Unavailable with fewer than seven records or when any of the seven has
/// no readiness.
pub fn reliability_signal(records: &[DailyRecord], bands: &BandThresholds) -> Option<ReliabilitySignal> {
    if records.len() < WEEK {
        return None;
    }

    let readiness: Vec<i64> = records[records.len() - WEEK..]
        .iter()
        .map(|r| readiness_value(r).map(|v| v.round() as i64))
        .collect::<Option<_>>()?;

    let aligned_days = readiness
        .windows(2)
        .filter(|pair| {
            let band = TakeawayBand::classify(pair[0] as f64, bands);
            pair[1] - pair[0] >= tolerated_drop(band)
        })
        .count();
    let days_checked = WEEK - 1;

    let text = if aligned_days >= 5 {
        "System recommendations matched observed trends most days this week.".to_string()
    } else {
        format!(
            "Recommendations aligned with readiness trends on {} of {} days.",
            aligned_days, days_checked
        )
    };

    Some(ReliabilitySignal {
        aligned_days,
        days_checked,
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn day(d: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap() + Duration::days(d)
    }

    fn with_recovery(values: &[f64]) -> Vec<DailyRecord> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| DailyRecord::new(day(i as i64)).with_recovery(*v))
            .collect()
    }

    #[test]
    fn test_weekly_chunks_and_partial_week() {
        let mut records = with_recovery(&[60.0; 16]);
        for (i, r) in records.iter_mut().enumerate() {
            r.sleep_hours = Some(if i < 7 { 7.0 } else { 7.7 });
            r.steps = Some(8000.0);
        }

        let weeks = weekly_summaries(&records);
        assert_eq!(weeks.len(), 3);
        assert_eq!(weeks[0].label(), "Week 1");
        assert_eq!(weeks[0].start, day(0));
        assert_eq!(weeks[0].end, day(6));
        assert_eq!(weeks[2].days, 2);

        assert_eq!(weeks[0].trends, WeeklyTrends::default());
        let sleep_trend = weeks[1].trends.sleep.unwrap();
        assert!((sleep_trend - 10.0).abs() < 1e-9);
        assert_eq!(weeks[1].trends.steps, Some(0.0));
        assert_eq!(weeks[1].trends.weight, None);
    }

    #[test]
    fn test_weekly_average_skips_missing_values() {
        let mut records = with_recovery(&[50.0, 70.0]);
        records[0].feeling = Some(4.0);
        let weeks = weekly_summaries(&records);
        assert_eq!(weeks[0].averages.feeling, Some(4.0));
        assert_eq!(weeks[0].averages.recovery, Some(60.0));
        assert_eq!(weeks[0].averages.hrv_ms, None);
    }

    #[test]
    fn test_date_range() {
        let weeks = weekly_summaries(&with_recovery(&[60.0; 7]));
        assert_eq!(weeks[0].date_range(), "Mar 4 - Mar 10");
    }

    #[test]
    fn test_trend_indicator() {
        assert_eq!(TrendIndicator::from_percent(0.6), TrendIndicator::Flat);
        assert_eq!(TrendIndicator::from_percent(-0.99), TrendIndicator::Flat);
        assert_eq!(TrendIndicator::from_percent(4.4).to_string(), "+4%");
        assert_eq!(TrendIndicator::from_percent(-7.0).to_string(), "-7%");
    }

    #[test]
    fn test_reliability_most_days() {
        let records = with_recovery(&[80.0, 78.0, 74.0, 70.0, 68.0, 60.0, 62.0]);
        let signal = reliability_signal(&records, &BandThresholds::TAKEAWAY).unwrap();
        assert_eq!(signal.aligned_days, 6);
        assert_eq!(
            signal.text,
            "System recommendations matched observed trends most days this week."
        );
    }

    #[test]
    fn test_reliability_partial_alignment() {
        // misses: high -10, moderate -9, moderate -11; then low +2, 0, +1
        let records = with_recovery(&[80.0, 70.0, 61.0, 50.0, 52.0, 52.0, 53.0]);
        let signal = reliability_signal(&records, &BandThresholds::TAKEAWAY).unwrap();
        assert_eq!(signal.aligned_days, 3);
        assert_eq!(
            signal.text,
            "Recommendations aligned with readiness trends on 3 of 6 days."
        );
    }

    #[test]
    fn test_reliability_unavailable() {
        assert!(reliability_signal(&with_recovery(&[60.0; 6]), &BandThresholds::TAKEAWAY).is_none());

        let mut records = with_recovery(&[60.0; 8]);
        records[5].recovery = None;
        assert!(reliability_signal(&records, &BandThresholds::TAKEAWAY).is_none());
    }
}
