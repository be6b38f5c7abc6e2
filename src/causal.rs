//! Causal reinforcement
//!
//! Compares the last seven points of the active series with the seven before
//! them and, when a behavior change and a readiness change line up, states
//! that one preceded the other. Eight patterns, first match wins.

use crate::aggregator::{population_std_dev, trailing_weeks, window_mean};
use crate::models::{Insight, InsightKind, Metric, ProcessedPoint};
use crate::rules::{first_match, Rule};

/// Change in sleep standard deviation that counts as a consistency shift
const CONSISTENCY_DELTA: f64 = 0.3;
/// Nights at or above this many hours count as long sleep
const LONG_SLEEP_HOURS: f64 = 7.5;

/// Week-over-week deltas the patterns are written against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CausalContext {
    pub sleep_change: f64,
    pub hrv_change: f64,
    pub rhr_change: f64,
    pub readiness_change: f64,
    /// `None` unless all seven recent nights have sleep
    pub recent_sleep_sd: Option<f64>,
    pub prior_sleep_sd: Option<f64>,
    /// Recent nights with at least 7.5 hours of sleep
    pub long_sleep_nights: usize,
}

impl CausalContext {
    /// Build the context from a series; `None` below 14 points or when any
    /// weekly mean is undefined
    pub fn from_series(series: &[ProcessedPoint]) -> Option<Self> {
        let Some((prior, recent)) = trailing_weeks(series) else {
            tracing::debug!(points = series.len(), "Causal reinforcement unavailable");
            return None;
        };

        let change = |metric: Metric| -> Option<f64> {
            Some(window_mean(recent, metric)? - window_mean(prior, metric)?)
        };
        let sleep_sd = |window: &[ProcessedPoint]| {
            let sleep: Option<Vec<f64>> = window.iter().map(|p| p.metrics.sleep_hours).collect();
            population_std_dev(sleep?.into_iter().map(Some))
        };

        Some(CausalContext {
            sleep_change: change(Metric::Sleep)?,
            hrv_change: change(Metric::Hrv)?,
            rhr_change: change(Metric::RestingHr)?,
            readiness_change: change(Metric::Readiness)?,
            recent_sleep_sd: sleep_sd(recent),
            prior_sleep_sd: sleep_sd(prior),
            long_sleep_nights: recent
                .iter()
                .filter(|p| p.metrics.sleep_hours.is_some_and(|s| s >= LONG_SLEEP_HOURS))
                .count(),
        })
    }

    fn sleep_sd_pair(&self) -> Option<(f64, f64)> {
        self.recent_sleep_sd.zip(self.prior_sleep_sd)
    }

    fn consistency_improved(&self) -> bool {
        self.sleep_sd_pair()
            .is_some_and(|(recent, prior)| recent < prior - CONSISTENCY_DELTA)
    }

    fn consistency_declined(&self) -> bool {
        self.sleep_sd_pair()
            .is_some_and(|(recent, prior)| recent > prior + CONSISTENCY_DELTA)
    }
}

fn fixed(text: &'static str) -> String {
    text.to_string()
}

/// The eight patterns in priority order
pub fn causal_rules() -> [Rule<CausalContext>; 8] {
    [
        Rule::new(
            "sleep_consistency_improved",
            |c: &CausalContext| c.consistency_improved() && c.readiness_change >= 5.0,
            |_: &CausalContext| {
                fixed("Improved sleep consistency this week corresponded with higher readiness.")
            },
        ),
        Rule::new(
            "longer_sleep_nights",
            |c: &CausalContext| {
                c.sleep_change >= 0.5 && c.readiness_change >= 5.0 && c.long_sleep_nights >= 3
            },
            |_: &CausalContext| fixed("Readiness recovered after three nights of longer sleep."),
        ),
        Rule::new(
            "hrv_stabilization",
            |c: &CausalContext| {
                c.hrv_change >= 5.0 && c.readiness_change >= 5.0 && c.rhr_change <= -2.0
            },
            |_: &CausalContext| fixed("Reduced training load preceded HRV stabilization."),
        ),
        Rule::new(
            "extended_sleep",
            |c: &CausalContext| c.sleep_change >= 0.7 && c.readiness_change >= 6.0,
            |_: &CausalContext| {
                fixed("Extended sleep duration this week corresponded with readiness gains.")
            },
        ),
        Rule::new(
            "short_sleep",
            |c: &CausalContext| c.sleep_change <= -0.5 && c.readiness_change <= -5.0,
            |_: &CausalContext| {
                fixed("Short sleep duration this week coincided with declining readiness.")
            },
        ),
        Rule::new(
            "sleep_consistency_declined",
            |c: &CausalContext| c.consistency_declined() && c.readiness_change <= -5.0,
            |_: &CausalContext| {
                fixed("Inconsistent sleep timing this week preceded readiness decline.")
            },
        ),
        Rule::new(
            "elevated_rhr",
            |c: &CausalContext| c.rhr_change >= 3.0 && c.readiness_change <= -5.0,
            |_: &CausalContext| fixed("Increased load preceded elevated resting heart rate."),
        ),
        Rule::new(
            "declining_hrv",
            |c: &CausalContext| c.hrv_change <= -8.0 && c.readiness_change <= -5.0,
            |_: &CausalContext| fixed("Declining HRV over the week preceded reduced readiness."),
        ),
    ]
}

/// Evaluate causal reinforcement for the active series
pub fn evaluate(series: &[ProcessedPoint]) -> Option<Insight> {
    let context = CausalContext::from_series(series)?;
    let hit = first_match(&causal_rules(), &context)?;
    Some(Insight::new(InsightKind::Causal, hit.message).with_metric(Metric::Readiness))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricSet;
    use chrono::{Duration, NaiveDate};

    fn point(day: i64, readiness: f64, sleep: f64, hrv: f64, rhr: f64) -> ProcessedPoint {
        ProcessedPoint {
            date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap() + Duration::days(day),
            metrics: MetricSet {
                readiness: Some(readiness),
                sleep_hours: Some(sleep),
                hrv_ms: Some(hrv),
                resting_hr_bpm: Some(rhr),
                ..MetricSet::default()
            },
        }
    }

    /// Two constant weeks; `recent_sleep` overrides the recent week's sleep
    fn two_weeks(
        prior: (f64, f64, f64, f64),
        recent: (f64, f64, f64, f64),
        recent_sleep: Option<[f64; 7]>,
    ) -> Vec<ProcessedPoint> {
        let mut series: Vec<ProcessedPoint> = (0..7)
            .map(|d| point(d, prior.0, prior.1, prior.2, prior.3))
            .collect();
        for d in 0..7 {
            let sleep = recent_sleep.map_or(recent.1, |s| s[d as usize]);
            series.push(point(7 + d, recent.0, sleep, recent.2, recent.3));
        }
        series
    }

    fn rule_for(series: &[ProcessedPoint]) -> Option<&'static str> {
        let context = CausalContext::from_series(series)?;
        first_match(&causal_rules(), &context).map(|m| m.rule)
    }

    #[test]
    fn test_requires_two_full_weeks() {
        let series = two_weeks((50.0, 6.0, 50.0, 60.0), (60.0, 8.0, 50.0, 60.0), None);
        assert!(evaluate(&series[1..]).is_none());
        assert!(evaluate(&series).is_some());
    }

    #[test]
    fn test_undefined_mean_is_silent() {
        let mut series = two_weeks((50.0, 6.0, 50.0, 60.0), (60.0, 8.0, 50.0, 60.0), None);
        for p in series.iter_mut().skip(7) {
            p.metrics.hrv_ms = None;
        }
        assert!(CausalContext::from_series(&series).is_none());
    }

    #[test]
    fn test_extended_sleep_pattern() {
        // recent sleep averages 7.8h with only two nights at 7.5h or more
        let series = two_weeks(
            (50.0, 6.0, 50.0, 60.0),
            (57.0, 0.0, 50.0, 60.0),
            Some([7.4, 7.4, 7.4, 7.4, 7.4, 8.8, 8.8]),
        );
        let context = CausalContext::from_series(&series).unwrap();
        assert!((context.sleep_change - 1.8).abs() < 1e-9);
        assert!((context.readiness_change - 7.0).abs() < 1e-9);
        assert_eq!(context.long_sleep_nights, 2);

        let insight = evaluate(&series).unwrap();
        assert_eq!(insight.kind, InsightKind::Causal);
        assert_eq!(
            insight.text,
            "Extended sleep duration this week corresponded with readiness gains."
        );
    }

    #[test]
    fn test_longer_sleep_nights_precedes_extended_sleep() {
        let series = two_weeks((50.0, 6.0, 50.0, 60.0), (57.0, 7.8, 50.0, 60.0), None);
        assert_eq!(rule_for(&series), Some("longer_sleep_nights"));
    }

    #[test]
    fn test_consistency_improved() {
        let series = {
            let mut s = two_weeks((50.0, 7.0, 50.0, 60.0), (56.0, 7.0, 50.0, 60.0), None);
            for (i, p) in s.iter_mut().take(7).enumerate() {
                p.metrics.sleep_hours = Some(if i % 2 == 0 { 6.0 } else { 8.0 });
            }
            s
        };
        assert_eq!(rule_for(&series), Some("sleep_consistency_improved"));
    }

    #[test]
    fn test_missing_night_silences_consistency_patterns() {
        let mut series = two_weeks((50.0, 7.0, 50.0, 60.0), (56.0, 7.0, 50.0, 60.0), None);
        for (p, sleep) in series.iter_mut().zip([5.0, 9.0, 5.0, 9.0, 5.0, 9.0, 7.0]) {
            p.metrics.sleep_hours = Some(sleep);
        }
        series[10].metrics.sleep_hours = None;

        let context = CausalContext::from_series(&series).unwrap();
        assert_eq!(context.recent_sleep_sd, None);
        assert!(context.prior_sleep_sd.is_some());
        assert!(evaluate(&series).is_none());
    }

    #[test]
    fn test_missing_night_keeps_other_patterns() {
        let mut series = two_weeks((60.0, 7.5, 50.0, 60.0), (54.0, 6.8, 50.0, 60.0), None);
        series[3].metrics.sleep_hours = None;
        assert_eq!(rule_for(&series), Some("short_sleep"));
    }

    #[test]
    fn test_hrv_stabilization() {
        let series = two_weeks((50.0, 7.0, 50.0, 60.0), (56.0, 7.0, 56.0, 57.0), None);
        assert_eq!(rule_for(&series), Some("hrv_stabilization"));
    }

    #[test]
    fn test_negative_patterns() {
        let series = two_weeks((60.0, 7.5, 50.0, 60.0), (54.0, 6.8, 50.0, 60.0), None);
        assert_eq!(rule_for(&series), Some("short_sleep"));

        let series = two_weeks(
            (60.0, 7.0, 50.0, 60.0),
            (54.0, 0.0, 50.0, 60.0),
            Some([6.0, 8.0, 6.0, 8.0, 6.0, 8.0, 7.0]),
        );
        assert_eq!(rule_for(&series), Some("sleep_consistency_declined"));

        let series = two_weeks((60.0, 7.0, 50.0, 58.0), (54.0, 7.0, 50.0, 62.0), None);
        assert_eq!(rule_for(&series), Some("elevated_rhr"));

        let series = two_weeks((60.0, 7.0, 58.0, 60.0), (54.0, 7.0, 49.0, 60.0), None);
        assert_eq!(rule_for(&series), Some("declining_hrv"));
    }

    #[test]
    fn test_small_changes_are_silent() {
        let series = two_weeks((60.0, 7.0, 50.0, 60.0), (63.0, 7.3, 52.0, 59.0), None);
        assert!(evaluate(&series).is_none());
    }
}
