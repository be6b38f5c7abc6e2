//! Window aggregation over a day-ordered sequence
//!
//! Windows are positional slices of the input, not calendar ranges: gaps in
//! the dates are ignored. Every aggregate is the mean over the values that
//! are actually present in the window; a window without any present value
//! for a metric yields `None` for that metric.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::models::{Metric, MetricSet, MetricSource, ProcessedPoint};

/// Size of the week windows used for week-over-week comparisons
pub const WEEK: usize = 7;

/// Mean of the present, finite values; `None` when there are none
pub fn mean_over_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let present: Vec<f64> = values.into_iter().flatten().filter(|v| v.is_finite()).collect();
    if present.is_empty() {
        return None;
    }
    Some(present.iter().mean())
}

/// Population standard deviation of the present, finite values
pub fn population_std_dev<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let present: Vec<f64> = values.into_iter().flatten().filter(|v| v.is_finite()).collect();
    if present.is_empty() {
        return None;
    }
    Some(present.iter().population_std_dev())
}

/// Mean of one metric over a window
pub fn window_mean<S: MetricSource>(window: &[S], metric: Metric) -> Option<f64> {
    mean_over_present(window.iter().map(|item| item.metric(metric)))
}

/// Means of every metric over a window
pub fn window_means<S: MetricSource>(window: &[S]) -> MetricSet {
    let mut means = MetricSet::default();
    for metric in Metric::ALL {
        means.set(metric, window_mean(window, metric));
    }
    means
}

/// Snapshot of one item as a processed point without averaging
pub fn point_of<S: MetricSource>(item: &S) -> ProcessedPoint {
    let mut metrics = MetricSet::default();
    for metric in Metric::ALL {
        metrics.set(metric, item.metric(metric));
    }
    ProcessedPoint {
        date: item.date(),
        metrics,
    }
}

/// Daily series: one point per item, no smoothing
pub fn daily_series<S: MetricSource>(items: &[S]) -> Vec<ProcessedPoint> {
    items.iter().map(point_of).collect()
}

/// Trailing rolling average
///
/// One output point per input index `i >= window_size - 1`, averaging
/// `items[i + 1 - window_size ..= i]` and dated like `items[i]`. Empty when
/// there are fewer items than the window size.
pub fn rolling_average<S: MetricSource>(items: &[S], window_size: usize) -> Vec<ProcessedPoint> {
    if window_size == 0 || items.len() < window_size {
        tracing::debug!(
            items = items.len(),
            window_size,
            "Not enough history for rolling average"
        );
        return Vec::new();
    }

    items
        .windows(window_size)
        .map(|window| ProcessedPoint {
            date: window[window_size - 1].date(),
            metrics: window_means(window),
        })
        .collect()
}

/// The trailing two weeks as `(prior, recent)`, `None` below 14 items
pub fn trailing_weeks<S>(items: &[S]) -> Option<(&[S], &[S])> {
    if items.len() < 2 * WEEK {
        return None;
    }
    let tail = &items[items.len() - 2 * WEEK..];
    Some(tail.split_at(WEEK))
}

/// Last seven against the seven before
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekComparison {
    pub recent: MetricSet,
    pub prior: MetricSet,
}

impl WeekComparison {
    /// Recent mean minus prior mean
    pub fn change(&self, metric: Metric) -> Option<f64> {
        Some(self.recent.get(metric)? - self.prior.get(metric)?)
    }

    /// Relative change in percent, `None` when the prior mean is zero
    pub fn percent_change(&self, metric: Metric) -> Option<f64> {
        let prior = self.prior.get(metric)?;
        if prior == 0.0 {
            return None;
        }
        Some((self.recent.get(metric)? - prior) / prior * 100.0)
    }
}

/// Compare the trailing 7 items with the 7 before them
pub fn week_over_week<S: MetricSource>(items: &[S]) -> Option<WeekComparison> {
    let Some((prior, recent)) = trailing_weeks(items) else {
        tracing::debug!(items = items.len(), "Week-over-week unavailable");
        return None;
    };

    Some(WeekComparison {
        recent: window_means(recent),
        prior: window_means(prior),
    })
}

/// Shape of the exclude-recent baseline window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineWindow {
    /// Most recent items left out of the baseline
    pub exclude_recent: usize,
    /// Maximum number of items in the baseline
    pub span: usize,
    /// Minimum number of items the window must contain
    pub min_points: usize,
}

impl Default for BaselineWindow {
    fn default() -> Self {
        BaselineWindow {
            exclude_recent: 7,
            span: 30,
            min_points: 7,
        }
    }
}

impl BaselineWindow {
    /// Slice of `items` covered by the baseline
    pub fn slice<'a, S>(&self, items: &'a [S]) -> Option<&'a [S]> {
        let end = items.len().checked_sub(self.exclude_recent)?;
        let start = end.saturating_sub(self.span);
        let window = &items[start..end];
        (window.len() >= self.min_points && !window.is_empty()).then_some(window)
    }
}

/// Long-horizon reference mean of one metric, excluding the recent days
pub fn baseline<S: MetricSource>(items: &[S], metric: Metric, shape: &BaselineWindow) -> Option<f64> {
    let Some(window) = shape.slice(items) else {
        tracing::debug!(items = items.len(), %metric, "Baseline unavailable");
        return None;
    };
    window_mean(window, metric)
}

/// Mean readiness of a series
pub fn period_average(series: &[ProcessedPoint]) -> Option<f64> {
    window_mean(series, Metric::Readiness)
}

/// Lowest and highest readiness points of a series
///
/// Ties pick the earliest lowest point and the latest highest point.
pub fn readiness_extremes(series: &[ProcessedPoint]) -> Option<(ProcessedPoint, ProcessedPoint)> {
    let defined = || {
        series
            .iter()
            .filter_map(|p| p.metrics.readiness.filter(|r| r.is_finite()).map(|r| (p, r)))
    };

    let lowest = defined().min_by(|a, b| a.1.total_cmp(&b.1))?;
    let highest = defined().max_by(|a, b| a.1.total_cmp(&b.1))?;
    Some((*lowest.0, *highest.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DailyRecord;
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn records_with_sleep(sleep: &[Option<f64>]) -> Vec<DailyRecord> {
        sleep
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let mut r = DailyRecord::new(start() + Duration::days(i as i64));
                r.sleep_hours = *s;
                r
            })
            .collect()
    }

    #[test]
    fn test_mean_over_present_skips_absent_values() {
        assert_eq!(mean_over_present([Some(6.0), None, Some(8.0)]), Some(7.0));
        assert_eq!(mean_over_present([None, None]), None);
        assert_eq!(mean_over_present([Some(f64::NAN), Some(4.0)]), Some(4.0));
        assert_eq!(mean_over_present(std::iter::empty()), None);
    }

    #[test]
    fn test_population_std_dev() {
        let sd = population_std_dev([Some(2.0), Some(4.0), Some(4.0), Some(4.0), Some(5.0), Some(5.0), Some(7.0), Some(9.0)]);
        assert!((sd.unwrap() - 2.0).abs() < 1e-12);
        assert_eq!(population_std_dev([Some(7.0)]), Some(0.0));
        assert_eq!(population_std_dev([None]), None);
    }

    #[test]
    fn test_rolling_average_positions() {
        let records = records_with_sleep(&[Some(6.0), Some(7.0), Some(8.0), Some(9.0)]);
        let rolled = rolling_average(&records, 3);
        assert_eq!(rolled.len(), 2);
        assert_eq!(rolled[0].date, records[2].date);
        assert_eq!(rolled[0].metrics.sleep_hours, Some(7.0));
        assert_eq!(rolled[1].metrics.sleep_hours, Some(8.0));
    }

    #[test]
    fn test_rolling_average_short_input() {
        let records = records_with_sleep(&[Some(6.0); 6]);
        assert!(rolling_average(&records, 7).is_empty());
        assert!(rolling_average(&records, 0).is_empty());
    }

    #[test]
    fn test_rolling_average_all_undefined_window() {
        let records = records_with_sleep(&[None; 7]);
        let rolled = rolling_average(&records, 7);
        assert_eq!(rolled.len(), 1);
        assert_eq!(rolled[0].metrics.sleep_hours, None);
        assert_eq!(rolled[0].metrics.readiness, None);
    }

    #[test]
    fn test_rolling_readiness_uses_derived_values() {
        let records: Vec<DailyRecord> = (0..7)
            .map(|i| DailyRecord::new(start() + Duration::days(i)).with_vitals(8.0, 58.0, 56.0))
            .collect();
        let rolled = rolling_average(&records, 7);
        assert_eq!(rolled[0].metrics.readiness, Some(79.0));
    }

    #[test]
    fn test_week_over_week() {
        let mut sleep = vec![Some(6.0); 7];
        sleep.extend(vec![Some(8.0); 7]);
        let records = records_with_sleep(&sleep);

        let comparison = week_over_week(&records).unwrap();
        assert_eq!(comparison.prior.sleep_hours, Some(6.0));
        assert_eq!(comparison.recent.sleep_hours, Some(8.0));
        assert_eq!(comparison.change(Metric::Sleep), Some(2.0));
        let pct = comparison.percent_change(Metric::Sleep).unwrap();
        assert!((pct - 33.333).abs() < 0.01);
        assert_eq!(comparison.change(Metric::Hrv), None);
    }

    #[test]
    fn test_week_over_week_unavailable() {
        let records = records_with_sleep(&[Some(7.0); 13]);
        assert!(week_over_week(&records).is_none());
    }

    #[test]
    fn test_baseline_excludes_recent_week() {
        let mut sleep = vec![Some(6.0); 10];
        sleep.extend(vec![Some(9.0); 7]);
        let records = records_with_sleep(&sleep);

        let value = baseline(&records, Metric::Sleep, &BaselineWindow::default());
        assert_eq!(value, Some(6.0));
    }

    #[test]
    fn test_baseline_spans_at_most_thirty() {
        let mut sleep = vec![Some(1.0); 5];
        sleep.extend(vec![Some(7.0); 30]);
        sleep.extend(vec![Some(9.0); 7]);
        let records = records_with_sleep(&sleep);

        let value = baseline(&records, Metric::Sleep, &BaselineWindow::default());
        assert_eq!(value, Some(7.0));
    }

    #[test]
    fn test_baseline_requires_minimum_points() {
        let records = records_with_sleep(&[Some(7.0); 13]);
        assert_eq!(baseline(&records, Metric::Sleep, &BaselineWindow::default()), None);

        let records = records_with_sleep(&[Some(7.0); 14]);
        assert_eq!(baseline(&records, Metric::Sleep, &BaselineWindow::default()), Some(7.0));
    }

    #[test]
    fn test_readiness_extremes_tie_breaking() {
        let point = |d: i64, r: Option<f64>| ProcessedPoint {
            date: start() + Duration::days(d),
            metrics: MetricSet {
                readiness: r,
                ..MetricSet::default()
            },
        };
        let series = vec![
            point(0, Some(50.0)),
            point(1, Some(80.0)),
            point(2, None),
            point(3, Some(50.0)),
            point(4, Some(80.0)),
        ];

        let (lowest, highest) = readiness_extremes(&series).unwrap();
        assert_eq!(lowest.date, series[0].date);
        assert_eq!(highest.date, series[4].date);
        assert_eq!(period_average(&series), Some(65.0));

        assert!(readiness_extremes(&[point(0, None)]).is_none());
    }

    proptest! {
        #[test]
        fn prop_rolling_output_length(
            sleep in prop::collection::vec(prop::option::of(0.0f64..14.0), 0..60),
            window in 1usize..10,
        ) {
            let records = records_with_sleep(&sleep);
            let rolled = rolling_average(&records, window);
            let expected = if sleep.len() < window { 0 } else { sleep.len() - window + 1 };
            prop_assert_eq!(rolled.len(), expected);
        }

        #[test]
        fn prop_window_mean_never_nan(
            sleep in prop::collection::vec(prop::option::of(0.0f64..14.0), 1..20),
        ) {
            let records = records_with_sleep(&sleep);
            match window_mean(&records, Metric::Sleep) {
                Some(mean) => {
                    prop_assert!(mean.is_finite());
                    prop_assert!(sleep.iter().any(|s| s.is_some()));
                }
                None => prop_assert!(sleep.iter().all(|s| s.is_none())),
            }
        }
    }
}
