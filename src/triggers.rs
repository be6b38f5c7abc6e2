//! Event-driven trigger engine
//!
//! Compares the current point of the active series with its comparison
//! point (a week ago in rolling mode, yesterday in daily mode) and emits at
//! most one insight. The rule table is evaluated in order:
//!
//! 1. readiness shift of 10 points or more, with a sub-cause
//! 2. change of the limiting factor while below the high band
//! 3. crossing between takeaway bands
//!
//! Nothing is persisted between evaluations. Silence is the common outcome.

use std::fmt;

use crate::models::{Insight, InsightKind, Metric, MetricSet, ProcessedPoint, ViewMode};
use crate::rules::{first_match, Rule};
use crate::scorer::{BandThresholds, Contributions, Factor, TakeawayBand};

/// Minimum absolute readiness change for a shift insight
pub const SHIFT_THRESHOLD: i64 = 10;
/// Sleep change (hours) that attributes a shift to sleep
pub const SLEEP_DRIVER_DELTA: f64 = 0.5;
/// HRV change (ms) that attributes a shift to HRV
pub const HRV_DRIVER_DELTA: f64 = 5.0;
/// Week change beyond which the trend headline reports a direction
pub const TREND_THRESHOLD: i64 = 8;

/// Current, previous and week-ago points of a series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonPoints<'a> {
    pub current: &'a ProcessedPoint,
    pub previous: Option<&'a ProcessedPoint>,
    pub week_ago: Option<&'a ProcessedPoint>,
}

impl<'a> ComparisonPoints<'a> {
    pub fn from_series(series: &'a [ProcessedPoint]) -> Option<Self> {
        let len = series.len();
        Some(ComparisonPoints {
            current: series.last()?,
            previous: (len > 1).then(|| &series[len - 2]),
            week_ago: (len > 7).then(|| &series[len - 8]),
        })
    }

    /// Point the trigger rules compare against
    pub fn comparison(&self, mode: ViewMode) -> Option<&'a ProcessedPoint> {
        match mode {
            ViewMode::Rolling => self.week_ago,
            ViewMode::Daily => self.previous,
        }
    }
}

/// Limiting factor that changed between the comparison and current point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverShift {
    pub improved: Factor,
    pub limiting: Factor,
}

impl DriverShift {
    /// `None` when either limiter is undefined or both are the same factor
    pub fn between(comparison: &MetricSet, current: &MetricSet) -> Option<Self> {
        let improved = Contributions::from_metrics(comparison).limiting_factor()?;
        let limiting = Contributions::from_metrics(current).limiting_factor()?;
        (improved != limiting).then_some(DriverShift { improved, limiting })
    }
}

impl fmt::Display for DriverShift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} improved, but {} is now the limiting factor.",
            self.improved, self.limiting
        )
    }
}

/// Everything a trigger rule looks at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerContext {
    pub mode: ViewMode,
    pub current: MetricSet,
    pub comparison: MetricSet,
    /// Rounded current readiness
    pub readiness: i64,
    /// Rounded comparison readiness
    pub comparison_readiness: i64,
    pub driver_shift: Option<DriverShift>,
    pub bands: BandThresholds,
}

impl TriggerContext {
    /// `None` when either readiness is undefined
    pub fn new(
        current: &MetricSet,
        comparison: &MetricSet,
        mode: ViewMode,
        bands: BandThresholds,
    ) -> Option<Self> {
        Some(TriggerContext {
            mode,
            current: *current,
            comparison: *comparison,
            readiness: rounded(current.readiness)?,
            comparison_readiness: rounded(comparison.readiness)?,
            driver_shift: DriverShift::between(comparison, current),
            bands,
        })
    }

    fn signed_change(&self) -> i64 {
        self.readiness - self.comparison_readiness
    }

    fn is_shift(&self) -> bool {
        self.signed_change().abs() >= SHIFT_THRESHOLD
    }

    fn delta(&self, metric: Metric) -> Option<f64> {
        Some(self.current.get(metric)? - self.comparison.get(metric)?)
    }

    fn sleep_delta_is(&self, test: impl Fn(f64) -> bool) -> bool {
        self.delta(Metric::Sleep).is_some_and(test)
    }

    fn hrv_delta_is(&self, test: impl Fn(f64) -> bool) -> bool {
        self.delta(Metric::Hrv).is_some_and(test)
    }

    fn hrv_delta_ms(&self) -> i64 {
        self.delta(Metric::Hrv).map_or(0, |d| d.abs().round() as i64)
    }

    fn shift_prefix(&self) -> String {
        let direction = if self.signed_change() > 0 {
            "increased"
        } else {
            "dropped"
        };
        format!(
            "Readiness {} {}% vs {}.",
            direction,
            self.signed_change().abs(),
            self.mode.comparison_label()
        )
    }

    fn band_pair(&self) -> (TakeawayBand, TakeawayBand) {
        (
            TakeawayBand::classify(self.comparison_readiness as f64, &self.bands),
            TakeawayBand::classify(self.readiness as f64, &self.bands),
        )
    }
}

fn rounded(value: Option<f64>) -> Option<i64> {
    value.filter(|v| v.is_finite()).map(|v| v.round() as i64)
}

fn is_decline(c: &TriggerContext) -> bool {
    c.is_shift() && c.signed_change() < 0
}

fn is_increase(c: &TriggerContext) -> bool {
    c.is_shift() && c.signed_change() > 0
}

/// The trigger table in priority order
pub fn trigger_rules() -> [Rule<TriggerContext>; 11] {
    [
        Rule::new(
            "shift_decline_sleep",
            |c: &TriggerContext| is_decline(c) && c.sleep_delta_is(|d| d < -SLEEP_DRIVER_DELTA),
            |c: &TriggerContext| {
                format!(
                    "{} Sleep consistency declined and recovery metrics softened.",
                    c.shift_prefix()
                )
            },
        ),
        Rule::new(
            "shift_decline_hrv",
            |c: &TriggerContext| is_decline(c) && c.hrv_delta_is(|d| d < -HRV_DRIVER_DELTA),
            |c: &TriggerContext| {
                format!(
                    "{} HRV dropped {}ms, indicating accumulated fatigue.",
                    c.shift_prefix(),
                    c.hrv_delta_ms()
                )
            },
        ),
        Rule::new("shift_decline_mixed", is_decline, |c: &TriggerContext| {
            format!(
                "{} Mixed driver decline across sleep and recovery markers.",
                c.shift_prefix()
            )
        }),
        Rule::new(
            "shift_increase_sleep",
            |c: &TriggerContext| is_increase(c) && c.sleep_delta_is(|d| d > SLEEP_DRIVER_DELTA),
            |c: &TriggerContext| format!("{} Sleep gains drove the recovery improvement.", c.shift_prefix()),
        ),
        Rule::new(
            "shift_increase_hrv",
            |c: &TriggerContext| is_increase(c) && c.hrv_delta_is(|d| d > HRV_DRIVER_DELTA),
            |c: &TriggerContext| {
                format!(
                    "{} HRV increased {}ms, showing strong adaptation.",
                    c.shift_prefix(),
                    c.hrv_delta_ms()
                )
            },
        ),
        Rule::new("shift_increase_broad", is_increase, |c: &TriggerContext| {
            format!("{} Broad improvement across recovery markers.", c.shift_prefix())
        }),
        Rule::derived("driver_change", |c: &TriggerContext| {
            let shift = c.driver_shift.filter(|_| c.band_pair().1 != TakeawayBand::High)?;
            Some(shift.to_string())
        }),
        Rule::new(
            "crossing_to_high",
            |c: &TriggerContext| matches!(c.band_pair(), (prev, TakeawayBand::High) if prev != TakeawayBand::High),
            |c: &TriggerContext| {
                format!(
                    "You moved from {} to high readiness. Training intensity can increase.",
                    c.band_pair().0
                )
            },
        ),
        Rule::new(
            "crossing_high_to_moderate",
            |c: &TriggerContext| c.band_pair() == (TakeawayBand::High, TakeawayBand::Moderate),
            |_: &TriggerContext| {
                "Readiness dropped from high to moderate. Cap intensity but maintain training volume."
                    .to_string()
            },
        ),
        Rule::new(
            "crossing_to_low",
            |c: &TriggerContext| matches!(c.band_pair(), (prev, TakeawayBand::Low) if prev != TakeawayBand::Low),
            |_: &TriggerContext| {
                "Readiness crossed into low territory. Prioritize recovery before resuming high loads."
                    .to_string()
            },
        ),
        Rule::new(
            "crossing_low_to_moderate",
            |c: &TriggerContext| c.band_pair() == (TakeawayBand::Low, TakeawayBand::Moderate),
            |_: &TriggerContext| {
                "Readiness recovered to moderate band. Light to moderate training is appropriate."
                    .to_string()
            },
        ),
    ]
}

/// Evaluate the trigger table for a series
pub fn evaluate(series: &[ProcessedPoint], mode: ViewMode, bands: &BandThresholds) -> Option<Insight> {
    let points = ComparisonPoints::from_series(series)?;
    let comparison = points.comparison(mode)?;
    let context = TriggerContext::new(&points.current.metrics, &comparison.metrics, mode, *bands)?;

    let hit = first_match(&trigger_rules(), &context)?;
    let metric = match (hit.rule, context.driver_shift) {
        ("driver_change", Some(shift)) => shift.limiting.metric(),
        _ => Metric::Readiness,
    };

    Some(Insight::new(InsightKind::Trigger, hit.message).with_metric(metric))
}

/// Context of the trend headline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendContext {
    pub week_change: i64,
    pub sleep_change: Option<f64>,
    pub period_average: Option<f64>,
}

fn trend_rules() -> [Rule<TrendContext>; 6] {
    [
        Rule::new(
            "improving_sleep",
            |t: &TrendContext| t.week_change > TREND_THRESHOLD && t.sleep_change.is_some_and(|d| d > SLEEP_DRIVER_DELTA),
            |_: &TrendContext| "Readiness improving. Sleep gains driving recovery.".to_string(),
        ),
        Rule::new(
            "improving",
            |t: &TrendContext| t.week_change > TREND_THRESHOLD,
            |_: &TrendContext| "Readiness improving. HRV and RHR showing positive adaptation.".to_string(),
        ),
        Rule::new(
            "declining_sleep",
            |t: &TrendContext| t.week_change < -TREND_THRESHOLD && t.sleep_change.is_some_and(|d| d < -SLEEP_DRIVER_DELTA),
            |_: &TrendContext| "Sleep was the bottleneck this week. Keep training volume moderate.".to_string(),
        ),
        Rule::new(
            "declining",
            |t: &TrendContext| t.week_change < -TREND_THRESHOLD,
            |_: &TrendContext| "Readiness declining. Consider a recovery day or reduced intensity.".to_string(),
        ),
        Rule::new(
            "stable_around",
            |t: &TrendContext| t.period_average.is_some(),
            |t: &TrendContext| {
                format!(
                    "Readiness stable around {}%. Maintain current training load.",
                    t.period_average.map_or(0, |a| a.round() as i64)
                )
            },
        ),
        Rule::new(
            "stable",
            |_: &TrendContext| true,
            |_: &TrendContext| "Readiness stable. Maintain current training load.".to_string(),
        ),
    ]
}

/// One-line caption describing the week's direction
///
/// Needs a week-ago point with defined readiness.
pub fn trend_headline(series: &[ProcessedPoint], period_average: Option<f64>) -> Option<String> {
    let points = ComparisonPoints::from_series(series)?;
    let week_ago = points.week_ago?;

    let context = TrendContext {
        week_change: rounded(points.current.metrics.readiness)?
            - rounded(week_ago.metrics.readiness)?,
        sleep_change: points
            .current
            .metrics
            .sleep_hours
            .zip(week_ago.metrics.sleep_hours)
            .map(|(now, then)| now - then),
        period_average: period_average.filter(|a| a.is_finite()),
    };

    first_match(&trend_rules(), &context).map(|hit| hit.message)
}
