//! Readiness evaluation pipeline
//!
//! `records -> contract check -> normalize -> active series -> score ->
//! insights + aggregates`. The pipeline is a pure function of its inputs:
//! the evaluation moment is passed in, nothing is cached, and two calls with
//! the same input produce the same report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregator::{self, WeekComparison};
use crate::causal;
use crate::confidence::{self, Confidence};
use crate::config::EngineConfig;
use crate::error::{ContractViolation, Result};
use crate::models::{DailyRecord, Insight, Metric, ProcessedPoint, ViewMode};
use crate::normalizer;
use crate::scorer::{self, ReadinessScore, StatusBand};
use crate::triggers::{self, ComparisonPoints};

/// Default number of series points kept in a report
pub const DEFAULT_DAYS_TO_SHOW: usize = 30;

/// Parameters of a single evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    pub mode: ViewMode,
    /// Trailing series points kept; 0 keeps the whole series
    pub days_to_show: usize,
    /// "Now" for recency checks
    pub current_moment: DateTime<Utc>,
}

impl EvaluationRequest {
    pub fn new(mode: ViewMode, current_moment: DateTime<Utc>) -> Self {
        EvaluationRequest {
            mode,
            days_to_show: DEFAULT_DAYS_TO_SHOW,
            current_moment,
        }
    }

    pub fn with_days_to_show(mut self, days_to_show: usize) -> Self {
        self.days_to_show = days_to_show;
        self
    }
}

/// Exclude-recent baselines of the readiness inputs
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baselines {
    pub sleep_hours: Option<f64>,
    pub hrv_ms: Option<f64>,
    pub resting_hr_bpm: Option<f64>,
}

/// Everything one evaluation produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessReport {
    pub mode: ViewMode,
    /// Active series after the `days_to_show` cut, ready for charting
    pub series: Vec<ProcessedPoint>,
    /// Rounded readiness of the current point
    pub readiness: Option<u8>,
    /// Change of the rounded readiness vs the previous point
    pub change: Option<i64>,
    pub status: Option<StatusBand>,
    pub score: Option<ReadinessScore>,
    pub takeaway: Option<Insight>,
    pub trigger: Option<Insight>,
    pub causal: Option<Insight>,
    pub confidence: Confidence,
    pub baselines: Baselines,
    pub week_over_week: Option<WeekComparison>,
    pub period_average: Option<f64>,
    pub lowest: Option<ProcessedPoint>,
    pub highest: Option<ProcessedPoint>,
    pub trend_headline: Option<String>,
}

impl ReadinessReport {
    /// All insights in presentation order, at most one per kind
    pub fn insights(&self) -> Vec<Insight> {
        [&self.takeaway, &self.trigger, &self.causal]
            .into_iter()
            .flatten()
            .cloned()
            .chain(std::iter::once(self.confidence.to_insight()))
            .collect()
    }

    /// Current point of the series
    pub fn current(&self) -> Option<&ProcessedPoint> {
        self.series.last()
    }
}

/// Check that dates are strictly ascending
pub fn check_order(records: &[DailyRecord]) -> std::result::Result<(), ContractViolation> {
    for (index, pair) in records.windows(2).enumerate() {
        let (previous, current) = (pair[0].date, pair[1].date);
        if current == previous {
            return Err(ContractViolation::DuplicateDate {
                index: index + 1,
                date: current,
            });
        }
        if current < previous {
            return Err(ContractViolation::UnsortedInput {
                index: index + 1,
                previous,
                current,
            });
        }
    }
    Ok(())
}

/// The readiness analytics engine
#[derive(Debug, Clone, Default)]
pub struct ReadinessEngine {
    config: EngineConfig,
}

impl ReadinessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        ReadinessEngine { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Active series for a mode over normalized records
    pub fn process(&self, normalized: &[DailyRecord], mode: ViewMode) -> Vec<ProcessedPoint> {
        match mode {
            ViewMode::Rolling => aggregator::rolling_average(normalized, self.config.rolling_window),
            ViewMode::Daily => aggregator::daily_series(normalized),
        }
    }

    /// Evaluate a day-ordered record sequence
    ///
    /// Records must be in strictly ascending date order. The engine never
    /// reorders its input; an out-of-order or duplicate date fails the call.
    pub fn evaluate(&self, records: &[DailyRecord], request: &EvaluationRequest) -> Result<ReadinessReport> {
        check_order(records)?;

        let normalized = normalizer::normalize(records);
        let processed = self.process(&normalized, request.mode);

        let keep = match request.days_to_show {
            0 => processed.len(),
            n => n.min(processed.len()),
        };
        let series = processed[processed.len() - keep..].to_vec();

        let confidence = confidence::estimate(records, &series, request.mode, request.current_moment);

        let Some(points) = ComparisonPoints::from_series(&series) else {
            tracing::debug!(records = records.len(), mode = %request.mode, "Empty series");
            return Ok(ReadinessReport {
                mode: request.mode,
                series,
                readiness: None,
                change: None,
                status: None,
                score: None,
                takeaway: None,
                trigger: None,
                causal: None,
                confidence,
                baselines: Baselines::default(),
                week_over_week: aggregator::week_over_week(&normalized),
                period_average: None,
                lowest: None,
                highest: None,
                trend_headline: None,
            });
        };

        let current = points.current.metrics;
        let readiness = current.readiness.and_then(scorer::canonical_score);
        let change = readiness.zip(points.previous.and_then(|p| p.metrics.readiness)).map(
            |(now, before)| i64::from(now) - before.round() as i64,
        );
        let status = readiness
            .map(|r| StatusBand::classify(f64::from(r), &self.config.status_bands));

        let takeaway = scorer::daily_takeaway(&current, request.mode, &self.config.takeaway_bands);
        let trigger = triggers::evaluate(&series, request.mode, &self.config.takeaway_bands);
        let causal = causal::evaluate(&series);

        let baseline = |metric| aggregator::baseline(&processed, metric, &self.config.baseline);
        let baselines = Baselines {
            sleep_hours: baseline(Metric::Sleep),
            hrv_ms: baseline(Metric::Hrv),
            resting_hr_bpm: baseline(Metric::RestingHr),
        };

        let period_average = aggregator::period_average(&series);
        let extremes = aggregator::readiness_extremes(&series);
        let trend_headline = triggers::trend_headline(&series, period_average);

        tracing::debug!(
            records = records.len(),
            points = series.len(),
            mode = %request.mode,
            readiness = ?readiness,
            trigger = trigger.is_some(),
            causal = causal.is_some(),
            confidence = %confidence.level,
            "Evaluated readiness"
        );

        Ok(ReadinessReport {
            mode: request.mode,
            score: ReadinessScore::from_metrics(&current),
            readiness,
            change,
            status,
            takeaway: Some(takeaway),
            trigger,
            causal,
            confidence,
            baselines,
            week_over_week: aggregator::week_over_week(&normalized),
            period_average,
            lowest: extremes.map(|(low, _)| low),
            highest: extremes.map(|(_, high)| high),
            trend_headline,
            series,
        })
    }
}
