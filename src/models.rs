use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::normalizer;

/// One calendar day of observations for one user
///
/// Every metric is optional. An absent value means "not measured" and is
/// never treated as zero by any downstream computation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    /// Calendar day, unique per user
    pub date: NaiveDate,

    /// Hours slept
    #[serde(default, alias = "sleep", skip_serializing_if = "Option::is_none")]
    pub sleep_hours: Option<f64>,

    /// Heart rate variability in milliseconds
    #[serde(default, alias = "hrv", skip_serializing_if = "Option::is_none")]
    pub hrv_ms: Option<f64>,

    /// Resting heart rate in beats per minute
    #[serde(
        default,
        alias = "restingHR",
        alias = "resting_hr",
        skip_serializing_if = "Option::is_none"
    )]
    pub resting_hr_bpm: Option<f64>,

    /// Subjective feeling on a 1-5 ordinal scale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feeling: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,

    #[serde(
        default,
        alias = "active_minutes",
        skip_serializing_if = "Option::is_none"
    )]
    pub active_minutes: Option<f64>,

    /// Active energy burned (kcal)
    #[serde(
        default,
        alias = "active_energy",
        skip_serializing_if = "Option::is_none"
    )]
    pub active_energy: Option<f64>,

    /// Day strain as reported by some wearables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strain: Option<f64>,

    /// Precomputed readiness (0-100); derived when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl DailyRecord {
    /// Create an empty record for a date
    pub fn new(date: NaiveDate) -> Self {
        DailyRecord {
            date,
            ..Default::default()
        }
    }

    /// Builder-style setter for the three readiness inputs
    pub fn with_vitals(mut self, sleep_hours: f64, hrv_ms: f64, resting_hr_bpm: f64) -> Self {
        self.sleep_hours = Some(sleep_hours);
        self.hrv_ms = Some(hrv_ms);
        self.resting_hr_bpm = Some(resting_hr_bpm);
        self
    }

    /// Builder-style setter for an explicit recovery score
    pub fn with_recovery(mut self, recovery: f64) -> Self {
        self.recovery = Some(recovery);
        self
    }

    /// Overlay every value present in `other` onto this record
    ///
    /// Used when several import files describe the same day.
    pub fn merge_from(&mut self, other: &DailyRecord) {
        fn fill(slot: &mut Option<f64>, value: Option<f64>) {
            if value.is_some() {
                *slot = value;
            }
        }

        fill(&mut self.sleep_hours, other.sleep_hours);
        fill(&mut self.hrv_ms, other.hrv_ms);
        fill(&mut self.resting_hr_bpm, other.resting_hr_bpm);
        fill(&mut self.feeling, other.feeling);
        fill(&mut self.steps, other.steps);
        fill(&mut self.weight, other.weight);
        fill(&mut self.active_minutes, other.active_minutes);
        fill(&mut self.active_energy, other.active_energy);
        fill(&mut self.strain, other.strain);
        fill(&mut self.recovery, other.recovery);
        if other.note.is_some() {
            self.note = other.note.clone();
        }
    }
}

/// Quantities the aggregator averages over a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    Readiness,
    Sleep,
    Hrv,
    RestingHr,
    Feeling,
    Steps,
    Weight,
    ActiveMinutes,
}

impl Metric {
    pub const ALL: [Metric; 8] = [
        Metric::Readiness,
        Metric::Sleep,
        Metric::Hrv,
        Metric::RestingHr,
        Metric::Feeling,
        Metric::Steps,
        Metric::Weight,
        Metric::ActiveMinutes,
    ];

    /// Unit suffix for display
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Readiness => "%",
            Metric::Sleep => "h",
            Metric::Hrv => "ms",
            Metric::RestingHr => "bpm",
            Metric::Feeling => "/5",
            Metric::Steps => "",
            Metric::Weight => "",
            Metric::ActiveMinutes => "min",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Readiness => write!(f, "Readiness"),
            Metric::Sleep => write!(f, "Sleep"),
            Metric::Hrv => write!(f, "HRV"),
            Metric::RestingHr => write!(f, "Resting HR"),
            Metric::Feeling => write!(f, "Feeling"),
            Metric::Steps => write!(f, "Steps"),
            Metric::Weight => write!(f, "Weight"),
            Metric::ActiveMinutes => write!(f, "Active Minutes"),
        }
    }
}

/// One optional value per [`Metric`]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSet {
    pub readiness: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub hrv_ms: Option<f64>,
    pub resting_hr_bpm: Option<f64>,
    pub feeling: Option<f64>,
    pub steps: Option<f64>,
    pub weight: Option<f64>,
    pub active_minutes: Option<f64>,
}

impl MetricSet {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Readiness => self.readiness,
            Metric::Sleep => self.sleep_hours,
            Metric::Hrv => self.hrv_ms,
            Metric::RestingHr => self.resting_hr_bpm,
            Metric::Feeling => self.feeling,
            Metric::Steps => self.steps,
            Metric::Weight => self.weight,
            Metric::ActiveMinutes => self.active_minutes,
        }
    }

    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        let slot = match metric {
            Metric::Readiness => &mut self.readiness,
            Metric::Sleep => &mut self.sleep_hours,
            Metric::Hrv => &mut self.hrv_ms,
            Metric::RestingHr => &mut self.resting_hr_bpm,
            Metric::Feeling => &mut self.feeling,
            Metric::Steps => &mut self.steps,
            Metric::Weight => &mut self.weight,
            Metric::ActiveMinutes => &mut self.active_minutes,
        };
        *slot = value;
    }
}

/// A point of the processed (rolling or daily) series handed to charting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedPoint {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub metrics: MetricSet,
}

/// Anything with a date and per-metric optional values
///
/// The aggregator is generic over this so the same window logic runs on raw
/// records and on an already processed series.
pub trait MetricSource {
    fn date(&self) -> NaiveDate;
    fn metric(&self, metric: Metric) -> Option<f64>;
}

impl MetricSource for DailyRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn metric(&self, metric: Metric) -> Option<f64> {
        let raw = match metric {
            Metric::Readiness => return normalizer::readiness_value(self),
            Metric::Sleep => self.sleep_hours,
            Metric::Hrv => self.hrv_ms,
            Metric::RestingHr => self.resting_hr_bpm,
            Metric::Feeling => self.feeling,
            Metric::Steps => self.steps,
            Metric::Weight => self.weight,
            Metric::ActiveMinutes => self.active_minutes,
        };
        normalizer::sanitize(raw)
    }
}

impl MetricSource for ProcessedPoint {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn metric(&self, metric: Metric) -> Option<f64> {
        self.metrics.get(metric)
    }
}

/// Presentation mode of the series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// 7-day rolling averages
    Rolling,
    /// Raw daily values
    Daily,
}

impl ViewMode {
    /// How the comparison point is named in insight texts
    pub fn comparison_label(&self) -> &'static str {
        match self {
            ViewMode::Rolling => "last week",
            ViewMode::Daily => "yesterday",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::Rolling => write!(f, "rolling"),
            ViewMode::Daily => write!(f, "daily"),
        }
    }
}

impl std::str::FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rolling" | "trend" => Ok(ViewMode::Rolling),
            "daily" | "day" => Ok(ViewMode::Daily),
            _ => Err(format!("Invalid view mode: {}", s)),
        }
    }
}

/// Category of a generated insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    /// Prescriptive daily decision text
    Takeaway,
    /// Event-driven insight gated by the trigger rules
    Trigger,
    /// Behavior-outcome reinforcement statement
    Causal,
    /// Data-quality trust note
    Confidence,
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsightKind::Takeaway => write!(f, "Takeaway"),
            InsightKind::Trigger => write!(f, "Insight"),
            InsightKind::Causal => write!(f, "Pattern"),
            InsightKind::Confidence => write!(f, "Confidence"),
        }
    }
}

/// A tagged text output of the engine
///
/// Insights are recomputed on every evaluation and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub kind: InsightKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_ref: Option<Metric>,
}

impl Insight {
    pub fn new(kind: InsightKind, text: impl Into<String>) -> Self {
        Insight {
            kind,
            text: text.into(),
            metric_ref: None,
        }
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric_ref = Some(metric);
        self
    }
}
