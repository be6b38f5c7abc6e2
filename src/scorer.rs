//! Readiness scoring
//!
//! # Formula
//!
//! ```text
//! readiness = 60
//!           + (hrv - 50) * 0.80        HRV, ~40% weight
//!           + (8 - restingHr / 10) * 2 resting heart rate
//!           + (sleepHours - 7) * 8     sleep, ~35% weight
//! ```
//!
//! The derived estimate is clamped to 20-95 and rounded. Scores shown
//! elsewhere are clamped to 0-100.
//!
//! # Contributions
//!
//! The per-factor contributions are explanatory heuristics with their own
//! constants. They do not add up to `readiness - 60` and are not meant to;
//! they only rank the factors for human-readable attribution.
//!
//! # Bands
//!
//! Two independent band systems exist and must stay separate:
//! - [`TakeawayBand`] (75 / 55) drives the daily takeaway and threshold
//!   crossing triggers
//! - [`StatusBand`] (67 / 34) drives the coarse status banner

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{Insight, InsightKind, Metric, MetricSet, ViewMode};

pub const BASE_READINESS: f64 = 60.0;
pub const ESTIMATE_MIN: f64 = 20.0;
pub const ESTIMATE_MAX: f64 = 95.0;

/// Limiter must be this far below the runner-up to be named in the takeaway
const LIMITER_MARGIN: f64 = 3.0;

/// Unclamped readiness formula
pub fn raw_readiness(sleep_hours: f64, hrv_ms: f64, resting_hr_bpm: f64) -> f64 {
    BASE_READINESS
        + (hrv_ms - 50.0) * 0.8
        + (8.0 - resting_hr_bpm / 10.0) * 2.0
        + (sleep_hours - 7.0) * 8.0
}

/// Bounded readiness estimate, `None` when any input is non-finite
pub fn estimate_readiness(sleep_hours: f64, hrv_ms: f64, resting_hr_bpm: f64) -> Option<u8> {
    if !(sleep_hours.is_finite() && hrv_ms.is_finite() && resting_hr_bpm.is_finite()) {
        return None;
    }

    let raw = raw_readiness(sleep_hours, hrv_ms, resting_hr_bpm);
    Some(raw.clamp(ESTIMATE_MIN, ESTIMATE_MAX).round() as u8)
}

/// Canonical 0-100 integer score
pub fn canonical_score(readiness: f64) -> Option<u8> {
    readiness
        .is_finite()
        .then(|| readiness.clamp(0.0, 100.0).round() as u8)
}

/// Factors that feed the readiness formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Factor {
    Sleep,
    Hrv,
    Rhr,
}

impl Factor {
    pub fn metric(&self) -> Metric {
        match self {
            Factor::Sleep => Metric::Sleep,
            Factor::Hrv => Metric::Hrv,
            Factor::Rhr => Metric::RestingHr,
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Factor::Sleep => write!(f, "Sleep"),
            Factor::Hrv => write!(f, "HRV"),
            Factor::Rhr => write!(f, "RHR"),
        }
    }
}

/// Signed per-factor contributions
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Contributions {
    pub sleep: Option<f64>,
    pub hrv: Option<f64>,
    pub rhr: Option<f64>,
}

impl Contributions {
    pub fn new(sleep_hours: Option<f64>, hrv_ms: Option<f64>, resting_hr_bpm: Option<f64>) -> Self {
        Contributions {
            sleep: sleep_hours.filter(|v| v.is_finite()).map(|s| (s - 7.0) * 8.0),
            hrv: hrv_ms.filter(|v| v.is_finite()).map(|h| (h - 50.0) * 0.8),
            rhr: resting_hr_bpm.filter(|v| v.is_finite()).map(|r| (60.0 - r) * 0.5),
        }
    }

    pub fn from_metrics(metrics: &MetricSet) -> Self {
        Self::new(metrics.sleep_hours, metrics.hrv_ms, metrics.resting_hr_bpm)
    }

    /// All three contributions sorted ascending, `None` if any is missing
    ///
    /// Ties keep Sleep, HRV, RHR order.
    pub fn ranked(&self) -> Option<[(Factor, f64); 3]> {
        let mut ranked = [
            (Factor::Sleep, self.sleep?),
            (Factor::Hrv, self.hrv?),
            (Factor::Rhr, self.rhr?),
        ];
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        Some(ranked)
    }

    /// Factor with the lowest contribution
    pub fn limiting_factor(&self) -> Option<Factor> {
        self.ranked().map(|ranked| ranked[0].0)
    }
}

/// Integer readiness plus its explanatory breakdown
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadinessScore {
    pub value: u8,
    pub contributions: Contributions,
}

impl ReadinessScore {
    /// Score a processed point; `None` when readiness is undefined
    pub fn from_metrics(metrics: &MetricSet) -> Option<Self> {
        Some(ReadinessScore {
            value: canonical_score(metrics.readiness?)?,
            contributions: Contributions::from_metrics(metrics),
        })
    }
}

/// Lower bounds of the upper two bands of a three-band system
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandThresholds {
    pub high: f64,
    pub moderate: f64,
}

impl BandThresholds {
    pub const TAKEAWAY: BandThresholds = BandThresholds {
        high: 75.0,
        moderate: 55.0,
    };

    pub const STATUS: BandThresholds = BandThresholds {
        high: 67.0,
        moderate: 34.0,
    };
}

/// Bands used by the daily takeaway and threshold crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TakeawayBand {
    High,
    Moderate,
    Low,
}

impl TakeawayBand {
    pub fn classify(readiness: f64, thresholds: &BandThresholds) -> Self {
        if readiness >= thresholds.high {
            TakeawayBand::High
        } else if readiness >= thresholds.moderate {
            TakeawayBand::Moderate
        } else {
            TakeawayBand::Low
        }
    }

    /// Training action sentence
    pub fn action(&self, mode: ViewMode) -> &'static str {
        match (self, mode) {
            (TakeawayBand::High, ViewMode::Daily) => "High-intensity training is supported.",
            (TakeawayBand::High, ViewMode::Rolling) => {
                "High-intensity training is supported by the trend."
            }
            (TakeawayBand::Moderate, ViewMode::Daily) => {
                "Moderate training recommended. Cap peak intensity."
            }
            (TakeawayBand::Moderate, ViewMode::Rolling) => {
                "Moderate training recommended. Cap peak intensity for consistency."
            }
            (TakeawayBand::Low, ViewMode::Daily) => "Prioritize recovery or light movement.",
            (TakeawayBand::Low, ViewMode::Rolling) => {
                "Prioritize recovery or light movement until the trend improves."
            }
        }
    }
}

impl fmt::Display for TakeawayBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TakeawayBand::High => write!(f, "high"),
            TakeawayBand::Moderate => write!(f, "moderate"),
            TakeawayBand::Low => write!(f, "low"),
        }
    }
}

/// Bands used by the status banner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusBand {
    High,
    Moderate,
    Low,
}

impl StatusBand {
    pub fn classify(readiness: f64, thresholds: &BandThresholds) -> Self {
        if readiness >= thresholds.high {
            StatusBand::High
        } else if readiness >= thresholds.moderate {
            StatusBand::Moderate
        } else {
            StatusBand::Low
        }
    }

    pub fn banner(&self) -> &'static str {
        match self {
            StatusBand::High => "Ready for high-intensity training",
            StatusBand::Moderate => "Moderate training recommended",
            StatusBand::Low => "Focus on recovery",
        }
    }
}

/// Build the daily takeaway for the current point of the series
pub fn daily_takeaway(current: &MetricSet, mode: ViewMode, bands: &BandThresholds) -> Insight {
    let Some(readiness) = current.readiness.and_then(canonical_score) else {
        return Insight::new(
            InsightKind::Takeaway,
            "Readiness unavailable. Add sleep, HRV, and resting HR to generate recovery.",
        );
    };

    let band = TakeawayBand::classify(f64::from(readiness), bands);
    let mut text = band.action(mode).to_string();

    if band == TakeawayBand::High {
        text.push_str(match mode {
            ViewMode::Daily => " Sleep and HRV are supportive.",
            ViewMode::Rolling => " Sleep and HRV trends are supportive.",
        });
        return Insight::new(InsightKind::Takeaway, text).with_metric(Metric::Readiness);
    }

    // HRV and RHR are ranked as displayed, i.e. rounded
    let contributions = Contributions::new(
        current.sleep_hours,
        current.hrv_ms.map(f64::round),
        current.resting_hr_bpm.map(f64::round),
    );

    match contributions.ranked() {
        Some([limiter, runner_up, _]) if limiter.1 < runner_up.1 - LIMITER_MARGIN => {
            text.push_str(match (limiter.0, mode) {
                (Factor::Sleep, ViewMode::Daily) => " Sleep duration was the constraint.",
                (Factor::Sleep, ViewMode::Rolling) => " Sleep duration is the primary limiter.",
                (Factor::Hrv, _) => " HRV indicates incomplete recovery.",
                (Factor::Rhr, ViewMode::Daily) => " Elevated resting HR suggests fatigue.",
                (Factor::Rhr, ViewMode::Rolling) => {
                    " Elevated resting HR trend suggests accumulated fatigue."
                }
            });
            Insight::new(InsightKind::Takeaway, text).with_metric(limiter.0.metric())
        }
        _ => {
            text.push_str(" Mixed signals across metrics.");
            Insight::new(InsightKind::Takeaway, text).with_metric(Metric::Readiness)
        }
    }
}
