//! Metric normalization
//!
//! Turns raw imported values into values the rest of the engine can trust:
//! non-finite or negative readings become absent, and every record gets a
//! readiness value (explicit when supplied, derived otherwise, absent when
//! neither is possible). Nothing here ever produces a default number for a
//! missing input.

use crate::models::DailyRecord;
use crate::scorer;

/// Drop readings that cannot be real measurements
pub fn sanitize(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

/// Readiness of a single record
///
/// An explicit, finite `recovery` wins and is clamped to the canonical
/// 0-100 range. Otherwise the bounded estimate is derived from sleep, HRV
/// and resting heart rate. Any missing or invalid input yields `None`.
pub fn readiness_value(record: &DailyRecord) -> Option<f64> {
    if let Some(recovery) = record.recovery.filter(|r| r.is_finite()) {
        return Some(recovery.clamp(0.0, 100.0));
    }

    derive_readiness(record).map(f64::from)
}

/// Derive the bounded readiness estimate from the record's vitals
pub fn derive_readiness(record: &DailyRecord) -> Option<u8> {
    scorer::estimate_readiness(
        sanitize(record.sleep_hours)?,
        sanitize(record.hrv_ms)?,
        sanitize(record.resting_hr_bpm)?,
    )
}

/// Clean a whole sequence of records
///
/// Returns copies with invalid metric values removed and `recovery` filled
/// with the record's readiness value. Order is preserved.
pub fn normalize(records: &[DailyRecord]) -> Vec<DailyRecord> {
    let mut discarded = 0usize;

    let normalized: Vec<DailyRecord> = records
        .iter()
        .map(|record| {
            let mut clean = record.clone();
            for slot in [
                &mut clean.sleep_hours,
                &mut clean.hrv_ms,
                &mut clean.resting_hr_bpm,
                &mut clean.feeling,
                &mut clean.steps,
                &mut clean.weight,
                &mut clean.active_minutes,
                &mut clean.active_energy,
                &mut clean.strain,
            ] {
                if slot.is_some() && sanitize(*slot).is_none() {
                    discarded += 1;
                    *slot = None;
                }
            }
            if clean.recovery.is_some_and(|r| !r.is_finite()) {
                discarded += 1;
            }
            clean.recovery = readiness_value(&clean);
            clean
        })
        .collect();

    if discarded > 0 {
        tracing::warn!(
            discarded,
            records = records.len(),
            "Discarded invalid metric values during normalization"
        );
    } else {
        tracing::debug!(records = records.len(), "Normalized records");
    }

    normalized
}
