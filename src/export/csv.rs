use chrono::NaiveDate;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::error::{ReadyRsError, Result};
use crate::models::ProcessedPoint;
use crate::weekly::WeeklySummary;

/// Flat row of the processed series
#[derive(Serialize)]
struct SeriesRow {
    date: NaiveDate,
    readiness: Option<f64>,
    sleep_hours: Option<f64>,
    hrv_ms: Option<f64>,
    resting_hr_bpm: Option<f64>,
    feeling: Option<f64>,
    steps: Option<f64>,
    weight: Option<f64>,
    active_minutes: Option<f64>,
}

impl From<&ProcessedPoint> for SeriesRow {
    fn from(point: &ProcessedPoint) -> Self {
        let m = &point.metrics;
        SeriesRow {
            date: point.date,
            readiness: m.readiness,
            sleep_hours: m.sleep_hours,
            hrv_ms: m.hrv_ms,
            resting_hr_bpm: m.resting_hr_bpm,
            feeling: m.feeling,
            steps: m.steps,
            weight: m.weight,
            active_minutes: m.active_minutes,
        }
    }
}

#[derive(Serialize)]
struct WeeklyRow<'a> {
    week: usize,
    start: NaiveDate,
    end: NaiveDate,
    days: usize,
    recovery: Option<f64>,
    sleep_hours: Option<f64>,
    hrv_ms: Option<f64>,
    resting_hr_bpm: Option<f64>,
    feeling: Option<f64>,
    steps: Option<f64>,
    weight: Option<f64>,
    active_minutes: Option<f64>,
    strain: Option<f64>,
    recovery_trend_pct: Option<f64>,
    label: &'a str,
}

fn csv_error(err: impl std::fmt::Display) -> ReadyRsError {
    ReadyRsError::Export(format!("CSV write failed: {}", err))
}

/// Write the processed series as CSV; absent values are empty cells
pub fn write_series<W: Write>(series: &[ProcessedPoint], writer: W) -> Result<()> {
    let mut csv_writer = ::csv::Writer::from_writer(writer);
    for point in series {
        csv_writer.serialize(SeriesRow::from(point)).map_err(csv_error)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Export the processed series to a CSV file (suitable for spreadsheet plotting)
pub fn export_series<P: AsRef<Path>>(series: &[ProcessedPoint], output_path: P) -> Result<()> {
    let file = std::fs::File::create(output_path)?;
    write_series(series, file)
}

/// Write weekly summaries as CSV
pub fn write_weekly<W: Write>(weeks: &[WeeklySummary], writer: W) -> Result<()> {
    let mut csv_writer = ::csv::Writer::from_writer(writer);
    for week in weeks {
        let label = week.label();
        let a = &week.averages;
        csv_writer
            .serialize(WeeklyRow {
                week: week.week_number,
                start: week.start,
                end: week.end,
                days: week.days,
                recovery: a.recovery,
                sleep_hours: a.sleep_hours,
                hrv_ms: a.hrv_ms,
                resting_hr_bpm: a.resting_hr_bpm,
                feeling: a.feeling,
                steps: a.steps,
                weight: a.weight,
                active_minutes: a.active_minutes,
                strain: a.strain,
                recovery_trend_pct: week.trends.recovery,
                label: &label,
            })
            .map_err(csv_error)?;
    }
    csv_writer.flush()?;
    Ok(())
}
