use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::engine::ReadinessReport;
use crate::error::{ReadyRsError, Result};
use crate::models::DailyRecord;
use crate::weekly::{ReliabilitySignal, WeeklySummary};

pub mod csv;
pub mod json;
pub mod text;

/// Export format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Processed series, one row per day
    Csv,
    /// The full report document
    Json,
    /// Human-readable report
    Text,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Text => "txt",
        }
    }

    /// Guess the format from an output path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = ReadyRsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "text" | "txt" => Ok(ExportFormat::Text),
            _ => Err(ReadyRsError::Export(format!("Unsupported format: {}", s))),
        }
    }
}

/// Date range filter for exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        DateRange { start, end }
    }

    /// Check if a date falls within this range
    pub fn contains(&self, date: &NaiveDate) -> bool {
        let after_start = self.start.map_or(true, |start| date >= &start);
        let before_end = self.end.map_or(true, |end| date <= &end);
        after_start && before_end
    }

    /// Keep the records inside the range, preserving order
    pub fn filter_records(&self, records: &[DailyRecord]) -> Vec<DailyRecord> {
        records
            .iter()
            .filter(|r| self.contains(&r.date))
            .cloned()
            .collect()
    }
}

/// A report together with its weekly context, as written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportExport {
    pub generated_at: DateTime<Utc>,
    pub report: ReadinessReport,
    pub weekly: Vec<WeeklySummary>,
    pub reliability: Option<ReliabilitySignal>,
}

impl ReportExport {
    pub fn new(report: ReadinessReport, generated_at: DateTime<Utc>) -> Self {
        ReportExport {
            generated_at,
            report,
            weekly: Vec::new(),
            reliability: None,
        }
    }

    pub fn with_weekly(mut self, weekly: Vec<WeeklySummary>) -> Self {
        self.weekly = weekly;
        self
    }

    pub fn with_reliability(mut self, reliability: Option<ReliabilitySignal>) -> Self {
        self.reliability = reliability;
        self
    }
}

/// Write an export in the given format
pub fn export_report<P: AsRef<Path>>(
    export: &ReportExport,
    format: ExportFormat,
    output_path: P,
) -> Result<()> {
    let output_path = output_path.as_ref();
    match format {
        ExportFormat::Csv => csv::export_series(&export.report.series, output_path)?,
        ExportFormat::Json => json::export_report(export, output_path)?,
        ExportFormat::Text => text::export_report(export, output_path)?,
    }

    info!(
        path = %output_path.display(),
        format = format.extension(),
        points = export.report.series.len(),
        "Exported report"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("txt".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert!("pdf".parse::<ExportFormat>().is_err());
        assert_eq!(
            ExportFormat::from_path(Path::new("out/report.json")),
            Some(ExportFormat::Json)
        );
        assert_eq!(ExportFormat::from_path(Path::new("report")), None);
    }

    #[test]
    fn test_date_range() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 7, day).unwrap();
        let range = DateRange::new(Some(d(2)), Some(d(4)));
        assert!(!range.contains(&d(1)));
        assert!(range.contains(&d(2)));
        assert!(range.contains(&d(4)));
        assert!(!range.contains(&d(5)));

        let records: Vec<DailyRecord> = (1..=6).map(|day| DailyRecord::new(d(day))).collect();
        assert_eq!(range.filter_records(&records).len(), 3);
        assert_eq!(DateRange::default().filter_records(&records).len(), 6);
    }
}
