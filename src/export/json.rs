use std::path::Path;

use super::ReportExport;
use crate::error::Result;

/// Pretty-printed JSON document of a report export
pub fn to_json_string(export: &ReportExport) -> Result<String> {
    Ok(serde_json::to_string_pretty(export)?)
}

/// Export a report to a JSON file
pub fn export_report<P: AsRef<Path>>(export: &ReportExport, output_path: P) -> Result<()> {
    let file = std::fs::File::create(output_path)?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), export)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EvaluationRequest, ReadinessEngine};
    use crate::models::{DailyRecord, ViewMode};
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    #[test]
    fn test_json_document_shape() {
        let start = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        let records: Vec<DailyRecord> = (0..10)
            .map(|i| DailyRecord::new(start + Duration::days(i)).with_vitals(7.2, 52.0, 58.0))
            .collect();
        let now = Utc.with_ymd_and_hms(2024, 9, 10, 12, 0, 0).unwrap();
        let report = ReadinessEngine::new()
            .evaluate(&records, &EvaluationRequest::new(ViewMode::Daily, now))
            .unwrap();

        let json = to_json_string(&ReportExport::new(report, now)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["report"]["mode"], "daily");
        assert_eq!(value["report"]["series"].as_array().unwrap().len(), 10);
        assert_eq!(value["report"]["series"][0]["date"], "2024-09-01");
        assert!(value["report"]["series"][0]["readiness"].is_number());
        assert!(value["weekly"].as_array().unwrap().is_empty());
        assert!(value["generatedAt"].is_string());
    }
}
