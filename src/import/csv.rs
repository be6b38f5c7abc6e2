use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::warn;

use crate::error::{ImportError, Result};
use crate::import::{extension_of, unreadable, ImportFormat};
use crate::models::DailyRecord;

/// Fields a CSV column can map to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Date,
    Sleep,
    Hrv,
    RestingHr,
    Feeling,
    Steps,
    Weight,
    ActiveMinutes,
    ActiveEnergy,
    Strain,
    Recovery,
    Note,
}

/// CSV importer with flexible column mapping
pub struct CsvImporter {
    column_mapping: HashMap<String, Column>,
}

impl CsvImporter {
    pub fn new() -> Self {
        let mut column_mapping = HashMap::new();

        // Common column name variations
        Self::add_mapping(&mut column_mapping, Column::Date, &["date", "day", "calendar_date"]);
        Self::add_mapping(
            &mut column_mapping,
            Column::Sleep,
            &["sleep", "sleep_hours", "sleephours", "hours_slept", "sleep_duration"],
        );
        Self::add_mapping(&mut column_mapping, Column::Hrv, &["hrv", "hrv_ms", "hrvms", "rmssd", "sdnn"]);
        Self::add_mapping(
            &mut column_mapping,
            Column::RestingHr,
            &["restinghr", "resting_hr", "resting_hr_bpm", "restinghrbpm", "rhr", "resting_heart_rate"],
        );
        Self::add_mapping(&mut column_mapping, Column::Feeling, &["feeling", "mood", "wellbeing"]);
        Self::add_mapping(&mut column_mapping, Column::Steps, &["steps", "step_count"]);
        Self::add_mapping(&mut column_mapping, Column::Weight, &["weight", "body_mass", "bodyweight"]);
        Self::add_mapping(
            &mut column_mapping,
            Column::ActiveMinutes,
            &["activeminutes", "active_minutes", "exercise_minutes", "exercise_time"],
        );
        Self::add_mapping(
            &mut column_mapping,
            Column::ActiveEnergy,
            &["activeenergy", "active_energy", "active_calories", "kcal"],
        );
        Self::add_mapping(&mut column_mapping, Column::Strain, &["strain", "day_strain"]);
        Self::add_mapping(
            &mut column_mapping,
            Column::Recovery,
            &["recovery", "readiness", "recovery_score", "readiness_score"],
        );
        Self::add_mapping(&mut column_mapping, Column::Note, &["note", "notes", "comment"]);

        Self { column_mapping }
    }

    fn add_mapping(mapping: &mut HashMap<String, Column>, column: Column, variations: &[&str]) {
        for variation in variations {
            mapping.insert(variation.to_lowercase(), column);
        }
    }

    fn normalize_column_name(&self, name: &str) -> Option<Column> {
        let normalized = name.trim().to_lowercase().replace([' ', '-'], "_");
        self.column_mapping.get(&normalized).copied()
    }

    fn parse_date(value: &str) -> Option<NaiveDate> {
        const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
        const DATETIME_FORMATS: [&str; 3] =
            ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.fZ"];

        DATE_FORMATS
            .iter()
            .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
            .or_else(|| {
                DATETIME_FORMATS
                    .iter()
                    .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
                    .map(|dt| dt.date())
            })
    }

    /// Parse CSV content from any reader
    pub fn parse_reader<R: Read>(&self, reader: R) -> Result<Vec<DailyRecord>> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let parse_error = |reason: String| ImportError::ParseError {
            format: "CSV".to_string(),
            reason,
        };

        let headers = csv_reader.headers().map_err(|e| parse_error(e.to_string()))?.clone();
        let columns: Vec<Option<Column>> =
            headers.iter().map(|h| self.normalize_column_name(h)).collect();

        let date_index = columns
            .iter()
            .position(|c| *c == Some(Column::Date))
            .ok_or_else(|| ImportError::MissingData {
                field: "date".to_string(),
            })?;

        let mut records = Vec::new();
        for (row, result) in csv_reader.records().enumerate() {
            let line = row + 2;
            let row_data = result.map_err(|e| parse_error(format!("line {}: {}", line, e)))?;

            let raw_date = row_data.get(date_index).unwrap_or_default();
            if raw_date.is_empty() {
                warn!(line, "Skipping CSV row without a date");
                continue;
            }
            let date = Self::parse_date(raw_date)
                .ok_or_else(|| parse_error(format!("line {}: invalid date '{}'", line, raw_date)))?;

            records.push(Self::record_from_row(date, &columns, &row_data, line));
        }

        records.sort_by_key(|r| r.date);
        Ok(records)
    }

    fn record_from_row(
        date: NaiveDate,
        columns: &[Option<Column>],
        row: &StringRecord,
        line: usize,
    ) -> DailyRecord {
        let mut record = DailyRecord::new(date);

        for (column, value) in columns.iter().zip(row.iter()) {
            let Some(column) = column else { continue };
            if value.is_empty() || *column == Column::Date {
                continue;
            }
            if *column == Column::Note {
                record.note = Some(value.to_string());
                continue;
            }

            let number = match value.parse::<f64>() {
                Ok(n) => n,
                Err(_) => {
                    warn!(line, column = ?column, value, "Discarding non-numeric CSV value");
                    continue;
                }
            };

            let slot = match column {
                Column::Sleep => &mut record.sleep_hours,
                Column::Hrv => &mut record.hrv_ms,
                Column::RestingHr => &mut record.resting_hr_bpm,
                Column::Feeling => &mut record.feeling,
                Column::Steps => &mut record.steps,
                Column::Weight => &mut record.weight,
                Column::ActiveMinutes => &mut record.active_minutes,
                Column::ActiveEnergy => &mut record.active_energy,
                Column::Strain => &mut record.strain,
                Column::Recovery => &mut record.recovery,
                Column::Date | Column::Note => continue,
            };
            *slot = Some(number);
        }

        record
    }
}

impl Default for CsvImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportFormat for CsvImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        extension_of(file_path).as_deref() == Some("csv")
    }

    fn import_file(&self, file_path: &Path) -> Result<Vec<DailyRecord>> {
        let file = std::fs::File::open(file_path).map_err(|e| unreadable(file_path, e))?;
        self.parse_reader(file)
    }

    fn get_format_name(&self) -> &'static str {
        "CSV"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReadyRsError;

    #[test]
    fn test_column_name_variations() {
        let csv = "Date,Sleep Hours,HRV,Resting-HR,Readiness,Notes\n\
                   2024-04-02,7.5,55,57,72,long run\n\
                   2024-04-01,6.8,49,60,,\n";
        let records = CsvImporter::new().parse_reader(csv.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert_eq!(records[0].recovery, None);
        assert_eq!(records[1].sleep_hours, Some(7.5));
        assert_eq!(records[1].resting_hr_bpm, Some(57.0));
        assert_eq!(records[1].recovery, Some(72.0));
        assert_eq!(records[1].note.as_deref(), Some("long run"));
    }

    #[test]
    fn test_other_date_formats() {
        let csv = "day,steps\n04/03/2024,9000\n2024-04-04T06:30:00,7000\n";
        let records = CsvImporter::new().parse_reader(csv.as_bytes()).unwrap();
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 4, 3).unwrap());
        assert_eq!(records[1].date, NaiveDate::from_ymd_opt(2024, 4, 4).unwrap());
    }

    #[test]
    fn test_non_numeric_values_are_discarded() {
        let csv = "date,hrv,steps\n2024-04-01,n/a,8500\n";
        let records = CsvImporter::new().parse_reader(csv.as_bytes()).unwrap();
        assert_eq!(records[0].hrv_ms, None);
        assert_eq!(records[0].steps, Some(8500.0));
    }

    #[test]
    fn test_missing_date_column() {
        let err = CsvImporter::new()
            .parse_reader("sleep,hrv\n7,50\n".as_bytes())
            .unwrap_err();
        assert!(matches!(
            err,
            ReadyRsError::Import(ImportError::MissingData { ref field }) if field == "date"
        ));
    }

    #[test]
    fn test_invalid_date_reports_line() {
        let err = CsvImporter::new()
            .parse_reader("date,sleep\n2024-04-01,7\nyesterday,8\n".as_bytes())
            .unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }
}
