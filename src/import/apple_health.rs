//! Apple Health `export.xml` importer
//!
//! Exports easily reach hundreds of megabytes, so the file is streamed with
//! quick-xml and only `<Record>` elements are inspected. Samples are bucketed
//! by the UTC calendar day of their `startDate`.

use chrono::{DateTime, NaiveDate, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{ImportError, Result};
use crate::import::{extension_of, unreadable, ImportFormat};
use crate::models::DailyRecord;

const STEP_COUNT: &str = "HKQuantityTypeIdentifierStepCount";
const HRV_SDNN: &str = "HKQuantityTypeIdentifierHeartRateVariabilitySDNN";
const RESTING_HEART_RATE: &str = "HKQuantityTypeIdentifierRestingHeartRate";
const EXERCISE_TIME: &str = "HKQuantityTypeIdentifierAppleExerciseTime";
const ACTIVE_ENERGY: &str = "HKQuantityTypeIdentifierActiveEnergyBurned";
const BODY_MASS: &str = "HKQuantityTypeIdentifierBodyMass";
const SLEEP_ANALYSIS: &str = "HKCategoryTypeIdentifierSleepAnalysis";
/// Matches the legacy "Asleep" value and the newer stage values
const ASLEEP_PREFIX: &str = "HKCategoryValueSleepAnalysisAsleep";

const PROGRESS_TICK: usize = 10_000;

/// Attributes of interest on one `<Record>`
#[derive(Debug, Default)]
struct RawRecord {
    kind: Option<String>,
    value: Option<String>,
    start: Option<String>,
    end: Option<String>,
}

impl RawRecord {
    fn from_element(element: &BytesStart<'_>) -> Result<Self> {
        let mut raw = RawRecord::default();
        for attr in element.attributes() {
            let attr = attr.map_err(|e| xml_error(e.to_string()))?;
            let slot = match attr.key.as_ref() {
                b"type" => &mut raw.kind,
                b"value" => &mut raw.value,
                b"startDate" => &mut raw.start,
                b"endDate" => &mut raw.end,
                _ => continue,
            };
            let value = attr.unescape_value().map_err(|e| xml_error(e.to_string()))?;
            *slot = Some(value.into_owned());
        }
        Ok(raw)
    }
}

fn xml_error(reason: String) -> ImportError {
    ImportError::ParseError {
        format: "Apple Health XML".to_string(),
        reason,
    }
}

/// Parse an export timestamp such as `2024-01-15 07:30:00 -0800`
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S %z")
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Running sums and samples for one day
#[derive(Debug, Default)]
struct DayAccumulator {
    steps: Option<f64>,
    sleep_hours: f64,
    hrv: Vec<f64>,
    resting_hr: Vec<f64>,
    active_minutes: f64,
    active_energy: f64,
    weight: Vec<f64>,
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Zero sums mean nothing was recorded
fn nonzero(value: f64) -> Option<f64> {
    (value != 0.0).then_some(value)
}

impl DayAccumulator {
    fn add(&mut self, raw: &RawRecord, start: DateTime<Utc>) {
        let Some(kind) = raw.kind.as_deref() else {
            return;
        };

        if kind == SLEEP_ANALYSIS {
            let asleep = raw
                .value
                .as_deref()
                .is_some_and(|v| v.starts_with(ASLEEP_PREFIX));
            let end = raw.end.as_deref().and_then(parse_timestamp);
            if let (true, Some(end)) = (asleep, end) {
                let hours = (end - start).num_seconds() as f64 / 3600.0;
                if hours > 0.0 {
                    self.sleep_hours += hours;
                }
            }
            return;
        }

        let Some(value) = raw
            .value
            .as_deref()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
        else {
            return;
        };

        match kind {
            STEP_COUNT => *self.steps.get_or_insert(0.0) += value,
            HRV_SDNN => self.hrv.push(value),
            RESTING_HEART_RATE => self.resting_hr.push(value),
            EXERCISE_TIME => self.active_minutes += value,
            ACTIVE_ENERGY => self.active_energy += value,
            BODY_MASS => self.weight.push(value),
            _ => {}
        }
    }

    fn into_record(self, date: NaiveDate) -> DailyRecord {
        DailyRecord {
            date,
            steps: self.steps.map(f64::round),
            sleep_hours: nonzero(self.sleep_hours).map(round_to_tenth),
            hrv_ms: mean(&self.hrv).map(f64::round),
            resting_hr_bpm: mean(&self.resting_hr).map(f64::round),
            active_minutes: nonzero(self.active_minutes).map(f64::round),
            active_energy: nonzero(self.active_energy).map(f64::round),
            weight: mean(&self.weight).map(round_to_tenth),
            ..Default::default()
        }
    }
}

/// Streaming importer for Apple Health exports
pub struct AppleHealthImporter {
    show_progress: bool,
}

impl AppleHealthImporter {
    pub fn new() -> Self {
        Self {
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    fn spinner(&self) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
            pb.set_style(style);
        }
        pb.set_message("Reading Apple Health export...");
        Some(pb)
    }

    /// Stream an export and reduce it to one record per day
    pub fn parse_reader<R: BufRead>(&self, source: R) -> Result<Vec<DailyRecord>> {
        let mut reader = Reader::from_reader(source);
        reader.trim_text(true);

        let progress = self.spinner();
        let mut days: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();
        let mut buf = Vec::new();
        let mut seen = 0usize;
        let mut skipped = 0usize;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"Record" => {
                    seen += 1;
                    let raw = RawRecord::from_element(e)?;
                    match raw.start.as_deref().and_then(parse_timestamp) {
                        Some(start) if raw.kind.is_some() => {
                            days.entry(start.date_naive()).or_default().add(&raw, start);
                        }
                        _ => skipped += 1,
                    }

                    if seen % PROGRESS_TICK == 0 {
                        if let Some(pb) = &progress {
                            pb.set_message(format!("{} records, {} days", seen, days.len()));
                            pb.tick();
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(xml_error(format!(
                        "at position {}: {}",
                        reader.buffer_position(),
                        e
                    ))
                    .into())
                }
            }
            buf.clear();
        }

        if let Some(pb) = progress {
            pb.finish_with_message(format!("Read {} records into {} days", seen, days.len()));
        }

        if seen == 0 {
            return Err(ImportError::InvalidStructure {
                reason: "no <Record> elements found".to_string(),
            }
            .into());
        }

        debug!(records = seen, skipped, days = days.len(), "Bucketed Apple Health records");
        Ok(days
            .into_iter()
            .map(|(date, acc)| acc.into_record(date))
            .collect())
    }
}

impl Default for AppleHealthImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportFormat for AppleHealthImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        extension_of(file_path).as_deref() == Some("xml")
    }

    fn import_file(&self, file_path: &Path) -> Result<Vec<DailyRecord>> {
        let file = File::open(file_path).map_err(|e| unreadable(file_path, e))?;
        let records = self.parse_reader(BufReader::new(file))?;
        info!(file = %file_path.display(), days = records.len(), "Converted Apple Health export");
        Ok(records)
    }

    fn get_format_name(&self) -> &'static str {
        "Apple Health XML"
    }
}
