use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{ImportError, Result};
use crate::import::{extension_of, unreadable, ImportFormat};
use crate::models::DailyRecord;

/// Accepted top-level shapes
#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Wrapped { daily: Vec<DailyRecord> },
    Bare(Vec<DailyRecord>),
}

/// Importer for `{"daily": [...]}` documents or bare record arrays
pub struct JsonImporter;

impl JsonImporter {
    pub fn new() -> Self {
        Self
    }

    /// Parse a JSON document into date-sorted records
    pub fn parse_str(content: &str) -> Result<Vec<DailyRecord>> {
        let payload: Payload =
            serde_json::from_str(content).map_err(|e| ImportError::ParseError {
                format: "JSON".to_string(),
                reason: e.to_string(),
            })?;

        let mut records = match payload {
            Payload::Wrapped { daily } => daily,
            Payload::Bare(records) => records,
        };
        records.sort_by_key(|r| r.date);
        Ok(records)
    }
}

impl Default for JsonImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportFormat for JsonImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        extension_of(file_path).as_deref() == Some("json")
    }

    fn import_file(&self, file_path: &Path) -> Result<Vec<DailyRecord>> {
        let content = fs::read_to_string(file_path).map_err(|e| unreadable(file_path, e))?;
        Self::parse_str(&content)
    }

    fn get_format_name(&self) -> &'static str {
        "JSON"
    }
}
