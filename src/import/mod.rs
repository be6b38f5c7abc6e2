use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{ImportError, ReadyRsError, Result};
use crate::models::DailyRecord;

pub mod apple_health;
pub mod csv;
pub mod json;

/// Trait for importing daily health records from different file formats
pub trait ImportFormat: Send + Sync {
    /// Check if this importer can handle the given file
    fn can_import(&self, file_path: &Path) -> bool;

    /// Import daily records from the file
    fn import_file(&self, file_path: &Path) -> Result<Vec<DailyRecord>>;

    /// Get the format name for this importer
    fn get_format_name(&self) -> &'static str;
}

/// Lower-cased file extension
pub(crate) fn extension_of(file_path: &Path) -> Option<String> {
    file_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

pub(crate) fn unreadable(file_path: &Path, err: impl std::fmt::Display) -> ReadyRsError {
    ImportError::Unreadable {
        path: file_path.to_path_buf(),
        reason: err.to_string(),
    }
    .into()
}

/// Collapse records to one per date, in ascending date order
///
/// Later records overlay the values of earlier ones for the same day.
pub fn merge_by_date(records: impl IntoIterator<Item = DailyRecord>) -> Vec<DailyRecord> {
    let mut by_date: BTreeMap<NaiveDate, DailyRecord> = BTreeMap::new();
    for record in records {
        match by_date.get_mut(&record.date) {
            Some(existing) => existing.merge_from(&record),
            None => {
                by_date.insert(record.date, record);
            }
        }
    }
    by_date.into_values().collect()
}

/// Outcome of importing a directory
#[derive(Debug, Default)]
pub struct DirectoryImport {
    pub records: Vec<DailyRecord>,
    pub imported_files: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, String)>,
}

/// Manager for coordinating different import formats
pub struct ImportManager {
    importers: Vec<Box<dyn ImportFormat>>,
}

impl ImportManager {
    /// Create a new import manager with all available importers
    pub fn new() -> Self {
        Self::with_progress(false)
    }

    /// Create a manager whose Apple Health importer shows a spinner
    pub fn with_progress(show_progress: bool) -> Self {
        let importers: Vec<Box<dyn ImportFormat>> = vec![
            Box::new(json::JsonImporter::new()),
            Box::new(csv::CsvImporter::new()),
            Box::new(apple_health::AppleHealthImporter::new().with_progress(show_progress)),
        ];

        Self { importers }
    }

    /// Restrict the manager to the named formats (by extension)
    pub fn with_formats(mut self, extensions: &[String]) -> Self {
        self.importers.retain(|importer| {
            extensions.iter().any(|ext| {
                importer.can_import(Path::new(&format!("sample.{}", ext.to_lowercase())))
            })
        });
        self
    }

    fn importer_for(&self, file_path: &Path) -> Result<&dyn ImportFormat> {
        self.importers
            .iter()
            .find(|importer| importer.can_import(file_path))
            .map(|importer| importer.as_ref())
            .ok_or_else(|| {
                ImportError::UnsupportedFormat {
                    format: extension_of(file_path).unwrap_or_else(|| "unknown".to_string()),
                }
                .into()
            })
    }

    /// Import a single file, auto-detecting the format
    ///
    /// The returned records are sorted with one record per date.
    pub fn import_file(&self, file_path: &Path) -> Result<Vec<DailyRecord>> {
        let importer = self.importer_for(file_path)?;
        info!(
            file = %file_path.display(),
            format = importer.get_format_name(),
            "Importing health data"
        );

        let records = merge_by_date(importer.import_file(file_path)?);
        info!(file = %file_path.display(), days = records.len(), "Import complete");
        Ok(records)
    }

    /// Import all supported files of a directory in parallel
    ///
    /// Files that fail to import are reported in the outcome and skipped.
    /// Records from all files are merged per date.
    pub fn import_directory(&self, dir_path: &Path) -> Result<DirectoryImport> {
        let files = self.collect_importable_files(dir_path)?;

        if files.is_empty() {
            warn!(dir = %dir_path.display(), "No importable files found");
            return Ok(DirectoryImport::default());
        }

        debug!(files = files.len(), "Importing directory in parallel");
        let results: Vec<(PathBuf, Result<Vec<DailyRecord>>)> = files
            .into_par_iter()
            .map(|path| {
                let result = self.import_file(&path);
                (path, result)
            })
            .collect();

        let mut outcome = DirectoryImport::default();
        let mut all_records = Vec::new();
        for (path, result) in results {
            match result {
                Ok(records) => {
                    all_records.extend(records);
                    outcome.imported_files.push(path);
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Failed to import file");
                    outcome.failures.push((path, e.to_string()));
                }
            }
        }

        outcome.records = merge_by_date(all_records);
        info!(
            files = outcome.imported_files.len(),
            failed = outcome.failures.len(),
            days = outcome.records.len(),
            "Directory import complete"
        );
        Ok(outcome)
    }

    /// Collect all files that can be imported from a directory, sorted by name
    fn collect_importable_files(&self, dir_path: &Path) -> Result<Vec<PathBuf>> {
        if !dir_path.is_dir() {
            return Err(ImportError::InvalidStructure {
                reason: format!("{} is not a directory", dir_path.display()),
            }
            .into());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir_path)? {
            let path = entry?.path();
            if path.is_file() && self.can_import_file(&path) {
                files.push(path);
            }
        }
        files.sort();

        Ok(files)
    }

    /// Check if this manager can import a given file
    pub fn can_import_file(&self, file_path: &Path) -> bool {
        self.importers.iter().any(|importer| importer.can_import(file_path))
    }

    /// Names of the formats this manager handles
    pub fn format_names(&self) -> Vec<&'static str> {
        self.importers.iter().map(|i| i.get_format_name()).collect()
    }
}

impl Default for ImportManager {
    fn default() -> Self {
        Self::new()
    }
}
