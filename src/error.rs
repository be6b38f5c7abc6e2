//! Unified error hierarchy for readyrs
//!
//! Business outcomes such as "not enough history" or "no insight today" are
//! ordinary `Option` values and never reach this module. The variants here
//! cover contract violations by the caller and failures in the I/O layer
//! (imports, exports, configuration).

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all readyrs operations
#[derive(Debug, Error)]
pub enum ReadyRsError {
    /// Caller broke an input precondition of the engine
    #[error("Contract violation: {0}")]
    Contract(#[from] ContractViolation),

    /// Import errors
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Export errors
    #[error("Export error: {0}")]
    Export(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Violations of the engine's input contract
///
/// The engine never sorts or de-duplicates its input. Records must arrive in
/// strictly ascending date order, one per calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    /// A record is dated before the record preceding it
    #[error("Records are not in ascending date order: {current} at index {index} follows {previous}")]
    UnsortedInput {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    /// Two records share the same date
    #[error("Duplicate record for {date} at index {index}")]
    DuplicateDate { index: usize, date: NaiveDate },
}

/// Import errors
#[derive(Debug, Error)]
pub enum ImportError {
    /// Unsupported format
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// Format-specific parsing error
    #[error("Parse error in {format}: {reason}")]
    ParseError { format: String, reason: String },

    /// Missing required data
    #[error("Missing required data: {field}")]
    MissingData { field: String },

    /// Invalid data structure
    #[error("Invalid data structure: {reason}")]
    InvalidStructure { reason: String },

    /// File could not be read
    #[error("Could not read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
}

/// Result type alias for readyrs operations
pub type Result<T> = std::result::Result<T, ReadyRsError>;

impl ReadyRsError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ReadyRsError::Contract(_) => ErrorSeverity::Error,
            ReadyRsError::Import(ImportError::MissingData { .. }) => ErrorSeverity::Warning,
            ReadyRsError::Import(_) => ErrorSeverity::Error,
            ReadyRsError::Configuration(_) => ErrorSeverity::Warning,
            ReadyRsError::Io(_) => ErrorSeverity::Error,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            ReadyRsError::Contract(ContractViolation::UnsortedInput { current, .. }) => {
                format!(
                    "Your data is out of order around {}. Sort records by date before analyzing.",
                    current
                )
            }
            ReadyRsError::Contract(ContractViolation::DuplicateDate { date, .. }) => {
                format!("Found more than one record for {}. Keep one record per day.", date)
            }
            ReadyRsError::Import(ImportError::UnsupportedFormat { format }) => {
                format!("Files of type '{}' can't be imported.", format)
            }
            ReadyRsError::Import(ImportError::Unreadable { path, .. }) => {
                format!("Could not read health data file: {}", path.display())
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_error_severity() {
        let err = ReadyRsError::Contract(ContractViolation::DuplicateDate {
            index: 3,
            date: date(4),
        });
        assert_eq!(err.severity(), ErrorSeverity::Error);

        let err = ReadyRsError::Import(ImportError::MissingData {
            field: "date".to_string(),
        });
        assert_eq!(err.severity(), ErrorSeverity::Warning);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::WARN);

        let err = ReadyRsError::Configuration("rolling_window must be positive".to_string());
        assert_eq!(err.severity(), ErrorSeverity::Warning);

        let err = ReadyRsError::Export("no series".to_string());
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_contract_violation_display() {
        let violation = ContractViolation::UnsortedInput {
            index: 2,
            previous: date(5),
            current: date(4),
        };
        let text = violation.to_string();
        assert!(text.contains("2024-03-04"));
        assert!(text.contains("index 2"));
    }

    #[test]
    fn test_user_messages() {
        let err = ReadyRsError::Contract(ContractViolation::UnsortedInput {
            index: 1,
            previous: date(2),
            current: date(1),
        });
        assert!(err.user_message().contains("out of order"));

        let err = ReadyRsError::Import(ImportError::Unreadable {
            path: PathBuf::from("export.xml"),
            reason: "denied".to_string(),
        });
        assert!(err.user_message().contains("export.xml"));
    }
}
