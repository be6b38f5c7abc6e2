use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::aggregator::BaselineWindow;
use crate::logging::LogConfig;
use crate::models::ViewMode;
use crate::scorer::BandThresholds;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application metadata
    pub metadata: ConfigMetadata,

    /// Readiness engine parameters
    #[serde(default)]
    pub engine: EngineConfig,

    /// Report presentation defaults
    #[serde(default)]
    pub display: DisplaySettings,

    /// Data import preferences
    #[serde(default)]
    pub import: ImportSettings,

    /// Logging setup
    #[serde(default)]
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// Tunable engine parameters
///
/// The two band systems are configured separately and must stay separate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window size of the rolling series
    pub rolling_window: usize,

    /// Exclude-recent baseline window
    pub baseline: BaselineWindow,

    /// Bands of the daily takeaway and threshold crossings
    pub takeaway_bands: BandThresholds,

    /// Bands of the status banner
    pub status_bands: BandThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            rolling_window: 7,
            baseline: BaselineWindow::default(),
            takeaway_bands: BandThresholds::TAKEAWAY,
            status_bands: BandThresholds::STATUS,
        }
    }
}

impl EngineConfig {
    /// Reject parameter combinations the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.rolling_window == 0 {
            bail!("engine.rolling_window must be at least 1");
        }
        if self.baseline.min_points == 0 || self.baseline.span < self.baseline.min_points {
            bail!(
                "engine.baseline.span ({}) must be >= min_points ({}) and min_points > 0",
                self.baseline.span,
                self.baseline.min_points
            );
        }
        for (name, bands) in [
            ("takeaway_bands", &self.takeaway_bands),
            ("status_bands", &self.status_bands),
        ] {
            if !(bands.high > bands.moderate && bands.moderate >= 0.0 && bands.high <= 100.0) {
                bail!(
                    "engine.{}: expected 0 <= moderate < high <= 100, got moderate {} high {}",
                    name,
                    bands.moderate,
                    bands.high
                );
            }
        }
        Ok(())
    }
}

/// Report presentation defaults
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Mode used when the command line does not pick one
    pub default_mode: ViewMode,

    /// Number of series points kept for the report, 0 keeps all
    pub days_to_show: usize,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            default_mode: ViewMode::Rolling,
            days_to_show: 30,
        }
    }
}

/// Data import preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Show a spinner while streaming large exports
    pub show_progress: bool,

    /// File extensions scanned when importing a directory
    pub supported_formats: Vec<String>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        ImportSettings {
            show_progress: true,
            supported_formats: vec!["json".to_string(), "csv".to_string(), "xml".to_string()],
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            engine: EngineConfig::default(),
            display: DisplaySettings::default(),
            import: ImportSettings::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;
        config.engine.validate()?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".readyrs")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::debug!(
                    path = %config_path.display(),
                    error = %err,
                    "Using default configuration"
                );
                Self::default()
            }
        }
    }

    /// Save configuration to default location
    pub fn save_default(&mut self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to_file(config_path)
    }

    /// Read a value by dotted key, e.g. `engine.takeaway_bands.high`
    pub fn get(&self, key: &str) -> Result<String> {
        let root = toml::Value::try_from(self).context("Failed to serialize configuration")?;
        let value = key
            .split('.')
            .try_fold(&root, |node, part| node.get(part))
            .ok_or_else(|| anyhow!("Unknown configuration key: {}", key))?;

        Ok(match value {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Set a value by dotted key
    ///
    /// The raw text is parsed according to the type of the current value.
    /// The result is validated before it replaces the current configuration.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<()> {
        let mut root = toml::Value::try_from(&*self).context("Failed to serialize configuration")?;

        let (parent_path, field) = key.rsplit_once('.').unwrap_or(("", key));
        let parent = if parent_path.is_empty() {
            Some(&mut root)
        } else {
            parent_path
                .split('.')
                .try_fold(&mut root, |node, part| node.get_mut(part))
        };
        let table = parent
            .and_then(|node| node.as_table_mut())
            .ok_or_else(|| anyhow!("Unknown configuration key: {}", key))?;

        let value = match table.get(field) {
            Some(toml::Value::Integer(_)) => toml::Value::Integer(
                raw.parse()
                    .with_context(|| format!("{} expects an integer, got '{}'", key, raw))?,
            ),
            Some(toml::Value::Float(_)) => toml::Value::Float(
                raw.parse()
                    .with_context(|| format!("{} expects a number, got '{}'", key, raw))?,
            ),
            Some(toml::Value::Boolean(_)) => toml::Value::Boolean(
                raw.parse()
                    .with_context(|| format!("{} expects true or false, got '{}'", key, raw))?,
            ),
            Some(toml::Value::Array(_)) => toml::Value::Array(
                raw.split(',')
                    .map(|item| toml::Value::String(item.trim().to_string()))
                    .collect(),
            ),
            Some(toml::Value::Table(_)) => bail!("{} is a section, not a value", key),
            Some(_) | None => toml::Value::String(raw.to_string()),
        };
        table.insert(field.to_string(), value);

        let updated: AppConfig = root
            .try_into()
            .with_context(|| format!("Invalid value for {}: '{}'", key, raw))?;
        updated.engine.validate()?;
        updated.get(key)?;

        *self = updated;
        self.metadata.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.metadata.version, deserialized.metadata.version);
        assert_eq!(deserialized.engine, EngineConfig::default());
        assert_eq!(deserialized.display.days_to_show, 30);
    }

    #[test]
    fn test_band_systems_have_separate_defaults() {
        let engine = EngineConfig::default();
        assert_eq!(engine.takeaway_bands.high, 75.0);
        assert_eq!(engine.takeaway_bands.moderate, 55.0);
        assert_eq!(engine.status_bands.high, 67.0);
        assert_eq!(engine.status_bands.moderate, 34.0);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let toml_str = r#"
            [metadata]
            version = "1.0"
            created_at = "2024-01-01T00:00:00Z"
            updated_at = "2024-01-01T00:00:00Z"

            [display]
            default_mode = "daily"
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.display.default_mode, ViewMode::Daily);
        assert_eq!(config.display.days_to_show, 30);
        assert_eq!(config.engine.rolling_window, 7);
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = AppConfig::default();
        original.display.days_to_show = 90;
        original.logging.level = LogLevel::Debug;

        original.save_to_file(&config_path).unwrap();
        let loaded = AppConfig::load_from_file(&config_path).unwrap();

        assert_eq!(loaded.display.days_to_show, 90);
        assert_eq!(loaded.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_load_rejects_invalid_bands() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.engine.status_bands.moderate = 80.0;
        config.save_to_file(&config_path).unwrap();

        assert!(AppConfig::load_from_file(&config_path).is_err());
    }

    #[test]
    fn test_get_dotted_keys() {
        let config = AppConfig::default();
        assert_eq!(config.get("engine.rolling_window").unwrap(), "7");
        assert_eq!(config.get("display.default_mode").unwrap(), "rolling");
        assert_eq!(config.get("engine.takeaway_bands.high").unwrap(), "75.0");
        assert!(config.get("engine.nope").is_err());
    }

    #[test]
    fn test_set_dotted_keys() {
        let mut config = AppConfig::default();
        config.set("display.days_to_show", "14").unwrap();
        config.set("display.default_mode", "daily").unwrap();
        config.set("engine.status_bands.high", "70").unwrap();
        config.set("logging.level", "debug").unwrap();
        config.set("logging.file_path", "/tmp/readyrs.log").unwrap();

        assert_eq!(config.display.days_to_show, 14);
        assert_eq!(config.display.default_mode, ViewMode::Daily);
        assert_eq!(config.engine.status_bands.high, 70.0);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.file_path, Some(PathBuf::from("/tmp/readyrs.log")));
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = AppConfig::default();
        assert!(config.set("display.days_to_show", "lots").is_err());
        assert!(config.set("display.default_mode", "weekly").is_err());
        assert!(config.set("engine.rolling_window", "0").is_err());
        assert!(config.set("engine", "1").is_err());
        assert!(config.set("engine.unknown_field", "1").is_err());
        assert_eq!(config.display.days_to_show, 30);
    }
}
