// Library interface for readyrs modules
// The CLI and the integration tests both go through this crate root

pub mod aggregator;
pub mod causal;
pub mod confidence;
pub mod config;
pub mod demo;
pub mod engine;
pub mod error;
pub mod export;
pub mod import;
pub mod logging;
pub mod models;
pub mod normalizer;
pub mod rules;
pub mod scorer;
pub mod triggers;
pub mod weekly;

// Re-export commonly used types for convenience
pub use models::*;
pub use config::{AppConfig, EngineConfig};
pub use demo::{generate_demo_data, DemoGenerator};
pub use engine::{EvaluationRequest, ReadinessEngine, ReadinessReport};
pub use error::{ContractViolation, ImportError, ReadyRsError, Result};
pub use import::ImportManager;
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use scorer::{BandThresholds, ReadinessScore, StatusBand, TakeawayBand};
pub use weekly::{reliability_signal, weekly_summaries, WeeklySummary};
