use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use readyrs::config::AppConfig;
use readyrs::engine::{EvaluationRequest, ReadinessEngine, ReadinessReport};
use readyrs::export::{self, DateRange, ExportFormat, ReportExport};
use readyrs::import::ImportManager;
use readyrs::logging::{init_logging, log_error};
use readyrs::models::{DailyRecord, InsightKind, Metric, ProcessedPoint, ViewMode};
use readyrs::scorer::StatusBand;
use readyrs::weekly::{reliability_signal, weekly_summaries, TrendIndicator, WeeklySummary};
use readyrs::DemoGenerator;

/// readyrs - Readiness Analytics CLI
///
/// Turns daily sleep, HRV and resting heart rate records into a readiness
/// score, explanatory insights and a confidence note.
#[derive(Parser)]
#[command(name = "readyrs")]
#[command(author = "readyrs Contributors")]
#[command(version)]
#[command(about = "Readiness analytics for personal health data", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Where the daily records come from
#[derive(clap::Args)]
struct InputArgs {
    /// Input file or directory (JSON, CSV, Apple Health export.xml)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Use generated demo data instead of an input file
    #[arg(long, conflicts_with = "input")]
    demo: bool,

    /// Only use records on or after this date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Only use records on or before this date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score readiness and explain what changed
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// View mode (rolling, daily)
        #[arg(short, long)]
        mode: Option<ViewMode>,

        /// Number of series points to show (0 for all)
        #[arg(short, long)]
        days: Option<usize>,

        /// Evaluation moment (RFC 3339), defaults to now
        #[arg(long)]
        now: Option<DateTime<Utc>>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Weekly averages and week-over-week trends
    Weekly {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Convert health data files into a readyrs JSON document
    Import {
        /// Input file or directory
        #[arg(short, long)]
        input: PathBuf,

        /// Output JSON file
        #[arg(short, long, default_value = "health-data.json")]
        output: PathBuf,
    },

    /// Generate deterministic demo data
    Demo {
        /// Number of days to generate
        #[arg(short, long, default_value = "90")]
        days: usize,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Date of the last generated day, defaults to yesterday
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Output JSON file
        #[arg(short, long, default_value = "demo-data.json")]
        output: PathBuf,
    },

    /// Export a report (csv, json, text)
    Export {
        #[command(flatten)]
        input: InputArgs,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format, inferred from the output extension when omitted
        #[arg(short = 'f', long)]
        format: Option<String>,

        /// View mode (rolling, daily)
        #[arg(short, long)]
        mode: Option<ViewMode>,

        /// Number of series points to keep (0 for all)
        #[arg(short, long)]
        days: Option<usize>,
    },

    /// Configure application settings
    Config {
        /// List all configuration options
        #[arg(short, long)]
        list: bool,

        /// Set a configuration value (key=value)
        #[arg(short, long)]
        set: Option<String>,

        /// Get a configuration value
        #[arg(short, long)]
        get: Option<String>,

        /// Write a default configuration file
        #[arg(long)]
        init: bool,
    },
}

#[derive(Tabled)]
struct SeriesRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Readiness")]
    readiness: String,
    #[tabled(rename = "Sleep")]
    sleep: String,
    #[tabled(rename = "HRV")]
    hrv: String,
    #[tabled(rename = "RHR")]
    rhr: String,
    #[tabled(rename = "Feeling")]
    feeling: String,
}

#[derive(Tabled)]
struct WeekRow {
    #[tabled(rename = "Week")]
    week: String,
    #[tabled(rename = "Dates")]
    dates: String,
    #[tabled(rename = "Recovery")]
    recovery: String,
    #[tabled(rename = "Sleep")]
    sleep: String,
    #[tabled(rename = "HRV")]
    hrv: String,
    #[tabled(rename = "Feeling")]
    feeling: String,
    #[tabled(rename = "Steps")]
    steps: String,
    #[tabled(rename = "Recovery trend")]
    trend: String,
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{:.*}", decimals, v))
        .unwrap_or_else(|| "-".to_string())
}

impl From<&ProcessedPoint> for SeriesRow {
    fn from(point: &ProcessedPoint) -> Self {
        let m = &point.metrics;
        SeriesRow {
            date: point.date.to_string(),
            readiness: fmt_opt(m.readiness, 0),
            sleep: fmt_opt(m.sleep_hours, 1),
            hrv: fmt_opt(m.hrv_ms, 0),
            rhr: fmt_opt(m.resting_hr_bpm, 0),
            feeling: fmt_opt(m.feeling, 1),
        }
    }
}

impl From<&WeeklySummary> for WeekRow {
    fn from(week: &WeeklySummary) -> Self {
        let a = &week.averages;
        WeekRow {
            week: week.label(),
            dates: week.date_range(),
            recovery: fmt_opt(a.recovery, 0),
            sleep: fmt_opt(a.sleep_hours, 1),
            hrv: fmt_opt(a.hrv_ms, 0),
            feeling: fmt_opt(a.feeling, 1),
            steps: fmt_opt(a.steps, 0),
            trend: week
                .trends
                .recovery
                .map(|t| TrendIndicator::from_percent(t).to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) if path.exists() => AppConfig::load_from_file(path),
        // a missing file is created by `config --init` or `config --set`
        Some(_) => Ok(AppConfig::default()),
        None => Ok(AppConfig::load_or_default()),
    }
}

fn yesterday() -> NaiveDate {
    Local::now().date_naive().pred_opt().unwrap_or_else(|| Local::now().date_naive())
}

/// Load and filter the records an input argument set points at
fn load_records(input: &InputArgs, config: &AppConfig) -> Result<Vec<DailyRecord>> {
    let records = if input.demo {
        DemoGenerator::new(42).generate(90, yesterday())
    } else {
        let path = input
            .input
            .as_deref()
            .ok_or_else(|| anyhow!("Provide --input <FILE|DIR> or --demo"))?;
        import_path(path, config)?
    };

    Ok(DateRange::new(input.from, input.to).filter_records(&records))
}

fn import_path(path: &Path, config: &AppConfig) -> Result<Vec<DailyRecord>> {
    let manager = ImportManager::with_progress(config.import.show_progress)
        .with_formats(&config.import.supported_formats);

    let result = if path.is_dir() {
        manager.import_directory(path).map(|outcome| {
            for (file, reason) in &outcome.failures {
                eprintln!(
                    "{} {}: {}",
                    "✗ Failed to import".red(),
                    file.display(),
                    reason
                );
            }
            outcome.records
        })
    } else {
        manager.import_file(path)
    };

    result.map_err(|e| {
        log_error(&e);
        anyhow!(e.user_message())
    })
}

fn evaluate(
    config: &AppConfig,
    records: &[DailyRecord],
    mode: Option<ViewMode>,
    days: Option<usize>,
    now: Option<DateTime<Utc>>,
) -> Result<ReadinessReport> {
    let engine = ReadinessEngine::with_config(config.engine);
    let request = EvaluationRequest::new(
        mode.unwrap_or(config.display.default_mode),
        now.unwrap_or_else(Utc::now),
    )
    .with_days_to_show(days.unwrap_or(config.display.days_to_show));

    engine.evaluate(records, &request).map_err(|e| {
        log_error(&e);
        anyhow!(e.user_message())
    })
}

fn print_report(report: &ReadinessReport, records: &[DailyRecord], config: &AppConfig) {
    println!("{}", "Readiness".cyan().bold());

    match report.readiness {
        Some(value) => {
            let banner = report.status.map(|s| s.banner()).unwrap_or_default();
            let headline = format!("{}% {}", value, banner);
            let headline = match report.status {
                Some(StatusBand::High) => headline.green().bold(),
                Some(StatusBand::Moderate) => headline.yellow().bold(),
                _ => headline.red().bold(),
            };
            println!("  {}", headline);
            if let Some(change) = report.change {
                println!(
                    "  {}",
                    format!("{:+} vs {}", change, report.mode.comparison_label()).dimmed()
                );
            }
        }
        None => println!("  {}", "Not enough data for a readiness score".yellow()),
    }

    if let Some(ranked) = report.score.and_then(|s| s.contributions.ranked()) {
        let parts: Vec<String> = ranked
            .iter()
            .map(|(factor, value)| format!("{} {:.0}", factor, value))
            .collect();
        println!("  {} {}", "Contributions:".dimmed(), parts.join(", "));
    }

    println!();
    println!("{}", "Insights".cyan().bold());
    for insight in report.insights() {
        let label = match insight.kind {
            InsightKind::Takeaway => insight.kind.to_string().green(),
            InsightKind::Trigger => insight.kind.to_string().yellow(),
            InsightKind::Causal => insight.kind.to_string().magenta(),
            InsightKind::Confidence => {
                println!("  {}", insight.text.dimmed());
                continue;
            }
        };
        println!("  {} {}", format!("{}:", label).bold(), insight.text);
    }
    if let Some(headline) = &report.trend_headline {
        println!("  {} {}", "Trend:".bold(), headline);
    }
    if let Some(signal) = reliability_signal(records, &config.engine.takeaway_bands) {
        println!("  {}", signal.text.dimmed());
    }

    let b = &report.baselines;
    println!();
    println!("{}", "Baselines".cyan().bold());
    println!(
        "  Sleep {}h  HRV {}ms  RHR {}bpm",
        fmt_opt(b.sleep_hours, 1),
        fmt_opt(b.hrv_ms, 0),
        fmt_opt(b.resting_hr_bpm, 0)
    );
    if let Some(wow) = &report.week_over_week {
        println!(
            "  Readiness this week {} vs {} the week before",
            fmt_opt(wow.recent.get(Metric::Readiness), 0),
            fmt_opt(wow.prior.get(Metric::Readiness), 0)
        );
    }

    if !report.series.is_empty() {
        let rows: Vec<SeriesRow> = report.series.iter().rev().take(7).rev().map(SeriesRow::from).collect();
        println!();
        println!("{}", format!("Recent {} series", report.mode).cyan().bold());
        println!("{}", Table::new(rows).with(Style::rounded()));
    }
}

fn write_json<T: serde::Serialize>(value: &T, output: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize records")?;
    std::fs::write(output, json)
        .with_context(|| format!("Failed to write {}", output.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;

    let mut log_config = config.logging.clone();
    log_config.level = log_config.level.raised_by(cli.verbose);
    init_logging(&log_config)?;

    if cli.verbose > 0 {
        eprintln!("{}", format!("Log level: {}", log_config.level).dimmed());
    }

    match cli.command {
        Commands::Analyze {
            input,
            mode,
            days,
            now,
            json,
        } => {
            let records = load_records(&input, &config)?;
            let report = evaluate(&config, &records, mode, days, now)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report, &records, &config);
            }
        }

        Commands::Weekly { input } => {
            let records = load_records(&input, &config)?;
            let weeks = weekly_summaries(&records);
            if weeks.is_empty() {
                println!("{}", "No records to summarize".yellow());
            } else {
                println!("{}", "Weekly summary".cyan().bold());
                let rows: Vec<WeekRow> = weeks.iter().map(WeekRow::from).collect();
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
        }

        Commands::Import { input, output } => {
            println!("{}", "Importing health data...".green().bold());
            let records = import_path(&input, &config)?;
            write_json(&serde_json::json!({ "daily": records }), &output)?;
            println!(
                "{}",
                format!("✓ Wrote {} days to {}", records.len(), output.display()).green()
            );
        }

        Commands::Demo {
            days,
            seed,
            end,
            output,
        } => {
            if days == 0 {
                bail!("--days must be at least 1");
            }
            let records = DemoGenerator::new(seed).generate(days, end.unwrap_or_else(yesterday));
            write_json(&serde_json::json!({ "daily": records }), &output)?;
            println!(
                "{}",
                format!("✓ Wrote {} demo days to {}", records.len(), output.display()).green()
            );
        }

        Commands::Export {
            input,
            output,
            format,
            mode,
            days,
        } => {
            let format = match format {
                Some(f) => f.parse::<ExportFormat>().map_err(|e| anyhow!(e.user_message()))?,
                None => ExportFormat::from_path(&output).unwrap_or(ExportFormat::Json),
            };

            let records = load_records(&input, &config)?;
            let report = evaluate(&config, &records, mode, days, None)?;
            let reliability = reliability_signal(&records, &config.engine.takeaway_bands);
            let document = ReportExport::new(report, Utc::now())
                .with_weekly(weekly_summaries(&records))
                .with_reliability(reliability);

            export::export_report(&document, format, &output).map_err(|e| {
                log_error(&e);
                anyhow!(e.user_message())
            })?;
            println!(
                "{}",
                format!("✓ Exported {} report to {}", format.extension(), output.display()).yellow()
            );
        }

        Commands::Config {
            list,
            set,
            get,
            init,
        } => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(AppConfig::default_config_path);

            if init {
                let mut fresh = AppConfig::default();
                fresh.save_to_file(&path)?;
                println!("{}", format!("✓ Wrote {}", path.display()).green());
            } else if let Some(key_value) = set {
                let (key, value) = key_value
                    .split_once('=')
                    .ok_or_else(|| anyhow!("Expected key=value, got '{}'", key_value))?;
                config.set(key.trim(), value.trim())?;
                config.save_to_file(&path)?;
                println!("{} = {}", key.trim(), config.get(key.trim())?);
            } else if let Some(key) = get {
                println!("{}", config.get(&key)?);
            } else if list {
                print!("{}", toml::to_string_pretty(&config)?);
            } else {
                println!("Config file: {}", path.display());
            }
        }
    }

    Ok(())
}
