use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::ReportExport;
use crate::error::Result;
use crate::models::{InsightKind, Metric};

fn format_value(value: Option<f64>, metric: Metric) -> String {
    match value {
        Some(v) => match metric {
            Metric::Sleep | Metric::Weight | Metric::Feeling => format!("{:.1}{}", v, metric.unit()),
            _ => format!("{:.0}{}", v, metric.unit()),
        },
        None => "n/a".to_string(),
    }
}

/// Write a report export as plain text
pub fn write_report<W: Write>(out: &mut W, export: &ReportExport) -> Result<()> {
    let report = &export.report;

    writeln!(out, "READINESS REPORT")?;
    writeln!(out, "================")?;
    writeln!(
        out,
        "Generated: {}",
        export.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    if let (Some(first), Some(last)) = (report.series.first(), report.series.last()) {
        writeln!(out, "Period: {} to {}", first.date, last.date)?;
    }
    writeln!(out, "View: {}", report.mode)?;
    writeln!(out)?;

    writeln!(out, "TODAY")?;
    writeln!(out, "-----")?;
    match report.readiness {
        Some(value) => {
            let change = report
                .change
                .map(|c| format!(" ({:+} vs {})", c, report.mode.comparison_label()))
                .unwrap_or_default();
            writeln!(out, "Readiness: {}%{}", value, change)?;
        }
        None => {
            writeln!(out, "Readiness: n/a")?;
        }
    }
    if let Some(status) = report.status {
        writeln!(out, "Status: {}", status.banner())?;
    }
    if let Some(score) = &report.score {
        if let Some(ranked) = score.contributions.ranked() {
            let factors: Vec<String> = ranked
                .iter()
                .map(|(factor, value)| format!("{} {:.0}", factor, value))
                .collect();
            writeln!(out, "Contributions: {}", factors.join(", "))?;
        }
    }
    writeln!(out)?;

    writeln!(out, "INSIGHTS")?;
    writeln!(out, "--------")?;
    for insight in report.insights() {
        // confidence text carries its own label
        if insight.kind == InsightKind::Confidence {
            writeln!(out, "{}", insight.text)?;
        } else {
            writeln!(out, "{}: {}", insight.kind, insight.text)?;
        }
    }
    if let Some(headline) = &report.trend_headline {
        writeln!(out, "Trend: {}", headline)?;
    }
    if let Some(signal) = &export.reliability {
        writeln!(out, "Reliability: {}", signal.text)?;
    }
    writeln!(out)?;

    writeln!(out, "BASELINES")?;
    writeln!(out, "---------")?;
    writeln!(out, "Sleep: {}", format_value(report.baselines.sleep_hours, Metric::Sleep))?;
    writeln!(out, "HRV: {}", format_value(report.baselines.hrv_ms, Metric::Hrv))?;
    writeln!(
        out,
        "Resting HR: {}",
        format_value(report.baselines.resting_hr_bpm, Metric::RestingHr)
    )?;
    if let Some(avg) = report.period_average {
        writeln!(out, "Period average readiness: {:.0}%", avg)?;
    }
    if let (Some(low), Some(high)) = (&report.lowest, &report.highest) {
        writeln!(
            out,
            "Lowest: {} on {}; highest: {} on {}",
            format_value(low.metrics.readiness, Metric::Readiness),
            low.date,
            format_value(high.metrics.readiness, Metric::Readiness),
            high.date
        )?;
    }

    if let Some(wow) = &report.week_over_week {
        writeln!(out)?;
        writeln!(out, "WEEK OVER WEEK")?;
        writeln!(out, "--------------")?;
        for metric in [Metric::Readiness, Metric::Sleep, Metric::Hrv, Metric::RestingHr] {
            writeln!(
                out,
                "{}: {} -> {}",
                metric,
                format_value(wow.prior.get(metric), metric),
                format_value(wow.recent.get(metric), metric)
            )?;
        }
    }

    if !export.weekly.is_empty() {
        writeln!(out)?;
        writeln!(out, "WEEKLY SUMMARY")?;
        writeln!(out, "--------------")?;
        for week in &export.weekly {
            writeln!(
                out,
                "{} ({}): recovery {}, sleep {}, feeling {}",
                week.label(),
                week.date_range(),
                format_value(week.averages.recovery, Metric::Readiness),
                format_value(week.averages.sleep_hours, Metric::Sleep),
                format_value(week.averages.feeling, Metric::Feeling)
            )?;
        }
    }

    Ok(())
}

/// Export a report to a human-readable text file
pub fn export_report<P: AsRef<Path>>(export: &ReportExport, output_path: P) -> Result<()> {
    let mut file = BufWriter::new(File::create(output_path)?);
    write_report(&mut file, export)?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EvaluationRequest, ReadinessEngine};
    use crate::models::{DailyRecord, ViewMode};
    use crate::error::ReadyRsError;
    use crate::weekly::weekly_summaries;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use std::io;

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn sample_export() -> ReportExport {
        let start = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        let records: Vec<DailyRecord> = (0..14)
            .map(|i| DailyRecord::new(start + Duration::days(i)).with_vitals(7.5, 55.0, 56.0))
            .collect();
        let now = Utc.with_ymd_and_hms(2024, 9, 14, 20, 0, 0).unwrap();
        let report = ReadinessEngine::new()
            .evaluate(&records, &EvaluationRequest::new(ViewMode::Rolling, now))
            .unwrap();
        ReportExport::new(report, now).with_weekly(weekly_summaries(&records))
    }

    #[test]
    fn test_write_report_sections() {
        let mut buf = Vec::new();
        write_report(&mut buf, &sample_export()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("READINESS REPORT"));
        assert!(text.contains("Period: 2024-09-07 to 2024-09-14"));
        assert!(text.contains("Takeaway: "));
        assert!(text.contains("Confidence: "));
        assert!(text.contains("Week 2 (Sep 8 - Sep 14)"));
        assert!(text.contains("WEEK OVER WEEK"));
    }

    #[test]
    fn test_write_failure_propagates() {
        let err = write_report(&mut FailingWriter, &sample_export()).unwrap_err();
        assert!(matches!(err, ReadyRsError::Io(_)));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(Some(7.26), Metric::Sleep), "7.3h");
        assert_eq!(format_value(Some(52.4), Metric::Hrv), "52ms");
        assert_eq!(format_value(None, Metric::Hrv), "n/a");
    }
}
