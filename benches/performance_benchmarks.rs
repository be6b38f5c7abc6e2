use chrono::{NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use readyrs::aggregator;
use readyrs::engine::{EvaluationRequest, ReadinessEngine};
use readyrs::normalizer;
use readyrs::{generate_demo_data, weekly_summaries, DailyRecord, ViewMode};

/// Performance benchmarks for the readiness pipeline
///
/// Dataset sizes cover a month, a quarter and a year of daily records.
const SIZES: [usize; 3] = [30, 90, 365];

fn dataset(days: usize) -> Vec<DailyRecord> {
    let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
    generate_demo_data(days, end, 42)
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("Evaluate");
    let engine = ReadinessEngine::new();
    let now = Utc.with_ymd_and_hms(2024, 12, 31, 8, 0, 0).unwrap();

    for &days in &SIZES {
        let records = dataset(days);
        group.throughput(Throughput::Elements(days as u64));

        for mode in [ViewMode::Rolling, ViewMode::Daily] {
            let request = EvaluationRequest::new(mode, now).with_days_to_show(0);
            group.bench_with_input(
                BenchmarkId::new(format!("evaluate_{}", mode), days),
                &records,
                |b, records| b.iter(|| engine.evaluate(black_box(records), &request)),
            );
        }
    }

    group.finish();
}

fn bench_rolling_average(c: &mut Criterion) {
    let mut group = c.benchmark_group("Rolling Average");

    for &days in &SIZES {
        let normalized = normalizer::normalize(&dataset(days));
        group.throughput(Throughput::Elements(days as u64));
        group.bench_with_input(
            BenchmarkId::new("rolling_average_7", days),
            &normalized,
            |b, records| b.iter(|| aggregator::rolling_average(black_box(records), 7)),
        );
    }

    group.finish();
}

fn bench_weekly(c: &mut Criterion) {
    let records = dataset(365);
    c.bench_function("weekly_summaries_365", |b| {
        b.iter(|| weekly_summaries(black_box(&records)))
    });
}

criterion_group!(benches, bench_evaluate, bench_rolling_average, bench_weekly);
criterion_main!(benches);
