//! Benchmarks for the MindBridge analytics engine
//!
//! Run with: cargo bench

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use mindbridge_analytics::analytics::{CheckIn, DateRunCalculator, Period, TrendAnalyzer, WellnessMetric};
use mindbridge_analytics::passive::{BucketAggregator, DataType, PassiveDataPoint, PassiveValue};
use mindbridge_analytics::time::Granularity;

fn create_test_points(count: usize) -> Vec<PassiveDataPoint> {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            let mut point = PassiveDataPoint::new(
                1,
                base + Duration::minutes(i as i64 * 7),
                DataType::HeartRate,
                PassiveValue::Measure(60.0 + (i % 40) as f64),
                if i % 3 == 0 { "Fitbit" } else { "HealthKit" },
            )
            .quality(if i % 10 == 0 { 0.2 } else { 0.9 });
            point.id = i as u64;
            point
        })
        .collect()
}

fn create_test_checkins(days: i64) -> Vec<CheckIn> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    (0..days)
        .filter(|d| d % 9 != 4)
        .map(|d| {
            CheckIn::new(1, start + Duration::days(d), 1.0 + (d % 10) as f64)
                .metric(WellnessMetric::Energy, 1.0 + ((d * 3) % 10) as f64)
                .metric(WellnessMetric::Stress, 10.0 - (d % 10) as f64)
                .keyword(if d % 2 == 0 { "work" } else { "exercise" })
        })
        .collect()
}

fn bench_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");
    let aggregator = BucketAggregator::default();

    for size in [100, 1000, 10000] {
        let points = create_test_points(size);

        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("hourly_{}", size), |b| {
            b.iter(|| aggregator.aggregate(DataType::HeartRate, Granularity::Hourly, black_box(&points)))
        });

        group.bench_function(format!("daily_{}", size), |b| {
            b.iter(|| aggregator.aggregate(DataType::HeartRate, Granularity::Daily, black_box(&points)))
        });
    }

    group.finish();
}

fn bench_checkin_analytics(c: &mut Criterion) {
    let mut group = c.benchmark_group("checkins");
    let analyzer = TrendAnalyzer::default();
    let calculator = DateRunCalculator::new();

    for days in [30, 365, 1825] {
        let checkins = create_test_checkins(days);
        let today = checkins.last().map(|c| c.date).unwrap();

        group.throughput(Throughput::Elements(checkins.len() as u64));

        group.bench_function(format!("streak_{}", days), |b| {
            b.iter(|| calculator.calculate(black_box(&checkins).iter().map(|c| c.date), today))
        });

        group.bench_function(format!("monthly_analytics_{}", days), |b| {
            b.iter(|| analyzer.analyze_period(black_box(&checkins), Period::Monthly, today))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_aggregation, bench_checkin_analytics);
criterion_main!(benches);
