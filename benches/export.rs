//! Performance benchmarks for a3s-audit
//!
//! Run with: cargo bench

use a3s_audit::export::render_csv;
use a3s_audit::provider::memory::{MemoryObjectStore, MemoryQueryEngine};
use a3s_audit::{AggregationJob, AggregationTarget, PollPolicy, QueryRunner, ResultSet};
use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;

fn usage_rows(n: usize) -> ResultSet {
    let mut rows = vec![vec![
        "totalevent".to_string(),
        "eventname".to_string(),
        "eventhour".to_string(),
        "bkt".to_string(),
    ]];
    for i in 0..n {
        rows.push(vec![
            (i % 97).to_string(),
            "PutObject".to_string(),
            format!("2024-01-{:02}T{:02}", i % 28 + 1, i % 24),
            format!("\"bucket-{}\"", i % 13),
        ]);
    }
    ResultSet::from_text(rows)
}

fn bench_render_csv(c: &mut Criterion) {
    let small = usage_rows(100);
    let large = usage_rows(10_000);

    c.bench_function("render_csv 100 rows", |b| {
        b.iter(|| render_csv(&small).unwrap());
    });

    c.bench_function("render_csv 10k rows", |b| {
        b.iter(|| render_csv(&large).unwrap());
    });
}

fn bench_aggregation_run(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let engine = Arc::new(
        MemoryQueryEngine::new()
            .with_table("db", "logs")
            .with_results(usage_rows(1_000)),
    );
    let store = Arc::new(MemoryObjectStore::new());
    let job = AggregationJob::new(QueryRunner::new(engine, PollPolicy::default()), store);
    let target = AggregationTarget {
        catalog: "db".to_string(),
        table: "logs".to_string(),
        output_location: "s3://results/logs/".to_string(),
        export_bucket: "results".to_string(),
        export_key: "estadisticas/query_results.csv".to_string(),
        archive_runs: false,
    };

    c.bench_function("AggregationJob::run memory 1k rows", |b| {
        b.to_async(&rt).iter(|| async {
            job.run(&target).await.unwrap();
        });
    });
}

criterion_group!(benches, bench_render_csv, bench_aggregation_run);
criterion_main!(benches);
