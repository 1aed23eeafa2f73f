//! Suite Benchmarks
//!
//! - Scoring and report rendering for growing experiment sequences
//! - SQL classification used by the in-memory target
//! - A full zero-latency suite run against `MemoryTarget`
//!
//! Run with: cargo bench --bench suite_benchmarks

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::time::Duration;
use trueno_chaos::adapter::sql::classify;
use trueno_chaos::adapter::{MemoryTarget, MemoryTargetSettings};
use trueno_chaos::config::SuiteConfig;
use trueno_chaos::experiment::{BlastRadius, Experiment, ExperimentResult, Observation};
use trueno_chaos::report::render_text;
use trueno_chaos::score::score;
use trueno_chaos::ChaosSuite;

fn experiments(count: usize) -> Vec<Experiment> {
    (0..count)
        .map(|i| {
            let mut e = Experiment::new(format!("experiment-{i}"), "bench", BlastRadius::Database);
            e.start(Utc::now());
            e.observe(Observation::millis("query_latency", 1.5));
            let result = if i % 3 == 0 {
                ExperimentResult::Failed
            } else {
                ExperimentResult::Completed
            };
            e.finish(result, Utc::now());
            e
        })
        .collect()
}

fn instant_target() -> MemoryTarget {
    MemoryTarget::with_settings(MemoryTargetSettings {
        max_connections: None,
        connect_latency: Duration::ZERO,
        query_latency: Duration::ZERO,
        join_cost_per_krow: Duration::ZERO,
    })
}

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");
    for size in [4, 100, 10_000] {
        let sequence = experiments(size);
        group.bench_with_input(BenchmarkId::new("score", size), &sequence, |b, seq| {
            b.iter(|| black_box(score(seq)));
        });
    }
    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let statements = [
        "SELECT 1",
        "SELECT COUNT(*) FROM test_data",
        "SELECT COUNT(*) FROM test_data t1 CROSS JOIN test_data t2 LIMIT 100000",
        "SELECT pg_sleep(2)",
    ];
    c.bench_function("classify_workload", |b| {
        b.iter(|| {
            for sql in statements {
                black_box(classify(sql).unwrap());
            }
        });
    });
}

fn bench_suite_run(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let config = SuiteConfig {
        seed: Some(42),
        ..SuiteConfig::default()
    }
    .without_delays();

    let report = rt
        .block_on(ChaosSuite::new(Arc::new(instant_target()), config.clone()).run())
        .unwrap();
    c.bench_function("render_text", |b| {
        b.iter(|| black_box(render_text(&report)));
    });

    let config = &config;
    c.bench_function("suite_run_memory_target", |b| {
        b.to_async(&rt).iter(|| async move {
            let report = ChaosSuite::new(Arc::new(instant_target()), config.clone())
                .run()
                .await
                .unwrap();
            black_box(report)
        });
    });
}

criterion_group!(benches, bench_score, bench_classify, bench_suite_run);
criterion_main!(benches);
