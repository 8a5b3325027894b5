//! Benchmarks for the three matcher tiers.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use conch_matcher::{FuzzyMatcher, MatcherOptions};

const WORDS: &[&str] = &[
    "connect", "disconnect", "query", "status", "environment", "evaluate", "export", "history",
    "tunnel", "upload", "download", "migrate", "snapshot", "restore", "vacuum", "describe",
];

fn candidates(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!("{}_{i}", WORDS[i % WORDS.len()]))
        .collect()
}

fn bench_tiers(c: &mut Criterion) {
    let mut group = c.benchmark_group("matcher_tiers");
    let matcher = FuzzyMatcher::default();

    for n in [100, 1_000, 10_000] {
        let pool = candidates(n);
        let label = format!("{n}");

        group.bench_function(BenchmarkId::new("prefix", &label), |b| {
            b.iter(|| matcher.match_candidates("con", pool.iter().map(String::as_str)));
        });
        group.bench_function(BenchmarkId::new("subsequence", &label), |b| {
            b.iter(|| matcher.match_candidates("cnct", pool.iter().map(String::as_str)));
        });
        group.bench_function(BenchmarkId::new("edit_distance", &label), |b| {
            b.iter(|| matcher.match_candidates("qurey_1", pool.iter().map(String::as_str)));
        });
    }

    group.finish();
}

fn bench_candidate_limit(c: &mut Criterion) {
    let mut group = c.benchmark_group("matcher_edit_limit");
    let pool = candidates(10_000);

    for limit in [64, 256, 1_024, 10_000] {
        let matcher = FuzzyMatcher::new(MatcherOptions {
            edit_distance_candidate_limit: limit,
            ..MatcherOptions::default()
        });
        let label = format!("{limit}");

        group.bench_function(BenchmarkId::new("limit", &label), |b| {
            b.iter(|| matcher.match_candidates("qurey_1", pool.iter().map(String::as_str)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tiers, bench_candidate_limit);
criterion_main!(benches);
