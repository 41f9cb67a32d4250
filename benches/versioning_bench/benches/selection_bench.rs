//! Version resolution benchmarks
//!
//! Measures parsing, endpoint selection and catalog collation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use http::Method;
use rustapi_versioning::{
    select, ActionConventionBuilder, ApiVersion, ApiVersionCatalog, ApiVersionConventionBuilder,
    ApiVersionPolicy, EndpointTable, RawApiVersion,
};

/// Table with one endpoint per version under a single route
fn table(versions: u32) -> EndpointTable<u32> {
    let group = ApiVersionConventionBuilder::new()
        .has_api_versions((1..=versions).map(|major| ApiVersion::new(major, 0)))
        .build();

    let mut table = EndpointTable::new();
    for major in 1..=versions {
        table.register(
            "/orders",
            [Method::GET],
            major,
            ActionConventionBuilder::new()
                .map_to_api_version(ApiVersion::new(major, 0))
                .build(&group),
        );
    }
    table
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for text in ["1", "2.1", "3.0-beta", "2024-01-31", "2024-01-31.2.0-rc1"] {
        group.bench_with_input(BenchmarkId::from_parameter(text), text, |b, text| {
            b.iter(|| black_box(text).parse::<ApiVersion>())
        });
    }

    group.finish();
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("select");

    for size in [2u32, 10, 50] {
        let table = table(size);
        let requested = ApiVersion::new(size, 0);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| select(Some(black_box(&requested)), table.candidates("/orders")).is_none())
        });
    }

    group.finish();
}

fn bench_policy(c: &mut Criterion) {
    let table = table(10);
    let policy = ApiVersionPolicy::default();

    c.bench_function("policy_resolve", |b| {
        b.iter(|| {
            policy
                .resolve(
                    &Method::GET,
                    "/orders",
                    RawApiVersion::Single(black_box("7.0").to_string()),
                    table.candidates("/orders"),
                )
                .is_ok()
        })
    });
}

fn bench_collate(c: &mut Criterion) {
    let mut group = c.benchmark_group("collate");
    let default = ApiVersion::new(1, 0);

    for size in [10u32, 100] {
        let table = table(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| ApiVersionCatalog::collate(table.models(), black_box(&default)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_select, bench_policy, bench_collate);
criterion_main!(benches);
