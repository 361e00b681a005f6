//! Matrix resolution benchmarks.
//!
//! Measures expansion of growing requirement matrices, with and without
//! exclude rules.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use envmatrix::matrix::{AmbientContext, RawRule, Requirement, Variant, resolve};

fn pythons() -> Vec<String> {
    ["2.7", "3.4", "3.5", "3.6"].map(String::from).to_vec()
}

/// `deps` dependencies with three variants each: two pinned, one absent
fn matrix(deps: usize) -> BTreeMap<String, Requirement> {
    (0..deps)
        .map(|i| {
            let variants = vec![
                Variant::Fixed("1.0".to_string()),
                Variant::Fixed("2.0".to_string()),
                Variant::Omit,
            ];
            (format!("dep{i}"), Requirement::OneOf(variants))
        })
        .collect()
}

fn exclude_rules() -> Vec<RawRule> {
    vec![
        RawRule::from([
            ("python".to_string(), Some("(?!2.7).*".to_string())),
            ("dep0".to_string(), Some("1\\..*".to_string())),
        ]),
        RawRule::from([
            ("python".to_string(), Some("3.5".to_string())),
            ("dep1".to_string(), None),
        ]),
    ]
}

fn bench_expand(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve/expand");
    let ambient = AmbientContext::new("virtualenv", "linux");

    for deps in [1usize, 3, 5, 7] {
        let matrix = matrix(deps);
        group.bench_with_input(BenchmarkId::from_parameter(deps), &matrix, |b, matrix| {
            b.iter(|| {
                resolve(black_box(&pythons()), matrix, &[], &[], &ambient)
                    .expect("matrix resolves")
            });
        });
    }

    group.finish();
}

fn bench_exclude(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve/exclude");
    let ambient = AmbientContext::new("virtualenv", "linux");
    let excludes = exclude_rules();

    for deps in [2usize, 4, 6] {
        let matrix = matrix(deps);
        group.bench_with_input(BenchmarkId::from_parameter(deps), &matrix, |b, matrix| {
            b.iter(|| {
                resolve(black_box(&pythons()), matrix, &[], &excludes, &ambient)
                    .expect("matrix resolves")
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_expand, bench_exclude);
criterion_main!(benches);
