//! Benchmarks for the merge drivers.
//!
//! Run with: cargo bench --bench assemble_benchmark

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use sbom_assembler::assemble::{cdx, MergeContext, MergeSettings};
use sbom_assembler::config::{MergeMode, MergeStrategy};
use sbom_assembler::matching::{build_matcher, MatcherConfig};
use sbom_assembler::model::cyclonedx::{Bom, Component, Dependency, Metadata};
use sbom_assembler::model::SbomSpec;
use std::hint::black_box;

/// Generate a BOM with `count` components in a dependency chain.
///
/// `shared` components are named identically across prefixes, so they
/// deduplicate (build) or match (augment) between generated documents.
fn generate_bom(prefix: &str, count: usize, shared: usize) -> Bom {
    let primary_ref = format!("{prefix}-root");
    let mut components = Vec::with_capacity(count);
    let mut dependencies = Vec::with_capacity(count);
    for i in 0..count {
        let name = if i < shared {
            format!("shared-{i}")
        } else {
            format!("{prefix}-component-{i}")
        };
        let version = format!("1.{}.{}", i % 10, i % 100);
        let bom_ref = format!("{prefix}-{i}");
        let purl = format!("pkg:npm/{name}@{version}");
        components.push(
            Component::new("library", name)
                .with_version(version)
                .with_purl(purl)
                .with_bom_ref(bom_ref.clone()),
        );
        let next = if i + 1 < count {
            vec![format!("{prefix}-{}", i + 1)]
        } else {
            Vec::new()
        };
        dependencies.push(Dependency::new(bom_ref, next));
    }
    dependencies.push(Dependency::new(primary_ref.clone(), vec![format!("{prefix}-0")]));

    Bom {
        spec_version: "1.5".to_string(),
        metadata: Some(Metadata {
            component: Some(
                Component::new("application", prefix)
                    .with_version("1.0")
                    .with_bom_ref(primary_ref),
            ),
            ..Metadata::default()
        }),
        components,
        dependencies,
        ..Bom::default()
    }
}

fn bench_build_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("cdx_build");
    for size in [100, 1_000, 5_000] {
        let inputs = vec![
            generate_bom("a", size, size / 10),
            generate_bom("b", size, size / 10),
            generate_bom("c", size, size / 10),
        ];
        for strategy in [MergeStrategy::Flat, MergeStrategy::Hierarchical] {
            let mut settings = MergeSettings::new(strategy, SbomSpec::CycloneDx);
            settings.app.name = "bench".to_string();
            group.bench_with_input(
                BenchmarkId::new(strategy.to_string(), size),
                &inputs,
                |b, inputs| {
                    b.iter(|| {
                        let mut ctx = MergeContext::new(&settings);
                        black_box(cdx::merge(black_box(inputs), &mut ctx))
                    });
                },
            );
        }
    }
    group.finish();
}

fn bench_augment(c: &mut Criterion) {
    let mut group = c.benchmark_group("cdx_augment");
    for size in [100, 1_000, 5_000] {
        let primary = generate_bom("p", size, size / 2);
        let secondaries = vec![generate_bom("s", size, size / 2)];
        let mut settings = MergeSettings::new(MergeStrategy::Augment, SbomSpec::CycloneDx);
        settings.merge_mode = MergeMode::IfMissingOrEmpty;
        let matcher = build_matcher(&MatcherConfig::default());

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut target = primary.clone();
                let mut ctx = MergeContext::new(&settings);
                cdx::augment(&mut target, black_box(&secondaries), matcher.as_ref(), &mut ctx);
                black_box(target)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build_merge, bench_augment);
criterion_main!(benches);
