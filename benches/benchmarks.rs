//! Performance benchmarks for fddflow.
//!
//! This module contains benchmarks for:
//! - Workflow resolution with growing extension chains
//! - Proposal synthesis over large signal sets
//! - Signal extraction over an in-memory codebase
//! - Artifact validation
//!
//! Run with: `cargo bench`

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fddflow::artifact::validate_artifact;
use fddflow::detect::{kinds, DetectorRegistry, MemoryCodebase, Signal, SignalExtractor};
use fddflow::propose::ProposalEngine;
use fddflow::workflow::{parse_workflow_str, resolve, WorkflowCatalog, WorkflowDefinition};

// ============================================================================
// Fixtures
// ============================================================================

mod fixtures {
    use super::*;

    /// A root workflow with `steps` question steps.
    pub fn base(steps: usize) -> WorkflowDefinition {
        let mut yaml = String::from("name: base\nsteps:\n");
        for i in 0..steps {
            yaml.push_str(&format!(
                "  - id: step-{i}\n    prompt: \"Question {i}?\"\n    proposal:\n      detectors: [npm, cargo]\n      kind: kind-{}\n",
                i % 5
            ));
        }
        parse_workflow_str(&yaml).unwrap()
    }

    /// A chain of extensions, each inserting one step and appending to another.
    pub fn extensions(count: usize) -> Vec<WorkflowDefinition> {
        (0..count)
            .map(|i| {
                let parent = if i == 0 { "base".to_string() } else { format!("ext-{}", i - 1) };
                let yaml = format!(
                    "name: ext-{i}\nparent: {parent}\nchanges:\n  - op: insert\n    position: after\n    anchor: step-0\n    step:\n      id: added-{i}\n      prompt: \"Added {i}?\"\n  - op: append\n    step: step-1\n    text: \"More {i}.\"\n"
                );
                parse_workflow_str(&yaml).unwrap()
            })
            .collect()
    }

    /// `count` signals spread over five kinds with overlapping values.
    pub fn signals(count: usize) -> Vec<Signal> {
        let detectors = ["npm", "cargo"];
        (0..count)
            .map(|i| {
                Signal::new(
                    detectors[i % 2],
                    format!("kind-{}", i % 5),
                    format!("Value {}", i % 17),
                    0.3 + (i % 7) as f64 * 0.1,
                )
            })
            .collect()
    }

    /// A codebase with a manifest per ecosystem and some feature directories.
    pub fn codebase(features: usize) -> MemoryCodebase {
        let mut codebase = MemoryCodebase::new()
            .with_file(
                "package.json",
                r#"{"name": "shop", "dependencies": {"express": "^4"}, "devDependencies": {"jest": "^29", "eslint": "^8"}}"#,
            )
            .with_file("Cargo.toml", "[package]\nname = \"shop-core\"\n\n[dependencies]\naxum = \"0.7\"\n")
            .with_file("Dockerfile", "FROM node:20\n");
        for i in 0..features {
            codebase = codebase.with_file(format!("src/features/feature-{i}/index.js"), "");
        }
        codebase
    }
}

// ============================================================================
// Resolution
// ============================================================================

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    for chain in &[1, 5, 20] {
        let base = fixtures::base(50);
        let extensions = fixtures::extensions(*chain);
        group.bench_with_input(BenchmarkId::new("extensions", chain), chain, |b, _| {
            b.iter(|| black_box(resolve(&base, &extensions).unwrap()));
        });
    }

    group.bench_function("builtin_catalog", |b| {
        let catalog = WorkflowCatalog::builtin().unwrap();
        b.iter(|| black_box(catalog.resolve("fdd-reverse-engineering").unwrap()));
    });

    group.finish();
}

// ============================================================================
// Proposal synthesis
// ============================================================================

fn bench_propose(c: &mut Criterion) {
    let mut group = c.benchmark_group("propose");
    let workflow = resolve(&fixtures::base(25), &[]).unwrap();
    let engine = ProposalEngine::new();

    for count in &[100, 1_000, 10_000] {
        let signals = fixtures::signals(*count);
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("signals", count), count, |b, _| {
            b.iter(|| black_box(engine.propose(&workflow, &signals)));
        });
    }

    group.finish();
}

// ============================================================================
// Extraction
// ============================================================================

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");
    let names: Vec<String> =
        ["npm", "cargo", "docker", "features"].iter().map(|s| (*s).to_string()).collect();

    for features in &[10, 100] {
        let extractor = SignalExtractor::new(
            Arc::new(fixtures::codebase(*features)),
            Arc::new(DetectorRegistry::builtin()),
        );
        group.bench_with_input(BenchmarkId::new("features", features), features, |b, _| {
            b.iter(|| {
                let report = extractor.extract_blocking(&names).unwrap();
                black_box(report.of_kind(kinds::FEATURE).count())
            });
        });
    }

    group.finish();
}

// ============================================================================
// Validation
// ============================================================================

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");
    let sections: Vec<String> = ["A", "B", "C"].iter().map(|s| (*s).to_string()).collect();

    let mut document = String::from("# Design\n\n## A. Overview\n\n");
    for i in 0..500 {
        document.push_str(&format!("- **ID**: `fdd-shop-req-{i}`\n"));
    }
    document.push_str("\n## B. Technology\n\nNode/Express\n\n## C. Delivery\n\nDocker\n");

    group.bench_function("document_500_ids", |b| {
        b.iter(|| black_box(validate_artifact(&document, &sections)));
    });

    group.finish();
}

criterion_group!(benches, bench_resolve, bench_propose, bench_extract, bench_validate);
criterion_main!(benches);
