//! Benchmarks for the persona scoring pipeline.
//!
//! Run with: cargo bench -p personify-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::HashMap;

use personify_core::catalog::PersonaCatalog;
use personify_core::collaborators::SentenceEncoder;
use personify_core::config::{FusionConfig, SearchConfig};
use personify_core::error::PipelineError;
use personify_core::fusion::ScoreFusion;
use personify_core::math::l2_normalize_in_place;
use personify_core::search::SemanticSearch;
use personify_core::synonyms::SynonymIndex;
use personify_core::types::{Provenance, Term};

const DIM: usize = 64;

/// Deterministic text-to-vector hash, no model needed.
fn pseudo_vector(text: &str) -> Vec<f32> {
    let mut state: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in text.bytes() {
        state ^= byte as u64;
        state = state.wrapping_mul(0x0000_0100_0000_01b3);
    }
    let mut vector = Vec::with_capacity(DIM);
    for _ in 0..DIM {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        vector.push(((state as f64 / u64::MAX as f64) as f32) - 0.5);
    }
    l2_normalize_in_place(&mut vector);
    vector
}

struct HashEncoder;

impl SentenceEncoder for HashEncoder {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        Ok(texts.iter().map(|t| pseudo_vector(t)).collect())
    }
}

fn synthetic_catalog(size: usize) -> PersonaCatalog {
    PersonaCatalog::from_entries(
        (0..size)
            .map(|i| (format!("I enjoy hobby number {i}."), format!("cat{}", i % 20)))
            .collect(),
    )
}

fn synthetic_terms(count: usize) -> HashMap<String, Term> {
    (0..count)
        .map(|i| {
            let text = format!("concept{i}");
            (text.clone(), Term::new(text, 0.9, Provenance::Detection))
        })
        .collect()
}

fn synthetic_index(size: usize) -> SynonymIndex {
    SynonymIndex::from_vectors(
        (0..size)
            .map(|i| {
                let text = format!("concept{i}");
                let vector = pseudo_vector(&text);
                (text, vector)
            })
            .collect(),
    )
}

fn benchmark_search(c: &mut Criterion) {
    let catalog = synthetic_catalog(1000);
    let terms = synthetic_terms(20);
    let search = SemanticSearch::new(SearchConfig::default());
    let encoder = HashEncoder;

    c.bench_function("search_1000_personas_20_terms", |b| {
        b.iter(|| {
            let _ = search.search(black_box(&encoder), black_box(&catalog), black_box(&terms));
        })
    });
}

fn benchmark_fusion_with_synonyms(c: &mut Criterion) {
    let index = synthetic_index(10_000);
    let fusion = ScoreFusion::new(FusionConfig::default());
    let labels: Vec<String> = (0..10).map(|i| format!("concept{i}")).collect();

    c.bench_function("fusion_10_labels_10k_vocab", |b| {
        b.iter(|| {
            let _ = fusion.fuse(black_box(&labels), black_box(&[]), Some(black_box(&index)));
        })
    });
}

fn benchmark_nearest_neighbors(c: &mut Criterion) {
    let index = synthetic_index(10_000);

    c.bench_function("nearest_neighbors_top5_10k_vocab", |b| {
        b.iter(|| {
            let _ = index.nearest_neighbors(black_box("concept0"), black_box(5));
        })
    });
}

criterion_group!(
    benches,
    benchmark_search,
    benchmark_fusion_with_synonyms,
    benchmark_nearest_neighbors,
);
criterion_main!(benches);
