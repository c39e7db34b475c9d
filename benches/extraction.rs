//! Benchmarks for the hot path of a final transcript.
//!
//! Benchmark targets:
//! - Extraction of a short utterance: <100us
//! - Extraction of a long monologue: <1ms
//! - Canonicalization: <50us
//! - TF-IDF similarity against five snippets: <200us

// Criterion macros generate items without docs - this is expected for benchmarks
#![allow(missing_docs)]

use claimcheck::evidence::similarities;
use claimcheck::{Canonicalizer, ClaimExtractor, ClaimKey};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

// ============================================================================
// Extraction Benchmarks
// ============================================================================

const SHORT: &str = "The Eiffel Tower is in Paris.";
const MEDIUM: &str = "Well, so the Eiffel Tower was completed in 1889 and it is about \
    330 meters tall. I think it's beautiful. Paris is the capital of France.";
const LONG: &str = "Good evening everyone. Unemployment fell to 3.5 percent last year, \
    which is the lowest level in fifty years. The Great Wall of China is visible from \
    space, according to some people. Water boils at 100 degrees Celsius at sea level. \
    Our company was founded in 1998 and now employs more than 12,000 people across \
    40 countries. I believe we will double revenue next year. Mount Everest is the \
    tallest mountain on Earth and the Amazon is the longest river in the world. \
    What do you think about that? Honestly, my sister lives in Berlin and loves it.";

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");
    group.measurement_time(Duration::from_secs(5));
    let extractor = ClaimExtractor::default();

    for (name, transcript) in [("short", SHORT), ("medium", MEDIUM), ("long", LONG)] {
        group.throughput(Throughput::Bytes(transcript.len() as u64));
        group.bench_with_input(BenchmarkId::new("extract", name), transcript, |b, t| {
            b.iter(|| extractor.extract(black_box(t)));
        });
    }

    group.finish();
}

fn bench_canonicalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("canonicalization");

    group.bench_function("canonicalize", |b| {
        b.iter(|| Canonicalizer::canonicalize(black_box("The Eiffel Tower was completed in 1889")));
    });

    group.bench_function("claim_key", |b| {
        b.iter(|| ClaimKey::of(black_box("  The Eiffel Tower is in Paris!! ")));
    });

    group.finish();
}

// ============================================================================
// Similarity Benchmarks
// ============================================================================

fn bench_similarity(c: &mut Criterion) {
    let mut group = c.benchmark_group("similarity");
    let snippets: Vec<String> = [
        "The Eiffel Tower is a wrought-iron lattice tower on the Champ de Mars in Paris, France.",
        "It is named after the engineer Gustave Eiffel, whose company designed and built the tower.",
        "Locally nicknamed La dame de fer, it was constructed from 1887 to 1889.",
        "The tower is 330 metres tall, about the same height as an 81-storey building.",
        "It was the tallest man-made structure in the world until the Chrysler Building in 1930.",
    ]
    .iter()
    .map(ToString::to_string)
    .collect();

    for count in [1usize, 5] {
        group.bench_with_input(BenchmarkId::new("tfidf", count), &count, |b, &n| {
            b.iter(|| similarities(black_box("The Eiffel Tower is in Paris"), &snippets[..n]));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_extraction,
    bench_canonicalization,
    bench_similarity
);
criterion_main!(benches);
