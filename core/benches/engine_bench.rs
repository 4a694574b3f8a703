use criterion::{criterion_group, criterion_main, Criterion};
use posidx_core::{builder, soundex, EnglishNormalizer, Engine, Normalizer};
use std::sync::Arc;

const TEXT: &str = "Developing your business account and profile is a great way to boost \
    your restaurant's online reputation. Warwickshire came from an ancient family and was \
    the heiress to some land. Memory safety without garbage collection keeps latency low.";

fn corpus() -> Vec<(String, String)> {
    (0..200).map(|i| (format!("doc{i:04}.txt"), TEXT.repeat(1 + i % 5))).collect()
}

fn bench_normalize(c: &mut Criterion) {
    c.bench_function("normalize_paragraph", |b| b.iter(|| EnglishNormalizer.normalize(TEXT, true)));
}

fn bench_soundex(c: &mut Criterion) {
    c.bench_function("soundex_encode", |b| b.iter(|| soundex::encode("warwickshire")));
}

fn bench_queries(c: &mut Criterion) {
    let snapshot = builder::build(corpus(), &EnglishNormalizer).expect("build");
    let engine = Engine::new(Arc::new(snapshot), Arc::new(EnglishNormalizer));
    c.bench_function("vector_query", |b| b.iter(|| engine.search("restaurant online reputation")));
    c.bench_function("phrase_query", |b| b.iter(|| engine.search(r#""garbage collection""#)));
    c.bench_function("proximity_query", |b| b.iter(|| engine.search(r#""memory" w/5 "latency""#)));
}

criterion_group!(benches, bench_normalize, bench_soundex, bench_queries);
criterion_main!(benches);
