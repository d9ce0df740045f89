//! Benchmarks for page classification and extraction.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serpflow::classifier::PageClassifier;
use serpflow::extract::ResultExtractor;
use serpflow::query::{QueryBuilder, QueryParams};
use serpflow::testing::fixtures;

fn extract_benchmark(c: &mut Criterion) {
    let query = QueryBuilder::new()
        .build(&QueryParams::new("apify", "en-US", "en", 10))
        .expect("valid query");
    let extractor = ResultExtractor::default();
    let large = fixtures::serp_page("apify", 1, 50);

    c.bench_function("extract_apify_page", |b| {
        b.iter(|| black_box(extractor.extract_html(&query, black_box(fixtures::APIFY_SERP))));
    });

    c.bench_function("extract_50_results", |b| {
        b.iter(|| black_box(extractor.extract_html(&query, black_box(&large))));
    });
}

fn classify_benchmark(c: &mut Criterion) {
    let query = QueryBuilder::new()
        .build(&QueryParams::new("apify", "en-US", "en", 10))
        .expect("valid query");
    let classifier = PageClassifier::default();

    c.bench_function("classify_ok_page", |b| {
        b.iter(|| black_box(classifier.classify_body(&query, 200, black_box(fixtures::APIFY_SERP))));
    });

    c.bench_function("classify_captcha_page", |b| {
        b.iter(|| black_box(classifier.classify_body(&query, 200, black_box(fixtures::CAPTCHA_PAGE))));
    });
}

criterion_group!(benches, extract_benchmark, classify_benchmark);
criterion_main!(benches);
