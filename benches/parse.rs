use criterion::{Criterion, criterion_group, criterion_main};
use std::fs;
use std::hint::black_box;
use std::path::Path;
use webharvest::internal::books::extract_catalog;
use webharvest::internal::quotes::extract_listing;

pub fn catalog_benchmark(c: &mut Criterion) {
    let test_page_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("benches/catalog_page.html");
    let test_page = fs::read_to_string(test_page_path).expect("can read test file");
    c.bench_function("parse_catalog", |b| {
        b.iter(|| extract_catalog(black_box(&test_page)))
    });
}

pub fn listing_benchmark(c: &mut Criterion) {
    let test_page_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("benches/quotes_page.html");
    let test_page = fs::read_to_string(test_page_path).expect("can read test file");
    c.bench_function("parse_listing", |b| {
        b.iter(|| extract_listing(black_box(&test_page)))
    });
}

criterion_group!(benches, catalog_benchmark, listing_benchmark);
criterion_main!(benches);
