//! Benchmarks for the hot path of checkout: validation and vendor split.

use chrono::NaiveDate;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use common::{ConsumerId, Money, ProductId, VendorId, Week};
use domain::{split_by_vendor, validate_lines};
use market_store::{CartLine, Product};

fn cart_of(lines: usize, vendors: usize) -> Vec<(CartLine, Option<Product>)> {
    let consumer = ConsumerId::new();
    let vendor_ids: Vec<VendorId> = (0..vendors).map(|_| VendorId::new()).collect();
    let week = Week::new(2026, 35);

    (0..lines)
        .map(|i| {
            let product = Product {
                id: ProductId::new(),
                vendor_id: vendor_ids[i % vendors],
                name: format!("Produto {i}"),
                image_url: None,
                price: Money::from_cents(100 + i as i64),
                stock: 50,
                active: true,
                week,
                expires_on: NaiveDate::from_ymd_opt(2026, 8, 30).unwrap(),
            };
            let line = CartLine::new(consumer, product.id, 2, product.price);
            (line, Some(product))
        })
        .collect()
}

fn bench_validate(c: &mut Criterion) {
    let today = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
    let week = Week::of(today);
    let cart = cart_of(100, 8);

    c.bench_function("validate_100_lines", |b| {
        b.iter(|| validate_lines(black_box(&cart), today, week));
    });
}

fn bench_split(c: &mut Criterion) {
    let today = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
    let week = Week::of(today);
    let cart = cart_of(100, 8);
    let report = validate_lines(&cart, today, week);

    c.bench_function("split_100_lines_8_vendors", |b| {
        b.iter(|| split_by_vendor(black_box(report.valid.clone())));
    });
}

criterion_group!(benches, bench_validate, bench_split);
criterion_main!(benches);
