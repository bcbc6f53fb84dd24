use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use hmis::auth::{Role, TokenService};
use hmis::models::appointment::overlaps;
use hmis::models::billing::{total_cents, BillItemRequest, ItemCategory};

const SECRET: &str = "benchmark-secret-benchmark-secret!!";

fn token_benchmarks(c: &mut Criterion) {
    let tokens = TokenService::new(SECRET, 60);

    c.bench_function("token_issue", |b| {
        b.iter(|| tokens.issue(black_box(42), black_box("dr.grey"), Role::Doctor))
    });

    let issued = match tokens.issue(42, "dr.grey", Role::Doctor) {
        Ok(issued) => issued,
        Err(e) => panic!("token issue failed: {}", e),
    };
    c.bench_function("token_verify", |b| b.iter(|| tokens.verify(black_box(&issued.token))));
}

fn billing_benchmarks(c: &mut Criterion) {
    let items: Vec<BillItemRequest> = (0..200)
        .map(|i| BillItemRequest {
            description: format!("Line {}", i),
            category: ItemCategory::Pharmacy,
            quantity: (i % 7) + 1,
            unit_price_cents: 1_250 + i,
        })
        .collect();

    c.bench_function("bill_total_200_items", |b| b.iter(|| total_cents(black_box(&items))));
}

fn scheduling_benchmarks(c: &mut Criterion) {
    let start = Utc::now();
    let slots: Vec<_> = (0..96).map(|i| start + Duration::minutes(i * 15)).collect();

    c.bench_function("overlap_scan_96_slots", |b| {
        b.iter(|| {
            slots
                .iter()
                .filter(|slot| overlaps(black_box(start + Duration::minutes(40)), 30, **slot, 15))
                .count()
        })
    });
}

criterion_group!(benches, token_benchmarks, billing_benchmarks, scheduling_benchmarks);
criterion_main!(benches);
