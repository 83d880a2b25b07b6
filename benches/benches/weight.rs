use agora_governance::weight::{voting_weight, WeightParams};
use agora_types::U256;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_isqrt(c: &mut Criterion) {
    let mut group = c.benchmark_group("u256_isqrt");
    let small = U256::from(1_000_000u64);
    let large = U256::from_u128(u128::MAX).checked_mul(&U256::from(u64::MAX)).unwrap();

    group.bench_function("u64_range", |b| b.iter(|| black_box(small.isqrt())));
    group.bench_function("wide", |b| b.iter(|| black_box(large.isqrt())));
    group.finish();
}

fn bench_voting_weight(c: &mut Criterion) {
    let mut group = c.benchmark_group("voting_weight");
    let tokens = U256::from(1_234_567_890u64);
    let reputation = U256::from(98_765u64);

    for (name, quadratic) in [("linear", 0u16), ("blended", 5_000), ("quadratic", 10_000)] {
        let params = WeightParams {
            reputation_weight_factor_bps: 5_000,
            quadratic_voting_factor_bps: quadratic,
        };
        group.bench_function(name, |b| {
            b.iter(|| black_box(voting_weight(&tokens, &reputation, &params)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_isqrt, bench_voting_weight);
criterion_main!(benches);
