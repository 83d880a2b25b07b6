use agora_ledger::{ContributionType, ReputationLedger, Role, RoleTable, TokenLedger, TokenParams};
use agora_types::{Address, CallContext, U256};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

fn manager() -> Address {
    Address::from_bytes([1u8; 20])
}

fn bench_reputation(c: &mut Criterion) {
    let mut group = c.benchmark_group("reputation");
    let roles = RoleTable::new().with_grant(Role::ReputationManager, manager());

    group.bench_function("add_1k", |b| {
        b.iter_batched(
            || ReputationLedger::new(1_000),
            |mut ledger| {
                for i in 0..1000u64 {
                    let ctx = CallContext::new(manager(), i, i * 12);
                    let who = Address::from_bytes([(i % 250) as u8 + 2; 20]);
                    ledger
                        .add_reputation(&roles, &ctx, who, ContributionType::Code, U256::from(100u64))
                        .unwrap();
                }
                black_box(ledger.total_reputation(12_000));
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_token_transfers(c: &mut Criterion) {
    let mut group = c.benchmark_group("token");

    group.bench_function("transfer_1k_with_checkpoints", |b| {
        b.iter_batched(
            || {
                let mut token = TokenLedger::new(TokenParams {
                    name: "Bench".into(),
                    symbol: "BNC".into(),
                    max_supply: U256::from(u64::MAX),
                    staking_reward_rate_bps: 500,
                });
                token.mint_genesis(manager(), U256::from(1_000_000u64)).unwrap();
                token
            },
            |mut token| {
                for i in 0..1000u64 {
                    let ctx = CallContext::new(manager(), i, i * 12);
                    let to = Address::from_bytes([(i % 250) as u8 + 2; 20]);
                    token.transfer(&ctx, to, U256::ONE).unwrap();
                }
                black_box(token.get_past_votes(&manager(), 500));
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_reputation, bench_token_transfers);
criterion_main!(benches);
