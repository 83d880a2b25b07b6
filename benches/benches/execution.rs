use agora_governance::{Action, Dao, DaoConfig, TreasuryCall, VoteSupport, TREASURY};
use agora_types::{Address, CallContext, U256};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

fn admin() -> Address {
    Address::from_bytes([0x01; 20])
}

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("proposal_execution");

    group.bench_function("ten_actions", |b| {
        b.iter_batched(
            || {
                let mut config = DaoConfig::default();
                config.governance.voting_period = 10;
                let mut dao = Dao::new(&config).unwrap();
                let actions = (0..10u16)
                    .map(|fee| Action::system(TREASURY, &TreasuryCall::SetTransactionFee(fee)).unwrap())
                    .collect();
                let id = dao
                    .propose(&CallContext::new(admin(), 1, 12), actions, "bench")
                    .unwrap();
                dao.cast_vote(&CallContext::new(admin(), 2, 24), &id, VoteSupport::For)
                    .unwrap();
                (dao, id)
            },
            |(mut dao, id)| {
                dao.execute(&CallContext::new(admin(), 12, 144), &id).unwrap();
                black_box(dao.treasury().params().transaction_fee_bps);
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("live_vote_weight", |b| {
        let dao = Dao::new(&DaoConfig::default()).unwrap();
        b.iter(|| black_box(dao.voting_weight(&admin(), 1_000)))
    });

    group.finish();
}

criterion_group!(benches, bench_execute);
criterion_main!(benches);
