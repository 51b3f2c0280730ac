//! Criterion benchmarks for policy resolution and block admission.

use std::collections::BTreeSet;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tollgate_core::commit::{BlockCommit, ValidatorSet};
use tollgate_core::crypto::KeyPair;
use tollgate_core::types::{Action, Block, Hash256, Transaction};
use tollgate_policy::{validate_block, ChainPolicy, IndexFilter, PolicyTimeline, Span};

fn deep_timeline(spans: u64) -> PolicyTimeline<usize> {
    (0..spans).fold(PolicyTimeline::new(usize::MAX), |timeline, i| {
        timeline.add(
            Span::between(i * 10, i * 10 + 20, i as usize)
                .expect("valid span")
                .with_filter(IndexFilter::every(2)),
        )
    })
}

fn sample_block(index: u64, miner: &KeyPair, n: u8, commit: Option<BlockCommit>) -> Block {
    let txs: Vec<Transaction> = (0..n)
        .map(|i| {
            let signer = KeyPair::from_secret_bytes([i.wrapping_add(100); 32]);
            let action = Action::Custom { type_id: "noop".into(), payload: vec![i] };
            Transaction::create(0, &signer, Hash256::ZERO, vec![action], 0).expect("tx")
        })
        .collect();
    Block::create(index, 0, miner, Hash256([0x44; 32]), 0, commit, txs).expect("block")
}

fn bench_resolve(c: &mut Criterion) {
    let shallow = deep_timeline(4);
    let deep = deep_timeline(256);
    c.bench_function("timeline_resolve_4_spans", |b| {
        b.iter(|| shallow.resolve(black_box(1_000)))
    });
    c.bench_function("timeline_resolve_256_spans", |b| {
        b.iter(|| deep.resolve(black_box(10)))
    });
}

fn bench_validate_block(c: &mut Criterion) {
    let miner = KeyPair::from_secret_bytes([1; 32]);
    let validators: Vec<KeyPair> = (2..6).map(|s| KeyPair::from_secret_bytes([s; 32])).collect();

    let limits = ChainPolicy::builder(0)
        .max_tx_per_block(PolicyTimeline::new(200))
        .max_tx_per_signer_per_block(PolicyTimeline::new(4))
        .max_block_bytes(PolicyTimeline::new(1024 * 1024))
        .build();
    let block = sample_block(5, &miner, 100, None);
    c.bench_function("validate_block_100_tx_limits", |b| {
        b.iter(|| validate_block(black_box(&limits), black_box(&block)))
    });

    let authorized = ChainPolicy::builder(0)
        .authorized_miners(PolicyTimeline::new(BTreeSet::from([miner.address()])))
        .validators(PolicyTimeline::new(ValidatorSet::new(
            validators.iter().map(KeyPair::public_key),
        )))
        .build();
    let commit = BlockCommit::sign_by(&validators, 4, 0, Hash256([0x44; 32]), 0);
    let block = sample_block(5, &miner, 0, Some(commit));
    c.bench_function("validate_block_authorized_4_validators", |b| {
        b.iter(|| validate_block(black_box(&authorized), black_box(&block)))
    });
}

criterion_group!(benches, bench_resolve, bench_validate_block);
criterion_main!(benches);
