// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use trellis_events::emitter::{Emitter, listener};

fn counting_emitter(n: usize) -> Emitter<u64, u64> {
    let mut em = Emitter::new();
    for _ in 0..n {
        em.on("tick", listener(|acc: &mut u64, v: &u64| *acc += *v));
    }
    em
}

fn bench_trigger(c: &mut Criterion) {
    let mut group = c.benchmark_group("emitter");
    for n in [1_usize, 8, 64, 512] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("trigger_n{n}"), |b| {
            let mut em = counting_emitter(n);
            let mut acc = 0_u64;
            b.iter(|| {
                em.trigger(&mut acc, black_box("tick"), &1);
                black_box(acc)
            });
        });
    }
    group.bench_function("once_rearm_n64", |b| {
        b.iter_batched(
            || {
                let mut em: Emitter<u64, u64> = Emitter::new();
                for _ in 0..64 {
                    em.once("tick", listener(|acc: &mut u64, v: &u64| *acc += *v));
                }
                em
            },
            |mut em| {
                let mut acc = 0_u64;
                em.trigger(&mut acc, "tick", &1);
                black_box(acc)
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_trigger);
criterion_main!(benches);
