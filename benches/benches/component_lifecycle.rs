// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use trellis_class::Options;
use trellis_component::event::COMPONENT_SHOWN;
use trellis_component::{ComponentId, ComponentTree, EventPayload, ShowOptions, component_type};

fn singly_tree(n: usize) -> (ComponentTree, ComponentId, Vec<ComponentId>) {
    let mut tree = ComponentTree::new();
    let ty = component_type();
    let root = tree.create_with(&ty, Options::new().with("singly", true));
    let kids = (0..n)
        .map(|i| {
            let c = tree.create_with(&ty, Options::new());
            tree.add_component(root, c, Some(&format!("tab{i}")))
                .expect("unique tab names");
            c
        })
        .collect();
    (tree, root, kids)
}

fn bench_singly(c: &mut Criterion) {
    let mut group = c.benchmark_group("singly");
    for n in [4_usize, 32, 256] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("cycle_tabs_n{n}"), |b| {
            let (mut tree, _, kids) = singly_tree(n);
            b.iter(|| {
                for k in &kids {
                    tree.show(*k, ShowOptions::default());
                }
                black_box(tree.len())
            });
        });
    }
    group.finish();
}

fn bench_bubble(c: &mut Criterion) {
    let mut group = c.benchmark_group("bubble");
    for depth in [2_usize, 8, 32] {
        group.bench_function(format!("chain_depth{depth}"), |b| {
            let mut tree = ComponentTree::new();
            let ty = component_type();
            let mut parent = tree.create_with(&ty, Options::new());
            tree.listen(parent, "ping", |_, e| {
                black_box(e);
            });
            for _ in 0..depth {
                let child = tree.create_with(&ty, Options::new());
                tree.add_component(parent, child, Some("next"))
                    .expect("fresh child under a fresh parent");
                tree.bubble(parent, "next", "ping");
                parent = child;
            }
            let leaf = parent;
            b.iter(|| tree.trigger(leaf, "ping", EventPayload::Custom(Vec::new())));
        });
    }
    group.finish();
}

fn bench_build_and_destroy(c: &mut Criterion) {
    c.bench_function("build_destroy_n128", |b| {
        b.iter_batched(
            || singly_tree(128),
            |(mut tree, root, _)| {
                tree.listen(root, COMPONENT_SHOWN, |_, _| {});
                black_box(tree.destroy(root))
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_singly, bench_bubble, bench_build_and_destroy);
criterion_main!(benches);
