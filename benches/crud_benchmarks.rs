use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::collections::BTreeSet;
use tavl_tree::{Pos, RankTree};

const N: usize = 10_000;

// ─── Helper functions to generate value sequences ────────────────────────────

fn ordered_values(n: usize) -> Vec<i64> {
    (0..n as i64).collect()
}

fn reverse_ordered_values(n: usize) -> Vec<i64> {
    (0..n as i64).rev().collect()
}

fn random_values(n: usize) -> Vec<i64> {
    // Use a simple LCG for deterministic pseudo-random sequence
    let mut values = Vec::with_capacity(n);
    let mut x: u64 = 12345;
    for _ in 0..n {
        x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
        values.push((x >> 33) as i64);
    }
    values
}

// ─── Sorted insertion benchmarks ─────────────────────────────────────────────

fn bench_insert_ordered(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_ordered");

    group.bench_function(BenchmarkId::new("RankTree", N), |b| {
        b.iter(|| {
            let mut tree = RankTree::new();
            for i in 0..N as i64 {
                tree.search_or_insert(i);
            }
            tree
        });
    });

    group.bench_function(BenchmarkId::new("BTreeSet", N), |b| {
        b.iter(|| {
            let mut set = BTreeSet::new();
            for i in 0..N as i64 {
                set.insert(i);
            }
            set
        });
    });

    group.finish();
}

fn bench_insert_reverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_reverse");

    group.bench_function(BenchmarkId::new("RankTree", N), |b| {
        b.iter(|| {
            let mut tree = RankTree::new();
            for i in (0..N as i64).rev() {
                tree.search_or_insert(i);
            }
            tree
        });
    });

    group.bench_function(BenchmarkId::new("BTreeSet", N), |b| {
        b.iter(|| {
            let mut set = BTreeSet::new();
            for i in (0..N as i64).rev() {
                set.insert(i);
            }
            set
        });
    });

    group.finish();
}

fn bench_insert_random(c: &mut Criterion) {
    let values = random_values(N);
    let mut group = c.benchmark_group("insert_random");

    group.bench_function(BenchmarkId::new("RankTree", N), |b| {
        b.iter(|| {
            let mut tree = RankTree::new();
            for &v in &values {
                tree.search_or_insert(v);
            }
            tree
        });
    });

    group.bench_function(BenchmarkId::new("BTreeSet", N), |b| {
        b.iter(|| {
            let mut set = BTreeSet::new();
            for &v in &values {
                set.insert(v);
            }
            set
        });
    });

    group.finish();
}

// ─── Lookup benchmarks ───────────────────────────────────────────────────────

fn bench_contains_ordered(c: &mut Criterion) {
    let values = ordered_values(N);
    let tree: RankTree<i64> = values.iter().copied().collect();
    let set: BTreeSet<i64> = values.iter().copied().collect();

    let mut group = c.benchmark_group("contains_ordered");

    group.bench_function(BenchmarkId::new("RankTree", N), |b| {
        b.iter(|| {
            let mut count = 0usize;
            for &v in &values {
                if tree.contains(&v) {
                    count += 1;
                }
            }
            count
        });
    });

    group.bench_function(BenchmarkId::new("BTreeSet", N), |b| {
        b.iter(|| {
            let mut count = 0usize;
            for &v in &values {
                if set.contains(&v) {
                    count += 1;
                }
            }
            count
        });
    });

    group.finish();
}

fn bench_contains_random(c: &mut Criterion) {
    let values = random_values(N);
    let tree: RankTree<i64> = values.iter().copied().collect();
    let set: BTreeSet<i64> = values.iter().copied().collect();

    let mut group = c.benchmark_group("contains_random");

    group.bench_function(BenchmarkId::new("RankTree", N), |b| {
        b.iter(|| {
            let mut count = 0usize;
            for &v in &values {
                if tree.contains(&v) {
                    count += 1;
                }
            }
            count
        });
    });

    group.bench_function(BenchmarkId::new("BTreeSet", N), |b| {
        b.iter(|| {
            let mut count = 0usize;
            for &v in &values {
                if set.contains(&v) {
                    count += 1;
                }
            }
            count
        });
    });

    group.finish();
}

fn bench_position_of_random(c: &mut Criterion) {
    // No BTreeSet counterpart: rank queries would need a linear scan there.
    let values = random_values(N);
    let tree: RankTree<i64> = values.iter().copied().collect();

    let mut group = c.benchmark_group("position_of_random");

    group.bench_function(BenchmarkId::new("RankTree", N), |b| {
        b.iter(|| {
            let mut sum = 0usize;
            for &v in &values {
                if let Some(Pos(p)) = tree.position_of(&v) {
                    sum = sum.wrapping_add(p);
                }
            }
            sum
        });
    });

    group.finish();
}

// ─── Removal benchmarks ──────────────────────────────────────────────────────

fn bench_remove_ordered(c: &mut Criterion) {
    let values = ordered_values(N);

    let mut group = c.benchmark_group("remove_ordered");

    group.bench_function(BenchmarkId::new("RankTree", N), |b| {
        b.iter_batched(
            || values.iter().copied().collect::<RankTree<i64>>(),
            |mut tree| {
                for &v in &values {
                    tree.remove(&v);
                }
                tree
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.bench_function(BenchmarkId::new("BTreeSet", N), |b| {
        b.iter_batched(
            || values.iter().copied().collect::<BTreeSet<i64>>(),
            |mut set| {
                for &v in &values {
                    set.remove(&v);
                }
                set
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_remove_random(c: &mut Criterion) {
    let values = random_values(N);

    let mut group = c.benchmark_group("remove_random");

    group.bench_function(BenchmarkId::new("RankTree", N), |b| {
        b.iter_batched(
            || values.iter().copied().collect::<RankTree<i64>>(),
            |mut tree| {
                for &v in &values {
                    tree.remove(&v);
                }
                tree
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.bench_function(BenchmarkId::new("BTreeSet", N), |b| {
        b.iter_batched(
            || values.iter().copied().collect::<BTreeSet<i64>>(),
            |mut set| {
                for &v in &values {
                    set.remove(&v);
                }
                set
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

// ─── Iteration benchmarks ────────────────────────────────────────────────────

fn bench_iterate(c: &mut Criterion) {
    let values = random_values(N);
    let tree: RankTree<i64> = values.iter().copied().collect();
    let set: BTreeSet<i64> = values.iter().copied().collect();

    let mut group = c.benchmark_group("iterate");

    group.bench_function(BenchmarkId::new("RankTree", N), |b| {
        b.iter(|| {
            let mut sum = 0i64;
            for &v in &tree {
                sum = sum.wrapping_add(v);
            }
            sum
        });
    });

    group.bench_function(BenchmarkId::new("BTreeSet", N), |b| {
        b.iter(|| {
            let mut sum = 0i64;
            for &v in &set {
                sum = sum.wrapping_add(v);
            }
            sum
        });
    });

    group.finish();
}

// ─── Positional benchmarks ───────────────────────────────────────────────────

fn bench_insert_at_random(c: &mut Criterion) {
    let values = random_values(N);
    let mut group = c.benchmark_group("insert_at_random");

    group.bench_function(BenchmarkId::new("RankTree", N), |b| {
        b.iter(|| {
            let mut tree = RankTree::new();
            for (i, &v) in values.iter().enumerate() {
                tree.insert_at(v.unsigned_abs() as usize % (i + 1), v);
            }
            tree
        });
    });

    group.bench_function(BenchmarkId::new("Vec", N), |b| {
        b.iter(|| {
            let mut vec = Vec::new();
            for (i, &v) in values.iter().enumerate() {
                vec.insert(v.unsigned_abs() as usize % (i + 1), v);
            }
            vec
        });
    });

    group.finish();
}

fn bench_erase_at_random(c: &mut Criterion) {
    let values = random_values(N);
    let mut group = c.benchmark_group("erase_at_random");

    group.bench_function(BenchmarkId::new("RankTree", N), |b| {
        b.iter_batched(
            || values.iter().copied().collect::<RankTree<i64>>(),
            |mut tree| {
                while !tree.is_empty() {
                    let len = tree.len();
                    tree.erase_at(Pos(len / 2 + 1));
                }
                tree
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.bench_function(BenchmarkId::new("Vec", N), |b| {
        b.iter_batched(
            || {
                let set: BTreeSet<i64> = values.iter().copied().collect();
                set.into_iter().collect::<Vec<i64>>()
            },
            |mut vec| {
                while !vec.is_empty() {
                    vec.remove(vec.len() / 2);
                }
                vec
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_split_concat(c: &mut Criterion) {
    let values = ordered_values(N);
    let mut group = c.benchmark_group("split_concat");

    group.bench_function(BenchmarkId::new("RankTree", N), |b| {
        b.iter_batched(
            || values.iter().copied().collect::<RankTree<i64>>(),
            |mut tree| {
                let rest = tree.split_off(N / 2);
                tree.concat(rest);
                tree
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.bench_function(BenchmarkId::new("BTreeSet", N), |b| {
        b.iter_batched(
            || values.iter().copied().collect::<BTreeSet<i64>>(),
            |mut set| {
                let mut rest = set.split_off(&(N as i64 / 2));
                set.append(&mut rest);
                set
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

// ─── Criterion Groups ───────────────────────────────────────────────────────

criterion_group!(insert_benches, bench_insert_ordered, bench_insert_reverse, bench_insert_random,);

criterion_group!(lookup_benches, bench_contains_ordered, bench_contains_random, bench_position_of_random,);

criterion_group!(remove_benches, bench_remove_ordered, bench_remove_random,);

criterion_group!(iterate_benches, bench_iterate,);

criterion_group!(positional_benches, bench_insert_at_random, bench_erase_at_random, bench_split_concat,);

criterion_main!(insert_benches, lookup_benches, remove_benches, iterate_benches, positional_benches,);
