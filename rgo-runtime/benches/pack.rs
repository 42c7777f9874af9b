//! Pack primitive benchmarks
//!
//! Measures bulk vector construction against the generic per-element path,
//! and the cost of torture mode. Each iteration uses a fresh heap so
//! quarantined objects do not accumulate.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rgo_runtime::{pack, Context, Heap};

fn bench_slices(c: &mut Criterion) {
    let mut group = c.benchmark_group("slice");

    for size in [16, 256, 4096].iter() {
        let data: Vec<i32> = (0..*size).collect();

        group.bench_with_input(BenchmarkId::new("bulk", size), &data, |b, data| {
            b.iter(|| {
                let heap = Heap::new();
                let cx = Context::new(&heap);
                black_box(pack::integer_slice(&cx, black_box(data)));
            });
        });

        group.bench_with_input(BenchmarkId::new("generic", size), &data, |b, data| {
            b.iter(|| {
                let heap = Heap::new();
                let cx = Context::new(&heap);
                black_box(pack::list(&cx, black_box(data), |cx, x| pack::integer(cx, *x)));
            });
        });
    }

    group.finish();
}

fn bench_struct(c: &mut Criterion) {
    let names = ["Name", "Age", "Email", "Score"];

    c.bench_function("struct/plain", |b| {
        b.iter(|| {
            let heap = Heap::new();
            let cx = Context::new(&heap);
            black_box(pack::pairlist_struct(&cx, &names, |cx, i| pack::integer(cx, i as i32)));
        });
    });

    c.bench_function("struct/torture", |b| {
        b.iter(|| {
            let heap = Heap::torture();
            let cx = Context::new(&heap);
            black_box(pack::pairlist_struct(&cx, &names, |cx, i| pack::integer(cx, i as i32)));
        });
    });
}

criterion_group!(benches, bench_slices, bench_struct);
criterion_main!(benches);
