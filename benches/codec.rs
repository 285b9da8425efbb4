use core::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sivcore::{
    build_table, decrypt_in_place, fold_batched, fold_horner, HashKey, KeySchedule, PowersTable,
    State, Tag,
};

fn benchmark(c: &mut Criterion) {
    let key = HashKey::new_unchecked(&[1u8; 16]);
    let table: PowersTable = build_table(&key);
    // Arbitrary round keys.
    let keys = KeySchedule::from([[0x2bu8; 16]; 11]);
    let tag = Tag::from([0x5au8; 16]);

    let sizes = [16, 64, 128, 256, 512, 1024, 2048, 4096, 8192];

    let mut g = c.benchmark_group("polyval");
    for size in sizes {
        g.throughput(Throughput::Bytes(size as u64));
        let data = vec![0; size];
        g.bench_with_input(BenchmarkId::new("fold_horner", size), &data, |b, data| {
            b.iter(|| black_box(fold_horner(State::default(), black_box(&key), black_box(data))));
        });
        g.bench_with_input(BenchmarkId::new("fold_batched", size), &data, |b, data| {
            b.iter(|| {
                black_box(fold_batched(
                    State::default(),
                    black_box(&table),
                    black_box(data),
                ))
            });
        });
    }
    g.finish();

    let mut g = c.benchmark_group("decrypt");
    for size in sizes {
        for size in [size, size - 1] {
            g.throughput(Throughput::Bytes(size as u64));
            g.bench_with_input(BenchmarkId::new("in_place", size), &size, |b, &size| {
                let mut buf = vec![0; size];
                b.iter(|| {
                    black_box(decrypt_in_place(
                        black_box(&keys),
                        black_box(&table),
                        black_box(&tag),
                        State::default(),
                        black_box(&mut buf),
                    ))
                });
            });
        }
    }
    g.finish();
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
