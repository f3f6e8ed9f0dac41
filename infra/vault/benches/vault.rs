use coffer_vault::kdf::derive_key;
use coffer_vault::prelude::*;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use getrandom::fill;
use std::hint::black_box;

fn bench_kdf(c: &mut Criterion) {
    let mut group = c.benchmark_group("kdf");
    let salt = Salt::from_bytes([7u8; 12]);

    for iterations in [1_000u32, 10_000] {
        group.throughput(Throughput::Elements(u64::from(iterations)));
        group.bench_with_input(BenchmarkId::new("derive_key", iterations), &iterations, |b, &n| {
            b.iter(|| derive_key(black_box(b"bench password"), &salt, n).unwrap());
        });
    }

    group.finish();
}

fn bench_encrypt_decrypt(c: &mut Criterion) {
    let mut group = c.benchmark_group("encrypt_decrypt");

    let vault = Vault::<Aes>::builder().calibration(Calibration::Fixed(1)).build();
    vault.generate(b"bench password").expect("generate failed");

    let sizes = [("256B", 256usize), ("4KB", 4 * 1024), ("64KB", 64 * 1024)];

    for (label, size) in sizes {
        let mut data = vec![0u8; size];
        fill(&mut data).expect("System RNG unavailable for benchmark data");

        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("encrypt", label), &data, |b, d| {
            b.iter(|| vault.encrypt(d).unwrap());
        });

        let sealed = vault.encrypt(&data).expect("encrypt failed");

        group.bench_with_input(BenchmarkId::new("decrypt", label), &sealed, |b, s| {
            b.iter(|| vault.decrypt(s).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_kdf, bench_encrypt_decrypt);
criterion_main!(benches);
