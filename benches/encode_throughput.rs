use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use par::codec::{Gf8Codec, StripeCodec};
use par::par2::Gf16Codec;

const DATA_SHARDS: usize = 10;
const PARITY_SHARDS: usize = 3;
const SHARD_SIZE: usize = 64 * 1024;

fn stripe() -> Vec<Vec<u8>> {
    let mut shards = Vec::with_capacity(DATA_SHARDS + PARITY_SHARDS);
    for i in 0..DATA_SHARDS {
        shards.push((0..SHARD_SIZE).map(|b| (i * 31 + b * 7) as u8).collect());
    }
    shards.extend(std::iter::repeat(vec![0u8; SHARD_SIZE]).take(PARITY_SHARDS));
    shards
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("stripe_encode");
    group.throughput(Throughput::Bytes((DATA_SHARDS * SHARD_SIZE) as u64));

    group.bench_function("gf8", |b| {
        let mut codec = Gf8Codec::new(DATA_SHARDS, PARITY_SHARDS).unwrap();
        let mut shards = stripe();
        b.iter(|| {
            let mut views: Vec<&mut [u8]> =
                shards.iter_mut().map(|v| v.as_mut_slice()).collect();
            codec.encode(0, &mut views).unwrap();
            black_box(&shards);
        });
    });

    group.bench_function("gf16", |b| {
        let mut codec = Gf16Codec::new(DATA_SHARDS, PARITY_SHARDS).unwrap();
        let mut shards = stripe();
        b.iter(|| {
            let mut views: Vec<&mut [u8]> =
                shards.iter_mut().map(|v| v.as_mut_slice()).collect();
            codec.encode(0, &mut views).unwrap();
            black_box(&shards);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_encode);
criterion_main!(benches);
