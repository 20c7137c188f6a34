//! Benchmark direct chunk writes against hyperslab writes and chunk reads.
#![allow(missing_docs)]

use std::sync::Arc;

use chunkbench::bench::config::{BenchmarkConfig, WriteStrategy};
use chunkbench::bench::container_writer::write_chunks;
use chunkbench::container::{ContainerBuilder, DataType};
use chunkbench_codec::filter::fletcher32::Fletcher32Filter;
use chunkbench_codec::filter::passthrough::PassthroughFilter;
use chunkbench_codec::{FilterFlags, FilterRegistry};
use chunkbench_storage::store::MemoryStore;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn container_write(c: &mut Criterion) {
    let registry = FilterRegistry::new();
    let mut group = c.benchmark_group("container_write");
    for size in [64u64, 256u64, 1024u64] {
        for strategy in [WriteStrategy::Direct, WriteStrategy::Traditional] {
            let config = BenchmarkConfig::builder()
                .nx(size)
                .ny(size)
                .n_images(100)
                .chunk_size(10)
                .strategy(strategy)
                .build()
                .unwrap();
            let buffer = vec![42u8; config.chunk_bytes()];
            group.throughput(Throughput::Bytes(config.total_bytes()));
            group.bench_with_input(
                BenchmarkId::new(strategy.to_string(), size),
                &config,
                |b, config| {
                    b.iter(|| {
                        let mut container =
                            ContainerBuilder::new(config.array_shape(), DataType::UInt8)
                                .chunk_shape(config.chunk_shape())
                                .filter(PassthroughFilter::ID, FilterFlags::Mandatory, vec![])
                                .create(Arc::new(MemoryStore::new()), &registry)
                                .unwrap();
                        write_chunks(&mut container, config, &buffer).unwrap();
                    });
                },
            );
        }
    }
    group.finish();
}

fn container_read_chunk(c: &mut Criterion) {
    let registry = FilterRegistry::new();
    let mut group = c.benchmark_group("container_read_chunk");
    for (name, filter) in [
        ("passthrough", PassthroughFilter::ID),
        ("fletcher32", Fletcher32Filter::ID),
    ] {
        let size = 512u64;
        group.throughput(Throughput::Bytes(size * size));
        group.bench_function(BenchmarkId::new(name, size), |b| {
            let mut container = ContainerBuilder::new(vec![size * 4, size], DataType::UInt8)
                .chunk_shape(vec![size, size])
                .filter(filter, FilterFlags::Mandatory, vec![])
                .create(Arc::new(MemoryStore::new()), &registry)
                .unwrap();
            let data = vec![1u8; usize::try_from(size * size).unwrap()];
            container.store_chunk(&[1, 0], &data).unwrap();

            b.iter(|| container.retrieve_chunk(&[1, 0]).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, container_write, container_read_chunk);
criterion_main!(benches);
