//! Benchmarks for batched submission overhead.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gpu_fft_driver::{run_batched, FftApplication, FftConfig, GpuBuffer, GpuContext, MemoryProperties};
use wgpu::BufferUsages;

fn bench_batch_sizes(c: &mut Criterion) {
    let ctx = match pollster::block_on(GpuContext::headless()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Skipping GPU benchmarks: {}", e);
            return;
        }
    };

    let config = FftConfig {
        dim: 2,
        size: [256, 256, 1],
        r2c: true,
        ..Default::default()
    };
    let buffer = GpuBuffer::new(
        &ctx,
        config.buffer_size(),
        BufferUsages::STORAGE | BufferUsages::COPY_SRC | BufferUsages::COPY_DST,
        MemoryProperties::DEVICE_LOCAL,
    )
    .expect("buffer allocation failed");
    let plan = FftApplication::new(&ctx, &config, &buffer, None).expect("plan build failed");

    let mut group = c.benchmark_group("Batched Submission");
    for batch in [1u32, 10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &batch| {
            b.iter(|| {
                black_box(run_batched(&ctx, &plan, batch).expect("submit failed"));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_batch_sizes);
criterion_main!(benches);
