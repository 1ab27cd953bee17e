//! Benchmarks for the kernel matrix and batch driver.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use simdist::batch::{cdist, Rows};
use simdist::{dispatch_info, resolve, Capability, Datatype, MetricKind, CAP_ANY};

const SERIAL: u32 = Capability::Serial.bit();

fn bench_pair(c: &mut Criterion, name: &str, metric: MetricKind, datatype: Datatype) {
    let mut group = c.benchmark_group(name);

    for dim in [128usize, 768, 1536] {
        let a: Vec<f32> = (0..dim).map(|i| (i as f32 * 0.37).sin()).collect();
        let b: Vec<f32> = (0..dim).map(|i| (i as f32 * 0.73).cos()).collect();
        group.throughput(Throughput::Bytes((dim * 2 * 4) as u64));

        for (label, allowed) in [("dispatched", CAP_ANY), ("serial", SERIAL)] {
            let Some(kernel) = resolve(metric, datatype, allowed) else {
                continue;
            };
            group.bench_with_input(BenchmarkId::new(label, dim), &dim, |bench, &n| {
                let mut out = 0.0f64;
                bench.iter(|| unsafe {
                    kernel.call(
                        black_box(a.as_ptr().cast()),
                        black_box(b.as_ptr().cast()),
                        n,
                        &mut out,
                    );
                    black_box(out)
                })
            });
        }
    }
    group.finish();
}

fn bench_f32_kernels(c: &mut Criterion) {
    bench_pair(c, "dot_f32", MetricKind::Dot, Datatype::F32);
    bench_pair(c, "cos_f32", MetricKind::Cos, Datatype::F32);
    bench_pair(c, "l2sq_f32", MetricKind::L2sq, Datatype::F32);
    bench_pair(c, "kl_f32", MetricKind::Kl, Datatype::F32);
}

fn bench_i8_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("cos_i8");
    for dim in [128usize, 768, 1536] {
        let a: Vec<i8> = (0..dim).map(|i| ((i * 13 + 5) % 255) as u8 as i8).collect();
        let b: Vec<i8> = (0..dim).map(|i| ((i * 29 + 3) % 255) as u8 as i8).collect();
        group.throughput(Throughput::Bytes((dim * 2) as u64));

        for (label, allowed) in [("dispatched", CAP_ANY), ("serial", SERIAL)] {
            let Some(kernel) = resolve(MetricKind::Cos, Datatype::I8, allowed) else {
                continue;
            };
            group.bench_with_input(BenchmarkId::new(label, dim), &dim, |bench, &n| {
                let mut out = 0.0f64;
                bench.iter(|| unsafe {
                    kernel.call(
                        black_box(a.as_ptr().cast()),
                        black_box(b.as_ptr().cast()),
                        n,
                        &mut out,
                    );
                    black_box(out)
                })
            });
        }
    }
    group.finish();
}

fn bench_binary_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("hamming_b8");
    for bytes in [128usize, 1024, 8192] {
        let a: Vec<u8> = (0..bytes).map(|i| (i * 31 + 7) as u8).collect();
        let b: Vec<u8> = (0..bytes).map(|i| (i * 17 + 3) as u8).collect();
        group.throughput(Throughput::Bytes((bytes * 2) as u64));

        for (label, allowed) in [("dispatched", CAP_ANY), ("serial", SERIAL)] {
            let Some(kernel) = resolve(MetricKind::Hamming, Datatype::B8, allowed) else {
                continue;
            };
            group.bench_with_input(BenchmarkId::new(label, bytes), &bytes, |bench, &n| {
                let mut out = 0.0f64;
                bench.iter(|| unsafe {
                    kernel.call(
                        black_box(a.as_ptr().cast()),
                        black_box(b.as_ptr().cast()),
                        n,
                        &mut out,
                    );
                    black_box(out)
                })
            });
        }
    }
    group.finish();
}

fn bench_cdist(c: &mut Criterion) {
    let mut group = c.benchmark_group("cdist_cos_f32");
    let dim = 256;
    let kernel = resolve(MetricKind::Cos, Datatype::F32, CAP_ANY).expect("cos f32 resolves");

    for rows in [32usize, 128] {
        let a: Vec<f32> = (0..rows * dim).map(|i| (i as f32 * 0.13).sin()).collect();
        let b: Vec<f32> = (0..rows * dim).map(|i| (i as f32 * 0.29).cos()).collect();
        let rows_a = Rows::new(&a, rows, dim).expect("matrix fits");
        let rows_b = Rows::new(&b, rows, dim).expect("matrix fits");
        group.throughput(Throughput::Elements((rows * rows) as u64));

        for threads in [1usize, 0] {
            group.bench_with_input(
                BenchmarkId::new(format!("threads_{threads}"), rows),
                &rows,
                |bench, _| {
                    let mut out = vec![0.0f64; rows * rows];
                    bench.iter(|| {
                        cdist(&kernel, &rows_a, &rows_b, black_box(&mut out), threads)
                            .expect("validated shapes")
                    })
                },
            );
        }
    }
    group.finish();
}

fn print_cpu_info(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_info");
    println!("\n{}", dispatch_info());
    group.bench_function("probe", |b| b.iter(simdist::capabilities));
    group.finish();
}

criterion_group!(
    benches,
    print_cpu_info,
    bench_f32_kernels,
    bench_i8_kernels,
    bench_binary_kernels,
    bench_cdist,
);

criterion_main!(benches);
