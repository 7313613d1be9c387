//! Benchmark for encoding, decoding and converting dta files
//!
//! Run with: cargo bench --bench dta_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use polars::prelude::*;
use rand::prelude::*;
use rand::SeedableRng;
use tempfile::TempDir;

use rbstata::pipeline::convert_dta;
use rbstata::pipeline::dta::{read_dta, write_dta, writer::encode_dta, DtaDataset, Release, WriteOptions};

/// Generate a dataset mixing numeric, missing and text columns
fn generate_test_dataset(n_rows: usize, seed: u64) -> DtaDataset {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    let ids: Vec<i32> = (0..n_rows as i32).collect();
    let scores: Vec<Option<f64>> = (0..n_rows)
        .map(|_| {
            if rng.gen::<f64>() < 0.1 {
                None
            } else {
                Some(rng.gen::<f64>() * 100.0)
            }
        })
        .collect();
    let groups: Vec<i8> = (0..n_rows).map(|_| rng.gen_range(0..5)).collect();
    let names: Vec<String> = (0..n_rows)
        .map(|_| {
            let len = rng.gen_range(3..20);
            (0..len)
                .map(|_| rng.gen_range(b'a'..=b'z') as char)
                .collect()
        })
        .collect();

    let frame = DataFrame::new(vec![
        Column::new("id".into(), ids),
        Column::new("score".into(), scores),
        Column::new("group".into(), groups),
        Column::new("name".into(), names),
    ])
    .expect("Failed to create DataFrame");

    DtaDataset::from_frame(frame)
}

fn benchmark_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for n_rows in [1_000, 10_000, 100_000] {
        let dataset = generate_test_dataset(n_rows, 42);
        group.throughput(Throughput::Elements(n_rows as u64));

        for release in [Release::V114, Release::V117, Release::V118] {
            let options = WriteOptions {
                release: Some(release),
                ..Default::default()
            };
            group.bench_with_input(
                BenchmarkId::new(format!("release_{}", release), n_rows),
                &dataset,
                |b, dataset| b.iter(|| encode_dta(black_box(dataset), &options).unwrap()),
            );
        }
    }

    group.finish();
}

fn benchmark_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");
    let temp_dir = TempDir::new().unwrap();

    for n_rows in [1_000, 10_000, 100_000] {
        let path = temp_dir.path().join(format!("bench_{}.dta", n_rows));
        write_dta(&path, &generate_test_dataset(n_rows, 7), &WriteOptions::default()).unwrap();
        group.throughput(Throughput::Elements(n_rows as u64));

        group.bench_with_input(BenchmarkId::from_parameter(n_rows), &path, |b, path| {
            b.iter(|| read_dta(black_box(path)).unwrap())
        });
    }

    group.finish();
}

fn benchmark_convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert");
    group.sample_size(20);
    let temp_dir = TempDir::new().unwrap();

    let n_rows = 50_000;
    let input = temp_dir.path().join("input.dta");
    write_dta(&input, &generate_test_dataset(n_rows, 11), &WriteOptions::default()).unwrap();

    for version in [12, 13, 14] {
        let output = temp_dir.path().join(format!("output-v{}.dta", version));
        group.bench_with_input(BenchmarkId::from_parameter(version), &version, |b, &version| {
            b.iter(|| convert_dta(&input, &output, version).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_encode, benchmark_read, benchmark_convert);
criterion_main!(benches);
