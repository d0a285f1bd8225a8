//! Criterion benchmarks for the full model density.
//!
//! A sampler calls `log_density` once per leapfrog step, so this is the hot
//! path. Data sets are synthetic and seeded.

use cl_config::Settings;
use cl_core::{CategoryLearningModel, LogDensity, ModelData, RawModelData};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const K: usize = 2;

fn synthetic_data(m: usize, l: usize, n_test: usize, rng: &mut StdRng) -> ModelData {
    let mut counts = Vec::with_capacity(m);
    let mut x_mean = Vec::with_capacity(m);
    let mut x_ss = Vec::with_capacity(m);
    for c in 0..m {
        let centre = c as f64 * 2.0;
        let mut n_row = Vec::with_capacity(l);
        let mut mean_row = Vec::with_capacity(l);
        let mut ss_row = Vec::with_capacity(l);
        for _ in 0..l {
            let n = rng.random_range(5..40usize);
            let mut mean = vec![0.0; K];
            let mut ss = vec![vec![0.0; K]; K];
            for _ in 0..n {
                let x: Vec<f64> = (0..K).map(|_| centre + rng.random_range(-1.0..1.0)).collect();
                for i in 0..K {
                    mean[i] += x[i] / n as f64;
                    for j in 0..K {
                        ss[i][j] += x[i] * x[j];
                    }
                }
            }
            n_row.push(n as i64);
            mean_row.push(mean);
            ss_row.push(ss);
        }
        counts.push(n_row);
        x_mean.push(mean_row);
        x_ss.push(ss_row);
    }
    let x_test = (0..n_test)
        .map(|_| (0..K).map(|_| rng.random_range(-1.0..(2.0 * m as f64))).collect())
        .collect();
    let y_test = (0..n_test).map(|j| (j % l) as i64 + 1).collect();
    let z_test_counts = (0..n_test)
        .map(|_| (0..m).map(|_| rng.random_range(0..5i64)).collect())
        .collect();
    let raw = RawModelData {
        num_categories: m,
        num_subjects: l,
        dim: K,
        counts,
        x_mean,
        x_ss,
        num_test: n_test,
        x_test,
        y_test,
        z_test_counts,
        tau_scale: 0.0,
        l_omega_scale: 0.0,
    };
    ModelData::from_raw(&raw, &Settings::default()).expect("synthetic data validates")
}

fn bench_log_density(c: &mut Criterion) {
    let mut group = c.benchmark_group("log_density");

    for (m, l, n_test) in [(2usize, 4usize, 32usize), (4, 8, 128), (8, 16, 512)] {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let model = CategoryLearningModel::new(synthetic_data(m, l, n_test, &mut rng));
        let mut theta = vec![0.0; model.dim()];
        model.init_position(&mut rng, &mut theta);
        let (params, _) = model.layout().constrain(&theta).expect("finite theta");
        let label = format!("M{}_L{}_T{}", m, l, n_test);

        group.bench_with_input(BenchmarkId::new("unconstrained", &label), &theta, |b, theta| {
            b.iter(|| black_box(model.log_density(black_box(theta))));
        });

        group.bench_with_input(BenchmarkId::new("evaluate", &label), &params, |b, params| {
            b.iter(|| black_box(model.evaluate(black_box(params))));
        });

        group.bench_with_input(BenchmarkId::new("beliefs", &label), &params, |b, params| {
            b.iter(|| black_box(model.beliefs(black_box(params))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_log_density);
criterion_main!(benches);
