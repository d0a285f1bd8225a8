//! Criterion benchmarks for `cl-math`.
//!
//! Focus on the kernels evaluated once per category per test trial.

use cl_math::multinomial::log_pmf;
use cl_math::transform::corr_cholesky_constrain;
use cl_math::{cholesky_lower, multi_student_t_cholesky_lpdf, normalize_log_probs};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::{DMatrix, DVector};

fn bench_student_t(c: &mut Criterion) {
    let mut group = c.benchmark_group("multi_student_t");

    for k in [1usize, 2, 4, 8] {
        let y = vec![0.2; k * (k - 1) / 2];
        let (l_corr, _) = corr_cholesky_constrain(&y, k).expect("valid length");
        let scale = &l_corr * l_corr.transpose() * 1.5;
        let l = cholesky_lower(&scale).expect("SPD scale");
        let x = DVector::from_element(k, 0.4);
        let mu = DVector::zeros(k);

        group.bench_with_input(BenchmarkId::new("lpdf", k), &k, |b, _| {
            b.iter(|| {
                black_box(multi_student_t_cholesky_lpdf(
                    black_box(&x),
                    black_box(7.0),
                    black_box(&mu),
                    black_box(&l),
                ))
            });
        });

        group.bench_with_input(BenchmarkId::new("cholesky", k), &k, |b, _| {
            b.iter(|| black_box(cholesky_lower(black_box(&scale))));
        });
    }

    group.finish();
}

fn bench_likelihood(c: &mut Criterion) {
    let mut group = c.benchmark_group("likelihood");

    for m in [2usize, 4, 16] {
        let log_weights: Vec<f64> = (0..m).map(|i| -(i as f64) * 0.7).collect();
        let counts: Vec<u64> = (0..m as u64).map(|i| i % 3).collect();

        group.bench_with_input(BenchmarkId::new("normalize", m), &m, |b, _| {
            b.iter(|| black_box(normalize_log_probs(black_box(&log_weights))));
        });

        let probs = normalize_log_probs(&log_weights).expect("finite weights");
        group.bench_with_input(BenchmarkId::new("multinomial", m), &m, |b, _| {
            b.iter(|| black_box(log_pmf(black_box(&counts), black_box(&probs))));
        });
    }

    group.finish();
}

fn bench_identity_cholesky(c: &mut Criterion) {
    let eye = DMatrix::<f64>::identity(6, 6);
    c.bench_function("cholesky_identity_6", |b| {
        b.iter(|| black_box(cholesky_lower(black_box(&eye))));
    });
}

criterion_group!(benches, bench_student_t, bench_likelihood, bench_identity_cholesky);
criterion_main!(benches);
