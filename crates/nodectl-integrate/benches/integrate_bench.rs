// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Integrator Benchmarks
// ─────────────────────────────────────────────────────────────────────
//! Criterion benchmarks for one control-interval integration step per
//! scheme, on a small nonlinear oscillator.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nodectl_integrate::{integrate, IntegrationMethod, Integrator};
use nodectl_types::ControlResult;

const N: usize = 16;

fn oscillator(t: f64, x: &[f64]) -> ControlResult<Vec<f64>> {
    Ok(x.iter()
        .enumerate()
        .map(|(i, &xi)| -(xi.sin()) + 0.1 * (t + i as f64).cos())
        .collect())
}

fn bench_methods(c: &mut Criterion) {
    let x0 = vec![0.3; N];
    for method in IntegrationMethod::ALL {
        c.bench_function(&format!("integrate_{method}_n{N}"), |b| {
            b.iter(|| integrate(oscillator, black_box(&x0), 0.0, black_box(0.1), method))
        });
    }
}

fn bench_substeps(c: &mut Criterion) {
    let x0 = vec![0.3; N];
    let integrator = Integrator::new(IntegrationMethod::Rk4, 10).unwrap();
    c.bench_function("integrator_rk4_10_substeps", |b| {
        b.iter(|| integrator.step(oscillator, black_box(&x0), 0.0, black_box(0.1)))
    });
}

criterion_group!(benches, bench_methods, bench_substeps);
criterion_main!(benches);
