use criterion::{Criterion, criterion_group, criterion_main};
use ndarray::Array1;
use ns_core::Point;
use ns_dist::continuous::{Beta, Bounded, Gamma, Normal, StudentT, VonMises};
use ns_dist::{Continuous, Expr, Registry};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::hint::black_box;

fn bench_logp(c: &mut Criterion) {
    let xs = Expr::constant(Array1::from_iter((0..10_000).map(|i| (i as f64) * 0.001 - 5.0)).into_dyn());
    let unit = Expr::constant(
        Array1::from_iter((0..10_000).map(|i| ((i as f64) + 0.5) / 10_000.0)).into_dyn(),
    );
    let point = Point::new();

    let normal = Normal::new(0.0, 1.3).unwrap();
    c.bench_function("normal_logp_10k", |b| {
        b.iter(|| black_box(normal.logp(&xs).unwrap().eval(&point).unwrap()))
    });

    let student_t = StudentT::new(7.0, 0.0, 1.3).unwrap();
    c.bench_function("student_t_logp_10k", |b| {
        b.iter(|| black_box(student_t.logp(&xs).unwrap().eval(&point).unwrap()))
    });

    let beta = Beta::new(2.2, 3.3).unwrap();
    c.bench_function("beta_logp_10k", |b| {
        b.iter(|| black_box(beta.logp(&unit).unwrap().eval(&point).unwrap()))
    });
}

fn bench_sampling(c: &mut Criterion) {
    let registry = Registry::new();
    let point = Point::new();

    let normal = Normal::new(0.0, 1.3).unwrap();
    c.bench_function("normal_sample_10k", |b| {
        let mut rng = StdRng::seed_from_u64(0);
        b.iter(|| black_box(normal.sample(&registry, &point, &[10_000], &mut rng).unwrap()))
    });

    let gamma = Gamma::new(2.5, 1.5).unwrap();
    c.bench_function("gamma_sample_10k", |b| {
        let mut rng = StdRng::seed_from_u64(1);
        b.iter(|| black_box(gamma.sample(&registry, &point, &[10_000], &mut rng).unwrap()))
    });

    let von_mises = VonMises::new(0.5, 4.0).unwrap();
    c.bench_function("von_mises_sample_10k", |b| {
        let mut rng = StdRng::seed_from_u64(2);
        b.iter(|| black_box(von_mises.sample(&registry, &point, &[10_000], &mut rng).unwrap()))
    });

    let truncated =
        Bounded::new(Box::new(Normal::new(0.0, 1.0).unwrap()), Some(Expr::scalar(1.0)), None).unwrap();
    c.bench_function("bounded_normal_sample_10k", |b| {
        let mut rng = StdRng::seed_from_u64(3);
        b.iter(|| black_box(truncated.sample(&registry, &point, &[10_000], &mut rng).unwrap()))
    });
}

criterion_group!(benches, bench_logp, bench_sampling);
criterion_main!(benches);
