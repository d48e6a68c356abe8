/// Benchmark for the preconditioned iteration on a 1-D grid

use criterion::{criterion_group, criterion_main, Criterion};

use num_complex::Complex64;
use wavesim::{preconditioned_iteration, DomainParameters, MultiDomain, Source};

fn iterate(domain: &mut MultiDomain) {
    for _ in 0..50 {
        preconditioned_iteration(domain, 0.75, true);
    }
}

fn my_benchmark(c: &mut Criterion) {
    let shape = [1024, 1, 1];
    let n: Vec<Complex64> = (0..1024)
        .map(|i| Complex64::new(1.0 + 0.3 * ((i as f64) / 100.0).sin(), 1e-3))
        .collect();
    let params = DomainParameters {
        periodic: [false, true, true],
        n_domains: [2, 1, 1],
        n_boundary: 8,
        wavelength: Some(1.0),
        num_threads: 2,
        ..DomainParameters::default()
    };
    let mut domain = MultiDomain::helmholtz(&n, shape, &params).unwrap();
    let source = Source::point(shape, [512, 0, 0], 0, Complex64::new(1.0, 0.0)).unwrap();
    domain.set_source(&source).unwrap();
    domain.clear(0);
    c.bench_function("iterate_helmholtz_1d", |b| b.iter(|| iterate(&mut domain)));
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = my_benchmark
}
criterion_main!(benches);
