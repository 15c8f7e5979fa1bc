use std::hint::black_box;
use std::time::Duration;

use criterion::criterion_group;
use criterion::criterion_main;
use criterion::BenchmarkId;
use criterion::Criterion;
use markowitz_rs::optimizer;
use markowitz_rs::types::RiskTolerance;

/// Synthetic diagonal-dominant problem of dimension `n`.
fn problem(n: usize) -> (Vec<f64>, Vec<Vec<f64>>) {
  let mu: Vec<f64> = (0..n).map(|i| 0.05 + 0.01 * (i % 7) as f64).collect();
  let mut cov = vec![vec![0.0; n]; n];
  for i in 0..n {
    for j in 0..n {
      cov[i][j] = if i == j {
        0.03 + 0.005 * (i % 5) as f64
      } else {
        0.002
      };
    }
  }
  (mu, cov)
}

fn bench_optimizer(c: &mut Criterion) {
  let mut group = c.benchmark_group("Optimizer");
  group.measurement_time(Duration::from_secs(5));
  group.warm_up_time(Duration::from_millis(500));
  group.sample_size(20);

  for &n in &[4usize, 8, 16] {
    let (mu, cov) = problem(n);

    group.bench_with_input(BenchmarkId::new("maximize_sharpe", n), &n, |b, _| {
      b.iter(|| {
        let outcome =
          optimizer::maximize_sharpe(&mu, &cov, RiskTolerance::Moderate, 0.035).unwrap();
        black_box(outcome.weights[0])
      });
    });

    group.bench_with_input(BenchmarkId::new("efficient_frontier", n), &n, |b, _| {
      b.iter(|| {
        let frontier = optimizer::efficient_frontier(&mu, &cov, 10, 0.035);
        black_box(frontier.len())
      });
    });
  }

  group.finish();
}

criterion_group!(benches, bench_optimizer);
criterion_main!(benches);
