//! # Optimizer
//!
//! $$
//! \min_{\mathbf{w}} \ -\frac{\mathbf{w}^\top\mu - r_f}{\lambda\sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}}
//! \quad \text{s.t.} \quad \textstyle\sum_i w_i = 1,\ 0 \le w_i \le w_{\max}
//! $$
//!
//! Sharpe-maximizing mean-variance solver with risk-profile box constraints,
//! plus the efficient-frontier sweep. Weights are reparameterized through a
//! softmax so the simplex constraint holds at every iterate; the per-asset
//! cap enters as a quadratic penalty and is enforced exactly by a final
//! projection.

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::core::TerminationReason;
use argmin::core::TerminationStatus;
use argmin::solver::neldermead::NelderMead;
use rand::Rng;

use crate::error::EngineError;
use crate::types::RiskTolerance;

const MAX_ITERS: u64 = 5000;
const SD_TOLERANCE: f64 = 1e-8;
const BOX_PENALTY: f64 = 1e4;
const TARGET_RETURN_PENALTY: f64 = 10.0;

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
  a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub(crate) fn mat_vec_mul(mat: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
  mat
    .iter()
    .map(|row| row.iter().zip(v.iter()).map(|(a, b)| a * b).sum())
    .collect()
}

fn softmax(x: &[f64]) -> Vec<f64> {
  if x.is_empty() {
    return Vec::new();
  }

  let max_x = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
  let exps: Vec<f64> = x.iter().map(|&v| (v - max_x).exp()).collect();
  let sum: f64 = exps.iter().sum();

  if sum < 1e-15 {
    vec![1.0 / x.len() as f64; x.len()]
  } else {
    exps.iter().map(|&e| e / sum).collect()
  }
}

/// Lower weight bound applied after the solve.
///
/// Keeps every candidate asset at a reportable allocation, which also makes
/// the minimum-diversification count deterministic.
pub fn weight_floor(n: usize) -> f64 {
  if n == 0 {
    return 0.0;
  }
  (0.5 / n as f64).max(0.02).min(1.0 / n as f64)
}

/// Project weights onto `{w : lower <= w_i <= upper, sum w = 1}`.
///
/// Assumes `lower * n <= 1 <= upper * n`; converges in at most `n` passes.
pub fn project_to_bounds(w: &mut [f64], lower: f64, upper: f64) {
  let n = w.len();
  if n == 0 {
    return;
  }

  for _ in 0..n {
    for wi in w.iter_mut() {
      *wi = wi.clamp(lower, upper);
    }

    let sum: f64 = w.iter().sum();
    let residual = 1.0 - sum;
    if residual.abs() < 1e-12 {
      return;
    }

    let free: Vec<usize> = (0..n)
      .filter(|&i| {
        if residual > 0.0 {
          w[i] < upper - 1e-12
        } else {
          w[i] > lower + 1e-12
        }
      })
      .collect();

    if free.is_empty() {
      return;
    }

    let share = residual / free.len() as f64;
    for i in free {
      w[i] += share;
    }
  }

  for wi in w.iter_mut() {
    *wi = wi.clamp(lower, upper);
  }
}

/// Solver output: final weights plus whether the solver converged or the
/// best feasible iterate was used as a fallback.
#[derive(Clone, Debug)]
pub struct SolverOutcome {
  /// Weights in input asset order, summing to 1 within tolerance.
  pub weights: Vec<f64>,
  /// False when both solve attempts stopped without converging.
  pub converged: bool,
}

#[derive(Clone)]
struct SharpeCost {
  mu: Vec<f64>,
  cov: Vec<Vec<f64>>,
  risk_free: f64,
  max_weight: f64,
  volatility_penalty: f64,
}

impl CostFunction for SharpeCost {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
    let w = softmax(x);
    let sigma_w = mat_vec_mul(&self.cov, &w);
    let port_var = dot(&w, &sigma_w).max(0.0);
    let port_vol = port_var.sqrt();

    if port_vol < 1e-12 {
      return Ok(1e10);
    }

    let port_ret = dot(&w, &self.mu);
    let sharpe = (port_ret - self.risk_free) / (port_vol * self.volatility_penalty);

    let overshoot: f64 = w
      .iter()
      .map(|&wi| (wi - self.max_weight).max(0.0).powi(2))
      .sum();

    Ok(-sharpe + BOX_PENALTY * overshoot)
  }
}

struct Attempt {
  best_x: Vec<f64>,
  best_cost: f64,
  converged: bool,
}

fn run_nelder_mead(cost: SharpeCost, simplex: Vec<Vec<f64>>, x0: Vec<f64>) -> Attempt {
  match NelderMead::new(simplex).with_sd_tolerance(SD_TOLERANCE) {
    Ok(solver) => {
      match Executor::new(cost, solver)
        .configure(|state| state.max_iters(MAX_ITERS))
        .run()
      {
        Ok(res) => {
          let converged = matches!(
            res.state.termination_status,
            TerminationStatus::Terminated(
              TerminationReason::SolverConverged | TerminationReason::TargetCostReached
            )
          );

          Attempt {
            best_cost: res.state.best_cost,
            best_x: res.state.best_param.unwrap_or(x0),
            converged,
          }
        }
        Err(_) => Attempt {
          best_x: x0,
          best_cost: f64::INFINITY,
          converged: false,
        },
      }
    }
    Err(_) => Attempt {
      best_x: x0,
      best_cost: f64::INFINITY,
      converged: false,
    },
  }
}

fn equal_weight_simplex(n: usize) -> Vec<Vec<f64>> {
  let x0 = vec![0.0; n];
  let mut simplex = Vec::with_capacity(n + 1);
  simplex.push(x0.clone());
  for i in 0..n {
    let mut point = x0.clone();
    point[i] = 1.0;
    simplex.push(point);
  }
  simplex
}

fn randomized_simplex(n: usize) -> Vec<Vec<f64>> {
  let mut rng = rand::thread_rng();
  (0..=n)
    .map(|_| (0..n).map(|_| rng.gen_range(-0.5..0.5)).collect())
    .collect()
}

/// Solve for the Sharpe-maximizing weights under a risk tolerance.
///
/// Seeded from equal weights; a non-converged first attempt is retried once
/// from a randomized simplex, and the better iterate of the two is kept.
/// The caller surfaces `converged = false` as `optimization_success = false`
/// instead of an error.
pub fn maximize_sharpe(
  mu: &[f64],
  cov: &[Vec<f64>],
  tolerance: RiskTolerance,
  risk_free: f64,
) -> Result<SolverOutcome, EngineError> {
  let n = mu.len();
  let profile = tolerance.profile();

  if n < profile.min_assets {
    return Err(EngineError::InsufficientAssets {
      available: n,
      required: profile.min_assets,
      tolerance,
    });
  }

  let cost = SharpeCost {
    mu: mu.to_vec(),
    cov: cov.to_vec(),
    risk_free,
    max_weight: profile.max_weight,
    volatility_penalty: profile.volatility_penalty,
  };

  let x0 = vec![0.0; n];
  let mut attempt = run_nelder_mead(cost.clone(), equal_weight_simplex(n), x0.clone());

  if !attempt.converged {
    tracing::debug!(tolerance = %tolerance, "solver restart from randomized simplex");
    let retry = run_nelder_mead(cost, randomized_simplex(n), x0);
    if retry.converged || retry.best_cost < attempt.best_cost {
      attempt = retry;
    }
  }

  let mut weights = softmax(&attempt.best_x);
  project_to_bounds(&mut weights, weight_floor(n), profile.max_weight);

  Ok(SolverOutcome {
    weights,
    converged: attempt.converged,
  })
}

/// One point on the efficient frontier.
#[derive(Clone, Debug)]
pub struct FrontierPoint {
  /// Target (and achieved) annualized return.
  pub expected_return: f64,
  /// Annualized volatility of the minimum-variance weights.
  pub volatility: f64,
  /// Sharpe ratio at this point.
  pub sharpe: f64,
  /// Weights in input asset order.
  pub weights: Vec<f64>,
}

#[derive(Clone)]
struct TargetReturnCost {
  mu: Vec<f64>,
  cov: Vec<Vec<f64>>,
  target_return: f64,
}

impl CostFunction for TargetReturnCost {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
    let w = softmax(x);
    let sigma_w = mat_vec_mul(&self.cov, &w);
    let port_var = dot(&w, &sigma_w);
    let port_ret = dot(&w, &self.mu);
    let ret_penalty = (port_ret - self.target_return).powi(2);

    Ok(port_var + TARGET_RETURN_PENALTY * ret_penalty)
  }
}

/// Sweep minimum-variance portfolios across target returns between the
/// smallest and largest expected asset return.
pub fn efficient_frontier(
  mu: &[f64],
  cov: &[Vec<f64>],
  points: usize,
  risk_free: f64,
) -> Vec<FrontierPoint> {
  let n = mu.len();
  if n == 0 || points == 0 {
    return Vec::new();
  }

  let min_ret = mu.iter().cloned().fold(f64::INFINITY, f64::min);
  let max_ret = mu.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
  let step = if points > 1 {
    (max_ret - min_ret) / (points - 1) as f64
  } else {
    0.0
  };

  let mut frontier = Vec::with_capacity(points);

  for k in 0..points {
    let target = min_ret + step * k as f64;
    let cost = TargetReturnCost {
      mu: mu.to_vec(),
      cov: cov.to_vec(),
      target_return: target,
    };

    let solver = match NelderMead::new(equal_weight_simplex(n)).with_sd_tolerance(SD_TOLERANCE) {
      Ok(solver) => solver,
      Err(_) => continue,
    };

    let res = match Executor::new(cost, solver)
      .configure(|state| state.max_iters(MAX_ITERS))
      .run()
    {
      Ok(res) => res,
      Err(_) => continue,
    };

    let best_x = res.state.best_param.unwrap_or_else(|| vec![0.0; n]);
    let weights = softmax(&best_x);
    let expected_return = dot(&weights, mu);
    let sigma_w = mat_vec_mul(cov, &weights);
    let volatility = dot(&weights, &sigma_w).max(0.0).sqrt();
    let sharpe = if volatility > 1e-15 {
      (expected_return - risk_free) / volatility
    } else {
      0.0
    };

    frontier.push(FrontierPoint {
      expected_return,
      volatility,
      sharpe,
      weights,
    });
  }

  frontier
}
