//! # Risk
//!
//! $$
//! \sigma_p = \sqrt{\mathbf{w}^\top\Sigma\,\mathbf{w}}, \qquad
//! \mathrm{VaR}_{95} = z_{0.95}\,\sigma - \mu
//! $$
//!
//! Portfolio-level risk metrics for a fixed weight vector: annualized return
//! and volatility, Sharpe ratio, parametric one-period value-at-risk,
//! maximum drawdown of the realized weighted path, the weighted dividend
//! yield and the asset correlation matrix.

use serde::Serialize;
use statrs::distribution::ContinuousCDF;
use statrs::distribution::Normal;

use crate::optimizer::dot;
use crate::optimizer::mat_vec_mul;
use crate::stats::correlation_matrix;
use crate::stats::ReturnStatistics;

/// Normal quantile used when the distribution cannot be constructed.
const Z_95_FALLBACK: f64 = 1.6449;

/// Portfolio risk metrics for one weight vector.
#[derive(Clone, Debug, Serialize)]
pub struct RiskSummary {
  /// Annualized expected portfolio return under the chosen return model.
  pub expected_return: f64,
  /// Annualized portfolio volatility.
  pub volatility: f64,
  /// Annualized Sharpe ratio; zero for a degenerate volatility.
  pub sharpe_ratio: f64,
  /// One-period parametric 95% value-at-risk as a positive loss fraction.
  pub var_95: f64,
  /// Maximum peak-to-trough drawdown of the realized weighted path, as a
  /// non-negative magnitude.
  pub max_drawdown: f64,
  /// Weighted trailing dividend yield.
  pub dividend_yield: f64,
  /// Pearson correlation matrix in the portfolio's asset order.
  pub correlation: Vec<Vec<f64>>,
}

/// One-period 95% value-at-risk under a normal return assumption.
pub fn parametric_var_95(periodic_mean: f64, periodic_vol: f64) -> f64 {
  let z = Normal::new(0.0, 1.0)
    .map(|n| n.inverse_cdf(0.95))
    .unwrap_or(Z_95_FALLBACK);
  (z * periodic_vol - periodic_mean).max(0.0)
}

/// Maximum drawdown of a periodic return series, as a magnitude in [0, 1].
pub fn max_drawdown(returns: &[f64]) -> f64 {
  let mut value = 1.0;
  let mut peak = 1.0;
  let mut worst = 0.0f64;

  for &r in returns {
    value *= 1.0 + r;
    if value > peak {
      peak = value;
    }
    let dd = 1.0 - value / peak;
    if dd > worst {
      worst = dd;
    }
  }

  worst
}

/// Realized periodic returns of a fixed-weight portfolio.
pub fn portfolio_returns(weights: &[f64], asset_returns: &[Vec<f64>]) -> Vec<f64> {
  let periods = asset_returns.first().map(|r| r.len()).unwrap_or(0);
  (0..periods)
    .map(|t| {
      weights
        .iter()
        .zip(asset_returns.iter())
        .map(|(w, r)| w * r[t])
        .sum()
    })
    .collect()
}

/// Compute the full risk summary for a weight vector.
///
/// `mu` is the annualized expected-return vector of the chosen return model
/// and may differ from the historical means inside `stats`; the covariance,
/// drawdown path and correlations always come from realized history.
pub fn summarize(
  weights: &[f64],
  stats: &ReturnStatistics,
  mu: &[f64],
  dividend_yields: &[f64],
  risk_free: f64,
) -> RiskSummary {
  let expected_return = dot(weights, mu);

  let sigma_w = mat_vec_mul(&stats.covariance, weights);
  let variance = dot(weights, &sigma_w).max(0.0);
  let volatility = variance.sqrt();

  let sharpe_ratio = if volatility > 1e-12 {
    (expected_return - risk_free) / volatility
  } else {
    0.0
  };

  let ppy = stats.periods_per_year.max(1.0);
  let var_95 = parametric_var_95(expected_return / ppy, volatility / ppy.sqrt());

  let realized = portfolio_returns(weights, &stats.returns);

  RiskSummary {
    expected_return,
    volatility,
    sharpe_ratio,
    var_95,
    max_drawdown: max_drawdown(&realized),
    dividend_yield: dot(weights, dividend_yields),
    correlation: correlation_matrix(&stats.returns),
  }
}
