//! # Backtest
//!
//! $$
//! V_t = V_0 \left( c + \sum_i w_i \frac{P_{i,t}}{P_{i,0}} \right)
//! $$
//!
//! Buy-and-hold simulation of a fixed weight vector over an aligned price
//! history. Each asset's allocation is set once at the first grid date and
//! never rebalanced; any unallocated fraction stays in cash. The report
//! carries the realized value path plus summary performance statistics.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::EngineError;
use crate::stats::simple_returns_series;
use crate::stats::AlignedPrices;

/// Realized performance of a buy-and-hold portfolio.
#[derive(Clone, Debug, Serialize)]
pub struct BacktestReport {
  /// Date grid of the value path.
  pub dates: Vec<NaiveDate>,
  /// Portfolio value at each grid date, starting at the initial investment.
  pub values: Vec<f64>,
  /// Periodic simple returns of the value path.
  pub daily_returns: Vec<f64>,
  /// Total return over the window, `V_T / V_0 - 1`.
  pub total_return: f64,
  /// Geometric annualized return of the value path.
  pub annualized_return: f64,
  /// Annualized volatility of the periodic returns.
  pub annualized_volatility: f64,
  /// Annualized Sharpe ratio of the realized path.
  pub sharpe_ratio: f64,
  /// Maximum peak-to-trough drawdown as a non-negative magnitude.
  pub max_drawdown: f64,
  /// Fraction of periods with a strictly positive return.
  pub win_rate: f64,
  /// Best single-period return.
  pub best_day: f64,
  /// Worst single-period return.
  pub worst_day: f64,
}

/// Simulate holding `weights` over the aligned history without rebalancing.
///
/// Weights are matched to the price grid by symbol; weights for symbols
/// absent from the grid are ignored, and their fraction stays in cash. The
/// call fails when no weight matches any priced asset or the grid is too
/// short to form a return.
pub fn run_backtest(
  prices: &AlignedPrices,
  weights: &[(String, f64)],
  initial_investment: f64,
  risk_free: f64,
) -> Result<BacktestReport, EngineError> {
  if prices.dates.len() < 2 {
    return Err(EngineError::InvalidInput(
      "backtest needs at least two price observations".to_string(),
    ));
  }
  if !(initial_investment.is_finite() && initial_investment > 0.0) {
    return Err(EngineError::InvalidInput(
      "initial investment must be a positive finite amount".to_string(),
    ));
  }

  // Per-asset invested fraction, in grid order.
  let mut fractions = vec![0.0; prices.symbols.len()];
  for (symbol, weight) in weights {
    if let Some(idx) = prices.symbols.iter().position(|s| s == symbol) {
      fractions[idx] += weight.max(0.0);
    }
  }

  let invested: f64 = fractions.iter().sum();
  if invested <= 0.0 {
    return Err(EngineError::InvalidInput(
      "no portfolio weight matches a priced asset".to_string(),
    ));
  }
  let cash = (1.0 - invested).max(0.0);

  let mut values = Vec::with_capacity(prices.dates.len());
  for t in 0..prices.dates.len() {
    let mut growth = cash;
    for (i, row) in prices.prices.iter().enumerate() {
      if fractions[i] > 0.0 && row[0] > 0.0 {
        growth += fractions[i] * row[t] / row[0];
      }
    }
    values.push(initial_investment * growth);
  }

  let daily_returns = simple_returns_series(&values);
  let n = daily_returns.len() as f64;
  let ppy = prices.periods_per_year;

  let total_return = values[values.len() - 1] / values[0] - 1.0;
  let annualized_return = (1.0 + total_return).powf(ppy / n) - 1.0;

  let mean = daily_returns.iter().sum::<f64>() / n;
  let variance = if daily_returns.len() > 1 {
    daily_returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0)
  } else {
    0.0
  };
  let annualized_volatility = variance.sqrt() * ppy.sqrt();

  let sharpe_ratio = if annualized_volatility > 1e-12 {
    (annualized_return - risk_free) / annualized_volatility
  } else {
    0.0
  };

  let wins = daily_returns.iter().filter(|&&r| r > 0.0).count();

  Ok(BacktestReport {
    dates: prices.dates.clone(),
    max_drawdown: crate::risk::max_drawdown(&daily_returns),
    win_rate: wins as f64 / n,
    best_day: daily_returns.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
    worst_day: daily_returns.iter().cloned().fold(f64::INFINITY, f64::min),
    values,
    daily_returns,
    total_return,
    annualized_return,
    annualized_volatility,
    sharpe_ratio,
  })
}
