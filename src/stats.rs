//! # Statistics
//!
//! $$
//! \hat\mu = e^{\overline{\ln(1+r)}\cdot a} - 1, \qquad
//! \hat\Sigma = \operatorname{Cov}(r)\cdot a
//! $$
//!
//! Return/risk statistics builder: date alignment, annualization-factor
//! inference, geometric annualized mean returns, annualized covariance and
//! correlation, and ridge shrinkage for ill-conditioned matrices.

use std::collections::BTreeSet;
use std::collections::HashMap;

use chrono::NaiveDate;
use statrs::statistics::Statistics;

use crate::error::EngineError;
use crate::types::PriceSeries;

/// Annualization factor for daily observations.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Diagonal shrinkage intensity relative to the mean variance.
const RIDGE_FRACTION: f64 = 1e-4;

/// Pivot threshold below which a matrix is treated as singular.
const SINGULAR_EPS: f64 = 1e-12;

/// Price histories aligned onto a shared date grid.
#[derive(Clone, Debug)]
pub struct AlignedPrices {
  /// Asset ordering for the price rows.
  pub symbols: Vec<String>,
  /// Shared date grid, ascending.
  pub dates: Vec<NaiveDate>,
  /// Per-asset filled prices on the grid.
  pub prices: Vec<Vec<f64>>,
  /// Annualization factor inferred from the grid spacing.
  pub periods_per_year: f64,
}

impl AlignedPrices {
  /// Convert aligned prices into periodic simple returns.
  pub fn to_returns(&self) -> AlignedReturns {
    let returns = self
      .prices
      .iter()
      .map(|row| simple_returns_series(row))
      .collect();

    AlignedReturns {
      symbols: self.symbols.clone(),
      dates: self.dates.iter().skip(1).copied().collect(),
      returns,
      periods_per_year: self.periods_per_year,
    }
  }
}

/// Periodic simple returns per asset on a shared date grid.
#[derive(Clone, Debug)]
pub struct AlignedReturns {
  /// Asset ordering for the return rows.
  pub symbols: Vec<String>,
  /// Date of each return observation.
  pub dates: Vec<NaiveDate>,
  /// Per-asset periodic simple returns.
  pub returns: Vec<Vec<f64>>,
  /// Annualization factor inferred from the grid spacing.
  pub periods_per_year: f64,
}

/// Expected returns and risk structure estimated from aligned returns.
#[derive(Clone, Debug)]
pub struct ReturnStatistics {
  /// Asset ordering shared by every vector and matrix below.
  pub symbols: Vec<String>,
  /// Annualized geometric mean return per asset.
  pub mean_returns: Vec<f64>,
  /// Annualized covariance matrix, conditioned for inversion.
  pub covariance: Vec<Vec<f64>>,
  /// Periodic simple returns the estimates were built from.
  pub returns: Vec<Vec<f64>>,
  /// Annualization factor used throughout.
  pub periods_per_year: f64,
  /// True when diagonal shrinkage was applied to the covariance.
  pub shrinkage_applied: bool,
}

/// Infer the annualization factor from the median day gap of a date grid.
pub fn infer_periods_per_year(dates: &[NaiveDate]) -> f64 {
  if dates.len() < 2 {
    return TRADING_DAYS_PER_YEAR;
  }

  let mut gaps: Vec<i64> = dates.windows(2).map(|w| (w[1] - w[0]).num_days()).collect();
  gaps.sort_unstable();
  let median = gaps[gaps.len() / 2] as f64;

  if median <= 3.0 {
    TRADING_DAYS_PER_YEAR
  } else if median <= 10.0 {
    52.0
  } else if median <= 45.0 {
    12.0
  } else {
    4.0
  }
}

/// Convert a filled price row to periodic simple returns.
pub fn simple_returns_series(closes: &[f64]) -> Vec<f64> {
  let mut out = Vec::with_capacity(closes.len().saturating_sub(1));
  for i in 1..closes.len() {
    if closes[i - 1] > 0.0 {
      out.push(closes[i] / closes[i - 1] - 1.0);
    } else {
      out.push(0.0);
    }
  }
  out
}

/// Align price series onto the union of their trading dates.
///
/// Missing days are forward-filled (leading gaps back-filled) identically
/// for every asset. An asset with fewer than `min_observations` genuine
/// observations fails the whole call rather than being silently dropped.
pub fn align_price_series(
  series: &[PriceSeries],
  min_observations: usize,
) -> Result<AlignedPrices, EngineError> {
  if series.is_empty() {
    return Err(EngineError::InvalidInput(
      "no price series to align".to_string(),
    ));
  }

  let mut grid: BTreeSet<NaiveDate> = BTreeSet::new();
  for s in series {
    for d in &s.dates {
      grid.insert(*d);
    }
  }
  let dates: Vec<NaiveDate> = grid.into_iter().collect();

  let mut symbols = Vec::with_capacity(series.len());
  let mut prices = Vec::with_capacity(series.len());

  for s in series {
    let by_date: HashMap<NaiveDate, f64> = s
      .dates
      .iter()
      .copied()
      .zip(s.closes.iter().copied())
      .collect();

    let observed = by_date.len();
    if observed < min_observations {
      return Err(EngineError::InsufficientHistory {
        symbol: s.symbol.clone(),
        observed,
        required: min_observations,
      });
    }

    let mut filled = Vec::with_capacity(dates.len());
    let mut last: Option<f64> = None;
    for d in &dates {
      if let Some(&p) = by_date.get(d) {
        last = Some(p);
      }
      filled.push(last.unwrap_or(f64::NAN));
    }

    // Back-fill leading gaps with the first genuine observation.
    let first = s.closes.first().copied().unwrap_or(f64::NAN);
    for p in filled.iter_mut() {
      if p.is_nan() {
        *p = first;
      } else {
        break;
      }
    }

    symbols.push(s.symbol.clone());
    prices.push(filled);
  }

  let periods_per_year = infer_periods_per_year(&dates);

  Ok(AlignedPrices {
    symbols,
    dates,
    prices,
    periods_per_year,
  })
}

/// Annualized geometric (log-mean) expected return of a periodic series.
///
/// `exp(mean(ln(1+r)) * ppy) - 1`; strictly more conservative than the
/// arithmetic convention for volatile assets. Periodic returns are clipped
/// at -99% to keep the logarithm defined.
pub fn geometric_annualized_return(returns: &[f64], periods_per_year: f64) -> f64 {
  if returns.is_empty() {
    return 0.0;
  }

  let mean_log = returns.iter().map(|&r| (1.0 + r.max(-0.99)).ln()).mean();
  (mean_log * periods_per_year).exp() - 1.0
}

/// Annualized sample covariance matrix of aligned periodic returns.
pub fn covariance_matrix(returns: &[Vec<f64>], periods_per_year: f64) -> Vec<Vec<f64>> {
  let n = returns.len();
  let periods = returns.first().map(|r| r.len()).unwrap_or(0);
  let mut cov = vec![vec![0.0; n]; n];
  if periods < 2 {
    return cov;
  }

  let means: Vec<f64> = returns.iter().map(|r| r.iter().mean()).collect();

  for i in 0..n {
    for j in i..n {
      let mut acc = 0.0;
      for t in 0..periods {
        acc += (returns[i][t] - means[i]) * (returns[j][t] - means[j]);
      }
      let c = acc / (periods - 1) as f64 * periods_per_year;
      cov[i][j] = c;
      cov[j][i] = c;
    }
  }

  cov
}

/// Pearson correlation matrix from aligned return series.
pub fn correlation_matrix(returns: &[Vec<f64>]) -> Vec<Vec<f64>> {
  let n = returns.len();
  let mut corr = vec![vec![1.0; n]; n];

  for i in 0..n {
    for j in (i + 1)..n {
      let r = pearson(&returns[i], &returns[j]);
      corr[i][j] = r;
      corr[j][i] = r;
    }
  }

  corr
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
  let n = x.len().min(y.len());
  if n < 2 {
    return 0.0;
  }

  let mx = x[..n].iter().mean();
  let my = y[..n].iter().mean();

  let mut cov = 0.0;
  let mut sx = 0.0;
  let mut sy = 0.0;

  for i in 0..n {
    let dx = x[i] - mx;
    let dy = y[i] - my;
    cov += dx * dy;
    sx += dx * dx;
    sy += dy * dy;
  }

  let denom = (sx * sy).sqrt();
  if denom < 1e-15 {
    0.0
  } else {
    (cov / denom).clamp(-1.0, 1.0)
  }
}

/// Probe invertibility with Gauss-Jordan elimination and partial pivoting.
fn is_invertible(mat: &[Vec<f64>]) -> bool {
  let n = mat.len();
  if n == 0 {
    return false;
  }

  let mut a: Vec<Vec<f64>> = mat.to_vec();

  for col in 0..n {
    let mut max_row = col;
    let mut max_val = a[col][col].abs();
    for row in (col + 1)..n {
      if a[row][col].abs() > max_val {
        max_val = a[row][col].abs();
        max_row = row;
      }
    }

    if max_val < SINGULAR_EPS {
      return false;
    }

    a.swap(col, max_row);

    let pivot = a[col][col];
    for j in 0..n {
      a[col][j] /= pivot;
    }

    for row in 0..n {
      if row == col {
        continue;
      }
      let factor = a[row][col];
      for j in 0..n {
        a[row][j] -= factor * a[col][j];
      }
    }
  }

  true
}

/// Condition a covariance matrix for use by the optimizer.
///
/// A singular or ill-conditioned matrix gets a small ridge added to its
/// diagonal; if it stays singular afterwards the call is fatal.
pub fn condition_covariance(
  mut cov: Vec<Vec<f64>>,
) -> Result<(Vec<Vec<f64>>, bool), EngineError> {
  if is_invertible(&cov) {
    return Ok((cov, false));
  }

  let n = cov.len().max(1);
  let mean_var = (0..cov.len()).map(|i| cov[i][i]).sum::<f64>() / n as f64;
  let ridge = RIDGE_FRACTION * mean_var;

  for (i, row) in cov.iter_mut().enumerate() {
    row[i] += ridge;
  }

  if is_invertible(&cov) {
    tracing::debug!(ridge, "applied diagonal shrinkage to covariance matrix");
    Ok((cov, true))
  } else {
    Err(EngineError::NumericalInstability)
  }
}

/// Build annualized return and risk estimates from aligned returns.
pub fn build_return_statistics(
  aligned: AlignedReturns,
) -> Result<ReturnStatistics, EngineError> {
  let ppy = aligned.periods_per_year;

  let mean_returns: Vec<f64> = aligned
    .returns
    .iter()
    .map(|r| geometric_annualized_return(r, ppy))
    .collect();

  let cov = covariance_matrix(&aligned.returns, ppy);
  let (covariance, shrinkage_applied) = condition_covariance(cov)?;

  Ok(ReturnStatistics {
    symbols: aligned.symbols,
    mean_returns,
    covariance,
    returns: aligned.returns,
    periods_per_year: ppy,
    shrinkage_applied,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_relative_eq;
  use chrono::Duration;

  fn date(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap() + Duration::days(offset)
  }

  fn series(symbol: &str, closes: Vec<f64>) -> PriceSeries {
    let dates = (0..closes.len() as i64).map(date).collect();
    PriceSeries::new(symbol, dates, closes)
  }

  #[test]
  fn geometric_mean_matches_closed_form() {
    // Constant 0.1% daily growth: exp(ln(1.001) * 252) - 1.
    let returns = vec![0.001; 100];
    let expected = (1.001f64.ln() * 252.0).exp() - 1.0;
    assert_relative_eq!(
      geometric_annualized_return(&returns, 252.0),
      expected,
      epsilon = 1e-12
    );
  }

  #[test]
  fn geometric_mean_is_below_arithmetic_for_volatile_series() {
    let returns = vec![0.05, -0.05, 0.05, -0.05, 0.05, -0.05];
    let arithmetic = returns.iter().sum::<f64>() / returns.len() as f64 * 252.0;
    assert!(geometric_annualized_return(&returns, 252.0) < arithmetic);
  }

  #[test]
  fn alignment_forward_fills_missing_days() {
    let a = series("AAA.AX", vec![10.0, 11.0, 12.0, 13.0]);
    // BBB misses the middle dates.
    let b = PriceSeries::new("BBB.AX", vec![date(0), date(3)], vec![20.0, 23.0]);

    let aligned = align_price_series(&[a, b], 2).unwrap();
    assert_eq!(aligned.dates.len(), 4);
    assert_eq!(aligned.prices[1], vec![20.0, 20.0, 20.0, 23.0]);
  }

  #[test]
  fn alignment_rejects_short_history() {
    let a = series("AAA.AX", (0..40).map(|i| 10.0 + i as f64 * 0.1).collect());
    let b = series("NEW.AX", (0..10).map(|i| 5.0 + i as f64 * 0.1).collect());

    let err = align_price_series(&[a, b], 30).unwrap_err();
    match err {
      EngineError::InsufficientHistory {
        symbol,
        observed,
        required,
      } => {
        assert_eq!(symbol, "NEW.AX");
        assert_eq!(observed, 10);
        assert_eq!(required, 30);
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn periods_per_year_detects_weekly_data() {
    let dates: Vec<NaiveDate> = (0..20).map(|i| date(i * 7)).collect();
    assert_eq!(infer_periods_per_year(&dates), 52.0);
  }

  #[test]
  fn covariance_annualizes_sample_estimate() {
    let returns = vec![vec![0.01, -0.01, 0.02, 0.0], vec![0.02, -0.02, 0.04, 0.0]];
    let cov = covariance_matrix(&returns, 252.0);

    assert_relative_eq!(cov[0][1], cov[1][0], epsilon = 1e-15);
    // Second asset is exactly twice the first.
    assert_relative_eq!(cov[1][1], 4.0 * cov[0][0], epsilon = 1e-12);
    assert_relative_eq!(cov[0][1], 2.0 * cov[0][0], epsilon = 1e-12);
  }

  #[test]
  fn duplicate_assets_trigger_shrinkage() {
    let returns = vec![
      vec![0.01, -0.02, 0.015, 0.005, -0.01],
      vec![0.01, -0.02, 0.015, 0.005, -0.01],
    ];
    let cov = covariance_matrix(&returns, 252.0);
    let (conditioned, shrunk) = condition_covariance(cov).unwrap();

    assert!(shrunk);
    assert!(is_invertible(&conditioned));
  }

  #[test]
  fn zero_covariance_is_fatal() {
    let cov = vec![vec![0.0, 0.0], vec![0.0, 0.0]];
    assert!(matches!(
      condition_covariance(cov),
      Err(EngineError::NumericalInstability)
    ));
  }

  #[test]
  fn correlation_matrix_is_well_formed() {
    let returns = vec![
      vec![0.01, -0.02, 0.015, 0.005, -0.01, 0.02],
      vec![0.005, 0.01, -0.01, 0.02, 0.0, -0.005],
      vec![-0.01, 0.02, 0.01, -0.005, 0.015, 0.0],
    ];
    let corr = correlation_matrix(&returns);

    for i in 0..3 {
      assert_relative_eq!(corr[i][i], 1.0, epsilon = 1e-15);
      for j in 0..3 {
        assert_relative_eq!(corr[i][j], corr[j][i], epsilon = 1e-15);
        assert!(corr[i][j] >= -1.0 && corr[i][j] <= 1.0);
      }
    }
  }
}
