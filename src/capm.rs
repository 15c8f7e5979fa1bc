//! # CAPM
//!
//! $$
//! \mathbb{E}[r_i] = r_f + \beta_i\,(\mathbb{E}[r_m] - r_f)
//! $$
//!
//! Single-factor analyzer: per-asset OLS regression of excess returns on
//! market excess returns yields beta, alpha and residual volatility, plus
//! the CAPM-implied expected return used as an alternative return model.
//! The covariance estimate is unchanged; only the return estimate differs.

use std::fmt::Display;

use serde::Serialize;
use statrs::statistics::Statistics;

/// Default equity risk premium over the risk-free rate.
pub const DEFAULT_MARKET_PREMIUM: f64 = 0.06;

/// Clipping range applied to regression betas.
pub const BETA_RANGE: (f64, f64) = (0.1, 3.0);

/// Clipping range applied to the historical premium estimate.
const PREMIUM_RANGE: (f64, f64) = (0.02, 0.12);

/// Minimum overlapping observations before a regression is trusted.
const MIN_REGRESSION_POINTS: usize = 30;

/// Systematic-risk bucket derived from beta.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RiskCategory {
  /// Beta below 0.8.
  Defensive,
  /// Beta in `[0.8, 1.2)`.
  Neutral,
  /// Beta of 1.2 and above.
  Aggressive,
}

impl RiskCategory {
  /// Bucket a beta coefficient.
  pub fn from_beta(beta: f64) -> Self {
    if beta < 0.8 {
      Self::Defensive
    } else if beta < 1.2 {
      Self::Neutral
    } else {
      Self::Aggressive
    }
  }
}

impl Display for RiskCategory {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      RiskCategory::Defensive => write!(f, "Defensive"),
      RiskCategory::Neutral => write!(f, "Neutral"),
      RiskCategory::Aggressive => write!(f, "Aggressive"),
    }
  }
}

/// Mispricing bucket derived from annualized alpha.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ValuationTag {
  /// Alpha above +2% per year.
  Undervalued,
  /// Alpha within ±2% per year.
  FairValue,
  /// Alpha below -2% per year.
  Overvalued,
}

impl ValuationTag {
  /// Bucket an annualized alpha.
  pub fn from_alpha(alpha: f64) -> Self {
    if alpha > 0.02 {
      Self::Undervalued
    } else if alpha < -0.02 {
      Self::Overvalued
    } else {
      Self::FairValue
    }
  }
}

impl Display for ValuationTag {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ValuationTag::Undervalued => write!(f, "Undervalued"),
      ValuationTag::FairValue => write!(f, "Fair Value"),
      ValuationTag::Overvalued => write!(f, "Overvalued"),
    }
  }
}

/// Per-asset CAPM regression diagnostics.
#[derive(Clone, Debug, Serialize)]
pub struct CapmStats {
  /// Asset symbol.
  pub symbol: String,
  /// Regression slope against market excess returns, clipped to [0.1, 3.0].
  pub beta: f64,
  /// Annualized regression intercept.
  pub alpha: f64,
  /// CAPM-implied annualized expected return.
  pub expected_return: f64,
  /// Annualized volatility of the asset's own returns.
  pub annualized_volatility: f64,
  /// Annualized volatility of the regression residuals.
  pub residual_volatility: f64,
  /// Systematic-risk bucket.
  pub risk_category: RiskCategory,
  /// Mispricing bucket.
  pub valuation: ValuationTag,
}

/// CAPM-implied expected return `r_f + beta * premium`.
pub fn capm_expected_return(beta: f64, risk_free: f64, market_premium: f64) -> f64 {
  risk_free + beta * market_premium
}

/// Estimate the market premium from a realized market return series.
///
/// Annualized arithmetic mean minus the risk-free rate, clipped to a
/// plausible [2%, 12%] band; falls back to the default premium when the
/// window is too short.
pub fn historical_market_premium(
  market_returns: &[f64],
  periods_per_year: f64,
  risk_free: f64,
) -> f64 {
  if market_returns.len() < 20 {
    return DEFAULT_MARKET_PREMIUM;
  }

  let annualized = market_returns.iter().mean() * periods_per_year;
  (annualized - risk_free).clamp(PREMIUM_RANGE.0, PREMIUM_RANGE.1)
}

/// Regress each asset's excess returns on market excess returns.
///
/// Series must already be aligned to the same date grid. A degenerate
/// regression (too few points or a flat market) falls back to the market
/// beta of 1 with zero alpha.
pub fn analyze_assets(
  symbols: &[String],
  asset_returns: &[Vec<f64>],
  market_returns: &[f64],
  periods_per_year: f64,
  risk_free: f64,
  market_premium: f64,
) -> Vec<CapmStats> {
  let rf_period = risk_free / periods_per_year;
  let market_excess: Vec<f64> = market_returns.iter().map(|&r| r - rf_period).collect();

  symbols
    .iter()
    .zip(asset_returns.iter())
    .map(|(symbol, returns)| {
      let n = returns.len().min(market_excess.len());
      let asset_excess: Vec<f64> = returns[..n].iter().map(|&r| r - rf_period).collect();

      let (slope, intercept) = if n >= MIN_REGRESSION_POINTS {
        linreg::linear_regression::<f64, f64, f64>(&market_excess[..n], &asset_excess)
          .unwrap_or((1.0, 0.0))
      } else {
        (1.0, 0.0)
      };

      let beta = slope.clamp(BETA_RANGE.0, BETA_RANGE.1);
      let alpha = intercept * periods_per_year;

      let residual_volatility = if n >= 2 {
        let residuals: Vec<f64> = (0..n)
          .map(|t| asset_excess[t] - (slope * market_excess[t] + intercept))
          .collect();
        residuals.iter().std_dev() * periods_per_year.sqrt()
      } else {
        0.0
      };

      let annualized_volatility = if returns.len() >= 2 {
        returns.iter().std_dev() * periods_per_year.sqrt()
      } else {
        0.0
      };

      CapmStats {
        symbol: symbol.clone(),
        beta,
        alpha,
        expected_return: capm_expected_return(beta, risk_free, market_premium),
        annualized_volatility,
        residual_volatility,
        risk_category: RiskCategory::from_beta(beta),
        valuation: ValuationTag::from_alpha(alpha),
      }
    })
    .collect()
}
