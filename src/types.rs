//! # Types
//!
//! $$
//! \mathbf{w} \in [0, w_{\max}]^N, \quad \textstyle\sum_i w_i = 1
//! $$
//!
//! Shared data model for the optimization engine.

use std::fmt::Display;

use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;

use crate::capm::CapmStats;
use crate::fundamentals::FactorScores;

/// Dated adjusted-close history for a single asset.
///
/// Dates must be strictly ascending and `dates.len() == closes.len()`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriceSeries {
  /// Exchange-qualified asset symbol (e.g. `BHP.AX`).
  pub symbol: String,
  /// Observation dates, ascending.
  pub dates: Vec<NaiveDate>,
  /// Adjusted close per observation date.
  pub closes: Vec<f64>,
}

impl PriceSeries {
  /// Construct a new price series.
  pub fn new(symbol: impl Into<String>, dates: Vec<NaiveDate>, closes: Vec<f64>) -> Self {
    Self {
      symbol: symbol.into(),
      dates,
      closes,
    }
  }

  /// Number of observations.
  pub fn len(&self) -> usize {
    self.dates.len().min(self.closes.len())
  }

  /// True when the series has no observations.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Risk tolerance selected per optimization call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
  /// Capped at 25% per asset, at least 4 names, heavy volatility penalty.
  Conservative,
  /// Capped at 40% per asset, at least 3 names, standard optimization.
  #[default]
  Moderate,
  /// Concentration up to 60% per asset, at least 2 names, light penalty.
  Aggressive,
}

impl RiskTolerance {
  /// Parse a string into a [`RiskTolerance`], defaulting to moderate.
  pub fn from_str(s: &str) -> Self {
    match s.to_lowercase().as_str() {
      "conservative" => Self::Conservative,
      "aggressive" => Self::Aggressive,
      _ => Self::Moderate,
    }
  }

  /// Optimizer constraint bundle carried by this tolerance.
  pub fn profile(self) -> RiskProfile {
    match self {
      Self::Conservative => RiskProfile {
        max_weight: 0.25,
        min_assets: 4,
        volatility_penalty: 1.5,
      },
      Self::Moderate => RiskProfile {
        max_weight: 0.40,
        min_assets: 3,
        volatility_penalty: 1.0,
      },
      Self::Aggressive => RiskProfile {
        max_weight: 0.60,
        min_assets: 2,
        volatility_penalty: 0.8,
      },
    }
  }
}

impl Display for RiskTolerance {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      RiskTolerance::Conservative => write!(f, "conservative"),
      RiskTolerance::Moderate => write!(f, "moderate"),
      RiskTolerance::Aggressive => write!(f, "aggressive"),
    }
  }
}

/// Constraint bundle applied by the mean-variance optimizer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
  /// Maximum weight allowed per asset.
  pub max_weight: f64,
  /// Minimum number of assets with non-negligible weight.
  pub min_assets: usize,
  /// Multiplier on portfolio volatility inside the objective.
  pub volatility_penalty: f64,
}

/// Historical lookback window requested from the data provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LookbackPeriod {
  #[serde(rename = "6mo")]
  SixMonths,
  #[serde(rename = "1y")]
  OneYear,
  #[default]
  #[serde(rename = "2y")]
  TwoYears,
  #[serde(rename = "5y")]
  FiveYears,
}

impl LookbackPeriod {
  /// Provider-facing period tag.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::SixMonths => "6mo",
      Self::OneYear => "1y",
      Self::TwoYears => "2y",
      Self::FiveYears => "5y",
    }
  }

  /// Parse a period tag, defaulting to two years.
  pub fn from_str(s: &str) -> Self {
    match s.to_lowercase().as_str() {
      "6mo" | "6m" => Self::SixMonths,
      "1y" => Self::OneYear,
      "5y" => Self::FiveYears,
      _ => Self::TwoYears,
    }
  }
}

impl Display for LookbackPeriod {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Per-asset fundamentals snapshot supplied by the data collaborator.
///
/// Every field that an external feed can fail to report is optional; the
/// factor scorer substitutes a neutral contribution for missing fields and
/// records the substitution per asset.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FundamentalsRecord {
  /// Exchange-qualified asset symbol.
  pub symbol: String,
  /// Latest spot price.
  pub current_price: f64,
  /// Market capitalization in the listing currency.
  pub market_cap: Option<f64>,
  /// Earnings yield (inverse P/E).
  pub earnings_yield: Option<f64>,
  /// Price-to-book ratio.
  pub price_to_book: Option<f64>,
  /// Return on equity as a fraction.
  pub return_on_equity: Option<f64>,
  /// Net profit margin as a fraction.
  pub profit_margin: Option<f64>,
  /// Debt-to-equity expressed in percent (e.g. `120.0`).
  pub debt_to_equity: Option<f64>,
  /// Trailing earnings growth as a fraction.
  pub earnings_growth: Option<f64>,
  /// Trailing revenue growth as a fraction.
  pub revenue_growth: Option<f64>,
  /// Dividend payout ratio in `[0, 1]`.
  pub payout_ratio: Option<f64>,
  /// Trailing dividend yield as a fraction.
  pub dividend_yield: Option<f64>,
  /// Trailing 12-month price return.
  pub momentum_12m: Option<f64>,
}

/// Diagnostics specific to the return model that produced a result.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "model", content = "stats", rename_all = "lowercase")]
pub enum ModelDiagnostics {
  /// Historical geometric-mean return model; no extra diagnostics.
  Historical,
  /// Per-asset CAPM regression statistics.
  Capm(Vec<CapmStats>),
  /// Per-asset factor sub-scores and missing-field substitutions.
  Fundamentals(Vec<FactorScores>),
}

/// Aggregate output of one optimization call.
///
/// `symbols` fixes the ordering shared by `weights`, `allocation_amounts`
/// and the rows/columns of `correlation`; the engine never reorders them
/// within a call.
#[derive(Clone, Debug, Serialize)]
pub struct OptimizationResult {
  /// Asset ordering for every vector and matrix below.
  pub symbols: Vec<String>,
  /// Optimal weights, summing to 1 within solver tolerance.
  pub weights: Vec<f64>,
  /// Investment amount apportioned by weight.
  pub allocation_amounts: Vec<f64>,
  /// Annualized portfolio expected return `w·mu`.
  pub expected_return: f64,
  /// Annualized portfolio volatility `sqrt(wᵗΣw)`.
  pub volatility: f64,
  /// Sharpe ratio over the configured risk-free rate.
  pub sharpe_ratio: f64,
  /// Parametric one-period 95% Value-at-Risk (loss as a positive fraction).
  pub var_95: f64,
  /// Largest historical peak-to-trough decline (non-negative magnitude).
  pub max_drawdown: f64,
  /// Weighted trailing dividend yield.
  pub dividend_yield: f64,
  /// Pairwise correlation matrix in `symbols` order.
  pub correlation: Vec<Vec<f64>>,
  /// False when the solver fell back to its best feasible iterate.
  pub optimization_success: bool,
  /// True when diagonal shrinkage was applied to the covariance matrix.
  pub shrinkage_applied: bool,
  /// Risk tolerance the call was solved under.
  pub risk_tolerance: RiskTolerance,
  /// Per-asset weight cap that was in force.
  pub max_single_weight: f64,
  /// Return-model specific diagnostics.
  pub diagnostics: ModelDiagnostics,
}

impl OptimizationResult {
  /// Weight assigned to `symbol`, if it was part of the call.
  pub fn weight_of(&self, symbol: &str) -> Option<f64> {
    self
      .symbols
      .iter()
      .position(|s| s == symbol)
      .map(|i| self.weights[i])
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn risk_profiles_match_tolerance() {
    let conservative = RiskTolerance::Conservative.profile();
    assert_eq!(conservative.max_weight, 0.25);
    assert_eq!(conservative.min_assets, 4);

    let aggressive = RiskTolerance::Aggressive.profile();
    assert_eq!(aggressive.max_weight, 0.60);
    assert_eq!(aggressive.min_assets, 2);
    assert!(aggressive.volatility_penalty < conservative.volatility_penalty);
  }

  #[test]
  fn tolerance_parses_with_moderate_fallback() {
    assert_eq!(
      RiskTolerance::from_str("Conservative"),
      RiskTolerance::Conservative
    );
    assert_eq!(RiskTolerance::from_str("whatever"), RiskTolerance::Moderate);
  }

  #[test]
  fn lookback_round_trips_through_tag() {
    for period in [
      LookbackPeriod::SixMonths,
      LookbackPeriod::OneYear,
      LookbackPeriod::TwoYears,
      LookbackPeriod::FiveYears,
    ] {
      assert_eq!(LookbackPeriod::from_str(period.as_str()), period);
    }
  }
}
