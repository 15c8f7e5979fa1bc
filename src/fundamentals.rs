//! # Fundamentals
//!
//! $$
//! s = 0.25\,s_v + 0.25\,s_q + 0.15\,s_g + 0.15\,s_z + 0.20\,s_m
//! $$
//!
//! Cross-sectional factor scoring over fundamentals snapshots. Five buckets
//! (value, quality, growth, size, momentum) are each scored on a 0..100
//! scale around a neutral 50, combined into a composite, then mapped to an
//! implied annualized expected return. Missing inputs degrade gracefully to
//! the neutral score and are recorded per asset for diagnostics.

use serde::Serialize;

use crate::types::FundamentalsRecord;

/// Weights of the five factor buckets in the composite score.
const BUCKET_WEIGHTS: [f64; 5] = [0.25, 0.25, 0.15, 0.15, 0.20];

/// Neutral score assigned when a bucket has no usable inputs.
const NEUTRAL: f64 = 50.0;

/// Payout ratio assumed when neither a reported ratio nor a yield-implied
/// estimate is available.
const DEFAULT_PAYOUT: f64 = 0.3;

/// Range the implied expected return is clamped to.
const EXPECTED_RETURN_RANGE: (f64, f64) = (-0.05, 0.25);

/// Per-asset factor scores and the implied return estimate.
#[derive(Clone, Debug, Serialize)]
pub struct FactorScores {
  /// Asset symbol.
  pub symbol: String,
  /// Value bucket: earnings yield and price-to-book.
  pub value: f64,
  /// Quality bucket: return on equity, profit margin, leverage.
  pub quality: f64,
  /// Growth bucket: blended earnings growth and revenue growth.
  pub growth: f64,
  /// Size bucket: smaller market caps score higher.
  pub size: f64,
  /// Momentum bucket: trailing 12-month price change.
  pub momentum: f64,
  /// Weighted composite on the 0..100 scale.
  pub composite: f64,
  /// Implied annualized expected return.
  pub expected_return: f64,
  /// Input fields that were missing and defaulted to neutral.
  pub defaulted_fields: Vec<&'static str>,
}

/// Score a batch of fundamentals snapshots.
pub fn score_assets(
  records: &[FundamentalsRecord],
  risk_free: f64,
  market_premium: f64,
) -> Vec<FactorScores> {
  records
    .iter()
    .map(|r| score_record(r, risk_free, market_premium))
    .collect()
}

/// Score a single fundamentals snapshot.
pub fn score_record(
  record: &FundamentalsRecord,
  risk_free: f64,
  market_premium: f64,
) -> FactorScores {
  let mut defaulted = Vec::new();

  let value = value_score(record, &mut defaulted);
  let quality = quality_score(record, &mut defaulted);
  let growth = growth_score(record, &mut defaulted);
  let size = size_score(record, &mut defaulted);
  let momentum = momentum_score(record, &mut defaulted);

  let buckets = [value, quality, growth, size, momentum];
  let composite = buckets
    .iter()
    .zip(BUCKET_WEIGHTS.iter())
    .map(|(s, w)| s * w)
    .sum::<f64>()
    .clamp(0.0, 100.0);

  FactorScores {
    symbol: record.symbol.clone(),
    value,
    quality,
    growth,
    size,
    momentum,
    composite,
    expected_return: implied_expected_return(composite, risk_free, market_premium),
    defaulted_fields: defaulted,
  }
}

/// Map a composite score to an annualized expected return.
///
/// The neutral score of 50 lands exactly on `r_f + premium`; the full
/// 0..100 range sweeps a band of twice the market premium around it.
pub fn implied_expected_return(composite: f64, risk_free: f64, market_premium: f64) -> f64 {
  (risk_free + (composite / 100.0) * 2.0 * market_premium)
    .clamp(EXPECTED_RETURN_RANGE.0, EXPECTED_RETURN_RANGE.1)
}

fn value_score(record: &FundamentalsRecord, defaulted: &mut Vec<&'static str>) -> f64 {
  let mut score = NEUTRAL;

  match record.earnings_yield {
    Some(ey) => {
      score += if ey >= 0.08 {
        25.0
      } else if ey >= 0.06 {
        15.0
      } else if ey >= 0.04 {
        5.0
      } else if ey < 0.02 {
        -20.0
      } else if ey < 0.03 {
        -10.0
      } else {
        0.0
      };
    }
    None => defaulted.push("earnings_yield"),
  }

  match record.price_to_book {
    Some(pb) => {
      score += if pb < 1.0 {
        15.0
      } else if pb < 2.0 {
        10.0
      } else if pb < 3.0 {
        0.0
      } else if pb > 5.0 {
        -15.0
      } else {
        -5.0
      };
    }
    None => defaulted.push("price_to_book"),
  }

  score.clamp(0.0, 100.0)
}

fn quality_score(record: &FundamentalsRecord, defaulted: &mut Vec<&'static str>) -> f64 {
  let mut score = NEUTRAL;

  match record.return_on_equity {
    Some(roe) => {
      score += if roe >= 0.20 {
        25.0
      } else if roe >= 0.15 {
        15.0
      } else if roe >= 0.10 {
        5.0
      } else if roe < 0.0 {
        -25.0
      } else if roe < 0.05 {
        -15.0
      } else {
        0.0
      };
    }
    None => defaulted.push("return_on_equity"),
  }

  match record.profit_margin {
    Some(margin) => {
      score += if margin >= 0.20 {
        15.0
      } else if margin >= 0.10 {
        10.0
      } else if margin >= 0.05 {
        0.0
      } else if margin < 0.0 {
        -20.0
      } else {
        -5.0
      };
    }
    None => defaulted.push("profit_margin"),
  }

  // Debt-to-equity is quoted as a percentage.
  match record.debt_to_equity {
    Some(de) => {
      score += if de > 200.0 {
        -15.0
      } else if de > 100.0 {
        -5.0
      } else if de < 30.0 {
        10.0
      } else {
        0.0
      };
    }
    None => defaulted.push("debt_to_equity"),
  }

  score.clamp(0.0, 100.0)
}

fn growth_score(record: &FundamentalsRecord, defaulted: &mut Vec<&'static str>) -> f64 {
  let mut score = NEUTRAL;

  let sustainable = sustainable_growth(record, defaulted);
  let blended = match (sustainable, record.earnings_growth) {
    (Some(sg), Some(eg)) => Some(0.6 * sg + 0.4 * eg),
    (Some(sg), None) => {
      defaulted.push("earnings_growth");
      Some(sg)
    }
    (None, Some(eg)) => Some(eg),
    (None, None) => {
      defaulted.push("earnings_growth");
      None
    }
  };

  if let Some(g) = blended {
    score += if g >= 0.20 {
      25.0
    } else if g >= 0.10 {
      15.0
    } else if g >= 0.05 {
      5.0
    } else if g < -0.10 {
      -25.0
    } else if g < 0.0 {
      -15.0
    } else {
      0.0
    };
  }

  match record.revenue_growth {
    Some(rg) => {
      score += if rg >= 0.15 {
        15.0
      } else if rg >= 0.08 {
        10.0
      } else if rg < 0.0 {
        -10.0
      } else {
        0.0
      };
    }
    None => defaulted.push("revenue_growth"),
  }

  score.clamp(0.0, 100.0)
}

/// Retention-based sustainable growth `ROE * (1 - payout)`.
///
/// Falls back from the reported payout ratio to a yield-implied estimate
/// and finally to an assumed 30% payout. Returns `None` without a usable
/// return on equity.
fn sustainable_growth(
  record: &FundamentalsRecord,
  defaulted: &mut Vec<&'static str>,
) -> Option<f64> {
  let roe = record.return_on_equity?;

  let payout = match record.payout_ratio {
    Some(p) => p,
    None => {
      defaulted.push("payout_ratio");
      match (record.dividend_yield, record.earnings_yield) {
        (Some(dy), Some(ey)) if ey > 0.0 => (dy / ey).clamp(0.0, 1.0),
        _ => {
          if record.dividend_yield.is_none() {
            defaulted.push("dividend_yield");
          }
          DEFAULT_PAYOUT
        }
      }
    }
  };

  Some((roe * (1.0 - payout.clamp(0.0, 1.0))).clamp(-0.20, 0.30))
}

fn size_score(record: &FundamentalsRecord, defaulted: &mut Vec<&'static str>) -> f64 {
  match record.market_cap {
    Some(cap) => {
      if cap < 0.5e9 {
        85.0
      } else if cap < 2.0e9 {
        70.0
      } else if cap < 10.0e9 {
        55.0
      } else if cap < 50.0e9 {
        40.0
      } else {
        30.0
      }
    }
    None => {
      defaulted.push("market_cap");
      NEUTRAL
    }
  }
}

fn momentum_score(record: &FundamentalsRecord, defaulted: &mut Vec<&'static str>) -> f64 {
  match record.momentum_12m {
    Some(m) => {
      if m >= 0.50 {
        90.0
      } else if m >= 0.30 {
        80.0
      } else if m >= 0.15 {
        70.0
      } else if m >= 0.05 {
        60.0
      } else if m >= -0.05 {
        50.0
      } else if m >= -0.15 {
        40.0
      } else if m >= -0.30 {
        30.0
      } else {
        20.0
      }
    }
    None => {
      defaulted.push("momentum_12m");
      NEUTRAL
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_relative_eq;

  fn bare(symbol: &str) -> FundamentalsRecord {
    FundamentalsRecord {
      symbol: symbol.to_string(),
      current_price: 100.0,
      market_cap: None,
      earnings_yield: None,
      price_to_book: None,
      return_on_equity: None,
      profit_margin: None,
      debt_to_equity: None,
      earnings_growth: None,
      revenue_growth: None,
      payout_ratio: None,
      dividend_yield: None,
      momentum_12m: None,
    }
  }

  #[test]
  fn all_missing_inputs_score_neutral() {
    let scores = score_record(&bare("XXX.AX"), 0.035, 0.06);

    assert_relative_eq!(scores.composite, 50.0, epsilon = 1e-12);
    // Neutral composite lands exactly on rf + premium.
    assert_relative_eq!(scores.expected_return, 0.095, epsilon = 1e-12);
    assert!(scores.defaulted_fields.contains(&"earnings_yield"));
    assert!(scores.defaulted_fields.contains(&"market_cap"));
    assert!(scores.defaulted_fields.contains(&"momentum_12m"));
  }

  #[test]
  fn strong_fundamentals_outscore_weak() {
    let strong = FundamentalsRecord {
      market_cap: Some(1.0e9),
      earnings_yield: Some(0.09),
      price_to_book: Some(0.9),
      return_on_equity: Some(0.25),
      profit_margin: Some(0.22),
      debt_to_equity: Some(20.0),
      earnings_growth: Some(0.25),
      revenue_growth: Some(0.18),
      payout_ratio: Some(0.4),
      dividend_yield: Some(0.04),
      momentum_12m: Some(0.35),
      ..bare("STR.AX")
    };
    let weak = FundamentalsRecord {
      market_cap: Some(80.0e9),
      earnings_yield: Some(0.01),
      price_to_book: Some(6.0),
      return_on_equity: Some(-0.05),
      profit_margin: Some(-0.02),
      debt_to_equity: Some(250.0),
      earnings_growth: Some(-0.20),
      revenue_growth: Some(-0.05),
      payout_ratio: Some(0.9),
      dividend_yield: Some(0.0),
      momentum_12m: Some(-0.40),
      ..bare("WEK.AX")
    };

    let scores = score_assets(&[strong, weak], 0.035, 0.06);

    assert!(scores[0].composite > scores[1].composite);
    assert!(scores[0].expected_return > scores[1].expected_return);
    assert!(scores[0].defaulted_fields.is_empty());
  }

  #[test]
  fn missing_dividend_yield_still_scores() {
    let record = FundamentalsRecord {
      earnings_yield: Some(0.07),
      return_on_equity: Some(0.18),
      ..bare("DIV.AX")
    };

    let scores = score_record(&record, 0.035, 0.06);

    // Payout falls back to the assumed default and the gaps are recorded.
    assert!(scores.defaulted_fields.contains(&"payout_ratio"));
    assert!(scores.defaulted_fields.contains(&"dividend_yield"));
    assert!(scores.growth > 50.0);
  }

  #[test]
  fn expected_return_is_clamped() {
    assert_relative_eq!(
      implied_expected_return(100.0, 0.10, 0.10),
      0.25,
      epsilon = 1e-12
    );
    assert_relative_eq!(
      implied_expected_return(0.0, -0.10, 0.01),
      -0.05,
      epsilon = 1e-12
    );
  }
}
