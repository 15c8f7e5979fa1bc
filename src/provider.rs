//! # Provider
//!
//! $$
//! \text{symbols} \times \text{period} \to \{(t, P_t)\}
//! $$
//!
//! In-process seam to the external market-data collaborator. The engine is
//! stateless and performs no I/O; every fetch happens through this trait
//! before the numerical work starts, and failures are mapped to
//! [`EngineError::DataUnavailable`](crate::error::EngineError) with the
//! offending symbol named.

use std::collections::HashMap;

use anyhow::Result;

use crate::types::FundamentalsRecord;
use crate::types::LookbackPeriod;
use crate::types::PriceSeries;

/// Contract implemented by the market-data collaborator.
///
/// Implementations own fetching, caching and retry policy; the engine
/// treats every call as a plain fallible lookup.
pub trait MarketDataProvider {
  /// Adjusted-close history for each requested symbol over `period`.
  fn price_history(
    &self,
    symbols: &[String],
    period: LookbackPeriod,
  ) -> Result<Vec<PriceSeries>>;

  /// History of the market benchmark index over `period`.
  fn market_history(&self, period: LookbackPeriod) -> Result<PriceSeries>;

  /// Trailing dividend yields keyed by symbol. Symbols without a payout
  /// may be absent from the map.
  fn dividend_yields(&self, symbols: &[String]) -> Result<HashMap<String, f64>>;

  /// Fundamentals snapshot for a single symbol.
  fn fundamentals(&self, symbol: &str) -> Result<FundamentalsRecord>;
}
