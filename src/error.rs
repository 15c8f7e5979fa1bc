//! # Error
//!
//! $$
//! \text{call} \to \text{Result}\langle\text{result},\ \text{EngineError}\rangle
//! $$
//!
//! Typed failure kinds surfaced by the engine. Solver non-convergence is
//! deliberately not an error: the optimizer recovers locally and returns a
//! best-effort result with `optimization_success = false`.

use thiserror::Error;

use crate::types::RiskTolerance;

/// Failure kinds for optimization, analysis and backtest calls.
#[derive(Debug, Error)]
pub enum EngineError {
  /// Request rejected before any data fetch (symbol count/format, amount).
  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// An asset's usable observation count is below the configured minimum.
  #[error("insufficient history for {symbol}: {observed} observations, minimum {required}")]
  InsufficientHistory {
    symbol: String,
    observed: usize,
    required: usize,
  },

  /// Candidate set is smaller than the risk profile's minimum asset count.
  #[error("{available} candidate assets, the {tolerance} profile requires at least {required}")]
  InsufficientAssets {
    available: usize,
    required: usize,
    tolerance: RiskTolerance,
  },

  /// The market-data collaborator failed to supply a requested series.
  #[error("market data unavailable for {symbol}: {reason}")]
  DataUnavailable { symbol: String, reason: String },

  /// Covariance matrix stayed singular after the shrinkage retry.
  #[error("covariance matrix remains singular after diagonal shrinkage")]
  NumericalInstability,
}
