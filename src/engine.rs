//! # Engine
//!
//! $$
//! \text{request} \to \hat\mu, \hat\Sigma \to \mathbf{w}^* \to \text{result}
//! $$
//!
//! Stateless orchestration layer: validates the request, fetches history
//! through the provider seam, builds return/risk estimates under the chosen
//! return model, solves for the Sharpe-optimal weights and assembles the
//! final result with risk metrics and model diagnostics.

use rayon::prelude::*;
use serde::Deserialize;
use serde::Serialize;

use crate::backtest::run_backtest;
use crate::backtest::BacktestReport;
use crate::capm;
use crate::error::EngineError;
use crate::fundamentals;
use crate::optimizer;
use crate::optimizer::FrontierPoint;
use crate::provider::MarketDataProvider;
use crate::risk;
use crate::stats;
use crate::stats::ReturnStatistics;
use crate::types::LookbackPeriod;
use crate::types::ModelDiagnostics;
use crate::types::OptimizationResult;
use crate::types::PriceSeries;
use crate::types::RiskTolerance;

/// Engine-wide parameters, fixed at construction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
  /// Annualized risk-free rate.
  pub risk_free_rate: f64,
  /// Equity risk premium used by the CAPM and fundamentals models.
  pub market_premium: f64,
  /// Estimate the premium from the benchmark's realized history instead of
  /// using the configured constant.
  pub use_historical_premium: bool,
  /// Minimum genuine observations required per asset.
  pub min_observations: usize,
  /// Smallest accepted investment amount.
  pub min_investment: f64,
  /// Largest accepted investment amount.
  pub max_investment: f64,
  /// Number of points swept for the efficient frontier.
  pub frontier_points: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      risk_free_rate: 0.035,
      market_premium: capm::DEFAULT_MARKET_PREMIUM,
      use_historical_premium: false,
      min_observations: 30,
      min_investment: 100.0,
      max_investment: 10_000_000.0,
      frontier_points: 50,
    }
  }
}

/// Return model used to estimate expected returns.
///
/// The covariance is always estimated from realized history; the models
/// differ only in the expected-return vector fed to the optimizer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnModel {
  /// Geometric annualized historical returns plus dividend yields.
  #[default]
  Historical,
  /// CAPM-implied returns from per-asset market regressions.
  Capm,
  /// Implied returns from cross-sectional fundamentals factor scores.
  Fundamentals,
}

/// One optimization request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OptimizeRequest {
  /// Candidate asset symbols.
  pub symbols: Vec<String>,
  /// Total amount to apportion across the weights.
  pub investment_amount: f64,
  /// Risk tolerance the solve runs under.
  #[serde(default)]
  pub risk_tolerance: RiskTolerance,
  /// Historical lookback window.
  #[serde(default)]
  pub period: LookbackPeriod,
  /// Expected-return model.
  #[serde(default)]
  pub model: ReturnModel,
}

/// Side-by-side results of the same candidate set under every tolerance.
#[derive(Clone, Debug, Serialize)]
pub struct StrategyComparison {
  /// One entry per tolerance that produced a feasible portfolio.
  pub results: Vec<OptimizationResult>,
}

impl StrategyComparison {
  /// The result with the highest Sharpe ratio, if any succeeded.
  pub fn best_sharpe(&self) -> Option<&OptimizationResult> {
    self
      .results
      .iter()
      .max_by(|a, b| a.sharpe_ratio.total_cmp(&b.sharpe_ratio))
  }
}

/// Stateless portfolio optimization engine.
///
/// Holds only configuration; every call fetches its own data through the
/// provider argument, so one engine can serve concurrent callers.
#[derive(Clone, Debug, Default)]
pub struct PortfolioEngine {
  config: EngineConfig,
}

impl PortfolioEngine {
  /// Build an engine with the given configuration.
  pub fn new(config: EngineConfig) -> Self {
    Self { config }
  }

  /// Active configuration.
  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  /// Run one optimization end to end.
  pub fn optimize<P: MarketDataProvider>(
    &self,
    provider: &P,
    request: &OptimizeRequest,
  ) -> Result<OptimizationResult, EngineError> {
    self.validate_request(request)?;
    tracing::info!(
      symbols = ?request.symbols,
      tolerance = %request.risk_tolerance,
      model = ?request.model,
      period = %request.period,
      "optimizing portfolio"
    );

    let (stats, mu, yields, diagnostics) = self.estimate(provider, request)?;
    self.assemble(
      request.investment_amount,
      request.risk_tolerance,
      &stats,
      &mu,
      &yields,
      diagnostics,
    )
  }

  /// Optimize the same candidate set under all three risk tolerances.
  ///
  /// History is fetched and estimated once; the three solves run in
  /// parallel. Tolerances whose constraints cannot be met (too few assets)
  /// are skipped rather than failing the comparison.
  pub fn compare_strategies<P: MarketDataProvider>(
    &self,
    provider: &P,
    request: &OptimizeRequest,
  ) -> Result<StrategyComparison, EngineError> {
    self.validate_request(request)?;
    let (stats, mu, yields, diagnostics) = self.estimate(provider, request)?;

    let tolerances = [
      RiskTolerance::Conservative,
      RiskTolerance::Moderate,
      RiskTolerance::Aggressive,
    ];

    let results: Vec<OptimizationResult> = tolerances
      .par_iter()
      .filter_map(|&tolerance| {
        match self.assemble(
          request.investment_amount,
          tolerance,
          &stats,
          &mu,
          &yields,
          diagnostics.clone(),
        ) {
          Ok(result) => Some(result),
          Err(err) => {
            tracing::warn!(tolerance = %tolerance, error = %err, "strategy skipped");
            None
          }
        }
      })
      .collect();

    Ok(StrategyComparison { results })
  }

  /// Buy-and-hold backtest of a weight vector over the lookback window.
  ///
  /// Rejects the request before any fetch under the same symbol and amount
  /// rules as [`optimize`](Self::optimize).
  pub fn backtest<P: MarketDataProvider>(
    &self,
    provider: &P,
    weights: &[(String, f64)],
    period: LookbackPeriod,
    initial_investment: f64,
  ) -> Result<BacktestReport, EngineError> {
    let symbols: Vec<String> = weights.iter().map(|(s, _)| s.clone()).collect();
    self.validate_symbols(&symbols)?;
    self.validate_amount(initial_investment)?;

    let series = self.fetch_prices(provider, &symbols, period)?;
    let aligned = stats::align_price_series(&series, self.config.min_observations)?;

    run_backtest(&aligned, weights, initial_investment, self.config.risk_free_rate)
  }

  /// Sweep the efficient frontier for a candidate set.
  pub fn efficient_frontier<P: MarketDataProvider>(
    &self,
    provider: &P,
    request: &OptimizeRequest,
  ) -> Result<Vec<FrontierPoint>, EngineError> {
    self.validate_request(request)?;
    let (stats, mu, _, _) = self.estimate(provider, request)?;

    Ok(optimizer::efficient_frontier(
      &mu,
      &stats.covariance,
      self.config.frontier_points,
      self.config.risk_free_rate,
    ))
  }

  fn validate_request(&self, request: &OptimizeRequest) -> Result<(), EngineError> {
    self.validate_symbols(&request.symbols)?;
    self.validate_amount(request.investment_amount)
  }

  fn validate_symbols(&self, symbols: &[String]) -> Result<(), EngineError> {
    let mut distinct = symbols.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    if distinct.len() < 2 {
      return Err(EngineError::InvalidInput(
        "at least two distinct symbols are required".to_string(),
      ));
    }

    for symbol in symbols {
      if !valid_symbol(symbol) {
        return Err(EngineError::InvalidInput(format!(
          "malformed symbol: {symbol}"
        )));
      }
    }

    Ok(())
  }

  fn validate_amount(&self, amount: f64) -> Result<(), EngineError> {
    if !amount.is_finite()
      || amount < self.config.min_investment
      || amount > self.config.max_investment
    {
      return Err(EngineError::InvalidInput(format!(
        "investment amount {amount} outside [{}, {}]",
        self.config.min_investment, self.config.max_investment
      )));
    }

    Ok(())
  }

  fn fetch_prices<P: MarketDataProvider>(
    &self,
    provider: &P,
    symbols: &[String],
    period: LookbackPeriod,
  ) -> Result<Vec<PriceSeries>, EngineError> {
    provider
      .price_history(symbols, period)
      .map_err(|e| EngineError::DataUnavailable {
        symbol: symbols.join(","),
        reason: e.to_string(),
      })
  }

  /// Build covariance statistics, the model's expected-return vector, the
  /// per-asset dividend yields and the model diagnostics.
  fn estimate<P: MarketDataProvider>(
    &self,
    provider: &P,
    request: &OptimizeRequest,
  ) -> Result<(ReturnStatistics, Vec<f64>, Vec<f64>, ModelDiagnostics), EngineError> {
    let rf = self.config.risk_free_rate;
    let series = self.fetch_prices(provider, &request.symbols, request.period)?;

    let yield_map = provider
      .dividend_yields(&request.symbols)
      .map_err(|e| EngineError::DataUnavailable {
        symbol: request.symbols.join(","),
        reason: e.to_string(),
      })?;

    match request.model {
      ReturnModel::Historical => {
        let aligned = stats::align_price_series(&series, self.config.min_observations)?;
        let stats = stats::build_return_statistics(aligned.to_returns())?;
        let yields = aligned_yields(&stats.symbols, &yield_map);

        // Price-only returns understate total return for payers.
        let mu: Vec<f64> = stats
          .mean_returns
          .iter()
          .zip(yields.iter())
          .map(|(r, y)| r + y)
          .collect();

        Ok((stats, mu, yields, ModelDiagnostics::Historical))
      }
      ReturnModel::Capm => {
        let market = provider
          .market_history(request.period)
          .map_err(|e| EngineError::DataUnavailable {
            symbol: "market benchmark".to_string(),
            reason: e.to_string(),
          })?;

        // Align assets and benchmark onto one grid, then split the
        // benchmark row back off before estimating the covariance.
        let mut joint = series;
        joint.push(market);
        let aligned = stats::align_price_series(&joint, self.config.min_observations)?;
        let mut returns = aligned.to_returns();
        let market_returns = returns.returns.pop().unwrap_or_default();
        returns.symbols.pop();

        let ppy = returns.periods_per_year;
        let stats = stats::build_return_statistics(returns)?;
        let yields = aligned_yields(&stats.symbols, &yield_map);

        let premium = if self.config.use_historical_premium {
          capm::historical_market_premium(&market_returns, ppy, rf)
        } else {
          self.config.market_premium
        };

        let capm_stats = capm::analyze_assets(
          &stats.symbols,
          &stats.returns,
          &market_returns,
          ppy,
          rf,
          premium,
        );
        let mu: Vec<f64> = capm_stats.iter().map(|s| s.expected_return).collect();

        Ok((stats, mu, yields, ModelDiagnostics::Capm(capm_stats)))
      }
      ReturnModel::Fundamentals => {
        let aligned = stats::align_price_series(&series, self.config.min_observations)?;
        let stats = stats::build_return_statistics(aligned.to_returns())?;
        let yields = aligned_yields(&stats.symbols, &yield_map);

        let records = stats
          .symbols
          .iter()
          .map(|symbol| {
            provider
              .fundamentals(symbol)
              .map_err(|e| EngineError::DataUnavailable {
                symbol: symbol.clone(),
                reason: e.to_string(),
              })
          })
          .collect::<Result<Vec<_>, _>>()?;

        let scores = fundamentals::score_assets(&records, rf, self.config.market_premium);
        let mu: Vec<f64> = scores.iter().map(|s| s.expected_return).collect();

        Ok((stats, mu, yields, ModelDiagnostics::Fundamentals(scores)))
      }
    }
  }

  fn assemble(
    &self,
    investment_amount: f64,
    tolerance: RiskTolerance,
    stats: &ReturnStatistics,
    mu: &[f64],
    yields: &[f64],
    diagnostics: ModelDiagnostics,
  ) -> Result<OptimizationResult, EngineError> {
    let rf = self.config.risk_free_rate;
    let outcome = optimizer::maximize_sharpe(mu, &stats.covariance, tolerance, rf)?;

    if !outcome.converged {
      tracing::warn!(
        tolerance = %tolerance,
        "solver did not converge; reporting best feasible iterate"
      );
    }

    let summary = risk::summarize(&outcome.weights, stats, mu, yields, rf);
    let allocation_amounts = outcome
      .weights
      .iter()
      .map(|w| w * investment_amount)
      .collect();

    Ok(OptimizationResult {
      symbols: stats.symbols.clone(),
      allocation_amounts,
      expected_return: summary.expected_return,
      volatility: summary.volatility,
      sharpe_ratio: summary.sharpe_ratio,
      var_95: summary.var_95,
      max_drawdown: summary.max_drawdown,
      dividend_yield: summary.dividend_yield,
      correlation: summary.correlation,
      optimization_success: outcome.converged,
      shrinkage_applied: stats.shrinkage_applied,
      risk_tolerance: tolerance,
      max_single_weight: tolerance.profile().max_weight,
      weights: outcome.weights,
      diagnostics,
    })
  }
}

/// Dividend yields aligned to an asset ordering, normalized to fractions.
///
/// Feeds quote yields inconsistently as percentages or fractions; anything
/// above 50% is treated as a percentage figure.
fn aligned_yields(
  symbols: &[String],
  yield_map: &std::collections::HashMap<String, f64>,
) -> Vec<f64> {
  symbols
    .iter()
    .map(|s| {
      let y = yield_map.get(s).copied().unwrap_or(0.0);
      if y > 0.5 {
        y / 100.0
      } else {
        y.max(0.0)
      }
    })
    .collect()
}

/// Symbols are an alphanumeric base with an optional alphabetic exchange
/// suffix, e.g. `BHP.AX`.
///
/// Bare symbols are accepted: some feeds qualify the exchange upstream and
/// deliver `MSFT` rather than `MSFT.US`, so the suffix is validated only
/// when present.
fn valid_symbol(symbol: &str) -> bool {
  match symbol.split_once('.') {
    Some((base, suffix)) => {
      !base.is_empty()
        && base.chars().all(|c| c.is_ascii_alphanumeric())
        && !suffix.is_empty()
        && suffix.chars().all(|c| c.is_ascii_alphabetic())
    }
    None => !symbol.is_empty() && symbol.chars().all(|c| c.is_ascii_alphanumeric()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_relative_eq;
  use chrono::Duration;
  use chrono::NaiveDate;
  use std::collections::HashMap;

  use crate::types::FundamentalsRecord;

  /// Deterministic daily history: constant drift plus a small square-wave
  /// wobble whose period differs per seed so assets stay decorrelated.
  fn synthetic_series(symbol: &str, annual_drift: f64, seed: usize, days: usize) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let daily = (1.0 + annual_drift).powf(1.0 / 252.0) - 1.0;
    let wobble_period = seed + 2;

    let mut closes = Vec::with_capacity(days);
    let mut price = 100.0;
    for t in 0..days {
      let wobble = if (t / wobble_period) % 2 == 0 { 0.002 } else { -0.002 };
      price *= 1.0 + daily + wobble;
      closes.push(price);
    }

    PriceSeries::new(
      symbol,
      (0..days as i64).map(|i| start + Duration::days(i)).collect(),
      closes,
    )
  }

  struct FakeProvider {
    series: HashMap<String, PriceSeries>,
    market: PriceSeries,
    yields: HashMap<String, f64>,
    fundamentals: HashMap<String, FundamentalsRecord>,
  }

  impl FakeProvider {
    fn new(drifts: &[(&str, f64)]) -> Self {
      let days = 260;
      let series = drifts
        .iter()
        .enumerate()
        .map(|(i, (symbol, drift))| {
          (
            symbol.to_string(),
            synthetic_series(symbol, *drift, i, days),
          )
        })
        .collect();

      Self {
        series,
        market: synthetic_series("XJO.AX", 0.08, 7, days),
        yields: HashMap::new(),
        fundamentals: HashMap::new(),
      }
    }
  }

  impl MarketDataProvider for FakeProvider {
    fn price_history(
      &self,
      symbols: &[String],
      _period: LookbackPeriod,
    ) -> anyhow::Result<Vec<PriceSeries>> {
      symbols
        .iter()
        .map(|s| {
          self
            .series
            .get(s)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no history for {s}"))
        })
        .collect()
    }

    fn market_history(&self, _period: LookbackPeriod) -> anyhow::Result<PriceSeries> {
      Ok(self.market.clone())
    }

    fn dividend_yields(&self, _symbols: &[String]) -> anyhow::Result<HashMap<String, f64>> {
      Ok(self.yields.clone())
    }

    fn fundamentals(&self, symbol: &str) -> anyhow::Result<FundamentalsRecord> {
      self
        .fundamentals
        .get(symbol)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("no fundamentals for {symbol}"))
    }
  }

  fn request(symbols: &[&str]) -> OptimizeRequest {
    OptimizeRequest {
      symbols: symbols.iter().map(|s| s.to_string()).collect(),
      investment_amount: 10_000.0,
      risk_tolerance: RiskTolerance::Moderate,
      period: LookbackPeriod::TwoYears,
      model: ReturnModel::Historical,
    }
  }

  #[test]
  fn moderate_optimization_respects_constraints() {
    let provider = FakeProvider::new(&[("AAA.AX", 0.10), ("BBB.AX", 0.06), ("CCC.AX", 0.14)]);
    let engine = PortfolioEngine::default();

    let result = engine
      .optimize(&provider, &request(&["AAA.AX", "BBB.AX", "CCC.AX"]))
      .unwrap();

    let sum: f64 = result.weights.iter().sum();
    assert!((sum - 1.0).abs() < 1e-6);
    for &w in &result.weights {
      assert!(w <= 0.40 + 1e-9);
      assert!(w >= 0.0);
    }
    assert!(result.weights.iter().filter(|&&w| w > 0.01).count() >= 3);

    let allocated: f64 = result.allocation_amounts.iter().sum();
    assert_relative_eq!(allocated, 10_000.0, epsilon = 1e-6);
    assert!(result.var_95 >= 0.0);
    assert!(result.volatility > 0.0);
    assert_eq!(result.max_single_weight, 0.40);
    assert!(matches!(result.diagnostics, ModelDiagnostics::Historical));
  }

  #[test]
  fn backtest_round_trips_the_estimates() {
    let provider = FakeProvider::new(&[("AAA.AX", 0.10), ("BBB.AX", 0.06), ("CCC.AX", 0.14)]);
    let engine = PortfolioEngine::default();

    let result = engine
      .optimize(&provider, &request(&["AAA.AX", "BBB.AX", "CCC.AX"]))
      .unwrap();

    let weights: Vec<(String, f64)> = result
      .symbols
      .iter()
      .cloned()
      .zip(result.weights.iter().copied())
      .collect();
    let report = engine
      .backtest(&provider, &weights, LookbackPeriod::TwoYears, 10_000.0)
      .unwrap();

    // Same window, same weights: the realized annualized return must land
    // near the estimator's expectation.
    assert!((report.annualized_return - result.expected_return).abs() < 0.02);
    assert!((report.annualized_volatility - result.volatility).abs() < 0.05);
  }

  #[test]
  fn malformed_requests_are_rejected_before_any_fetch() {
    let provider = FakeProvider::new(&[("AAA.AX", 0.10), ("BBB.AX", 0.06)]);
    let engine = PortfolioEngine::default();

    let single = request(&["AAA.AX"]);
    assert!(matches!(
      engine.optimize(&provider, &single),
      Err(EngineError::InvalidInput(_))
    ));

    let duplicated = request(&["AAA.AX", "AAA.AX"]);
    assert!(matches!(
      engine.optimize(&provider, &duplicated),
      Err(EngineError::InvalidInput(_))
    ));

    let bad_symbol = request(&["AAA.AX", "BBB.1"]);
    assert!(matches!(
      engine.optimize(&provider, &bad_symbol),
      Err(EngineError::InvalidInput(_))
    ));

    let mut tiny = request(&["AAA.AX", "BBB.AX"]);
    tiny.investment_amount = 50.0;
    assert!(matches!(
      engine.optimize(&provider, &tiny),
      Err(EngineError::InvalidInput(_))
    ));

    let mut huge = request(&["AAA.AX", "BBB.AX"]);
    huge.investment_amount = 20_000_000.0;
    assert!(matches!(
      engine.optimize(&provider, &huge),
      Err(EngineError::InvalidInput(_))
    ));
  }

  #[test]
  fn backtest_validates_before_any_fetch() {
    let provider = FakeProvider::new(&[("AAA.AX", 0.10), ("BBB.AX", 0.06)]);
    let engine = PortfolioEngine::default();

    let single = vec![("AAA.AX".to_string(), 1.0)];
    assert!(matches!(
      engine.backtest(&provider, &single, LookbackPeriod::TwoYears, 10_000.0),
      Err(EngineError::InvalidInput(_))
    ));

    let pair = vec![
      ("AAA.AX".to_string(), 0.5),
      ("BBB.AX".to_string(), 0.5),
    ];
    assert!(matches!(
      engine.backtest(&provider, &pair, LookbackPeriod::TwoYears, 5.0),
      Err(EngineError::InvalidInput(_))
    ));

    let malformed = vec![
      ("AAA.AX".to_string(), 0.5),
      ("BB B.AX".to_string(), 0.5),
    ];
    assert!(matches!(
      engine.backtest(&provider, &malformed, LookbackPeriod::TwoYears, 10_000.0),
      Err(EngineError::InvalidInput(_))
    ));
  }

  #[test]
  fn unknown_symbols_surface_as_data_unavailable() {
    let provider = FakeProvider::new(&[("AAA.AX", 0.10), ("BBB.AX", 0.06)]);
    let engine = PortfolioEngine::default();

    let err = engine
      .optimize(&provider, &request(&["AAA.AX", "BBB.AX", "ZZZ.AX"]))
      .unwrap_err();
    assert!(matches!(err, EngineError::DataUnavailable { .. }));
  }

  #[test]
  fn capm_model_attaches_regression_diagnostics() {
    let provider = FakeProvider::new(&[("AAA.AX", 0.10), ("BBB.AX", 0.06), ("CCC.AX", 0.14)]);
    let engine = PortfolioEngine::default();

    let mut req = request(&["AAA.AX", "BBB.AX", "CCC.AX"]);
    req.model = ReturnModel::Capm;
    let result = engine.optimize(&provider, &req).unwrap();

    match &result.diagnostics {
      ModelDiagnostics::Capm(stats) => {
        assert_eq!(stats.len(), 3);
        for s in stats {
          assert!(s.beta >= 0.1 && s.beta <= 3.0);
          // CAPM mu stays inside the band the beta clip implies.
          assert!(s.expected_return >= 0.035 + 0.1 * 0.06 - 1e-12);
          assert!(s.expected_return <= 0.035 + 3.0 * 0.06 + 1e-12);
        }
      }
      other => panic!("unexpected diagnostics: {other:?}"),
    }
  }

  #[test]
  fn fundamentals_model_scores_every_asset() {
    let mut provider =
      FakeProvider::new(&[("AAA.AX", 0.10), ("BBB.AX", 0.06), ("CCC.AX", 0.14)]);
    for symbol in ["AAA.AX", "BBB.AX", "CCC.AX"] {
      provider.fundamentals.insert(
        symbol.to_string(),
        FundamentalsRecord {
          symbol: symbol.to_string(),
          current_price: 100.0,
          earnings_yield: Some(0.06),
          return_on_equity: Some(0.15),
          ..FundamentalsRecord::default()
        },
      );
    }
    let engine = PortfolioEngine::default();

    let mut req = request(&["AAA.AX", "BBB.AX", "CCC.AX"]);
    req.model = ReturnModel::Fundamentals;
    let result = engine.optimize(&provider, &req).unwrap();

    match &result.diagnostics {
      ModelDiagnostics::Fundamentals(scores) => {
        assert_eq!(scores.len(), 3);
        for s in scores {
          assert!(s.composite >= 0.0 && s.composite <= 100.0);
          assert!(s.expected_return >= -0.05 && s.expected_return <= 0.25);
          assert!(s.defaulted_fields.contains(&"market_cap"));
        }
      }
      other => panic!("unexpected diagnostics: {other:?}"),
    }
  }

  #[test]
  fn missing_fundamentals_fail_the_call() {
    let provider = FakeProvider::new(&[("AAA.AX", 0.10), ("BBB.AX", 0.06), ("CCC.AX", 0.14)]);
    let engine = PortfolioEngine::default();

    let mut req = request(&["AAA.AX", "BBB.AX", "CCC.AX"]);
    req.model = ReturnModel::Fundamentals;

    let err = engine.optimize(&provider, &req).unwrap_err();
    match err {
      EngineError::DataUnavailable { symbol, .. } => assert_eq!(symbol, "AAA.AX"),
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn comparison_covers_all_three_tolerances() {
    let provider = FakeProvider::new(&[
      ("AAA.AX", 0.10),
      ("BBB.AX", 0.06),
      ("CCC.AX", 0.14),
      ("DDD.AX", 0.08),
    ]);
    let engine = PortfolioEngine::default();

    let comparison = engine
      .compare_strategies(
        &provider,
        &request(&["AAA.AX", "BBB.AX", "CCC.AX", "DDD.AX"]),
      )
      .unwrap();

    assert_eq!(comparison.results.len(), 3);
    let mut tolerances: Vec<String> = comparison
      .results
      .iter()
      .map(|r| r.risk_tolerance.to_string())
      .collect();
    tolerances.sort();
    assert_eq!(tolerances, ["aggressive", "conservative", "moderate"]);
    assert!(comparison.best_sharpe().is_some());
  }

  #[test]
  fn comparison_skips_infeasible_tolerances() {
    // Two assets: conservative (4) and moderate (3) cannot be satisfied.
    let provider = FakeProvider::new(&[("AAA.AX", 0.10), ("BBB.AX", 0.06)]);
    let engine = PortfolioEngine::default();

    let comparison = engine
      .compare_strategies(&provider, &request(&["AAA.AX", "BBB.AX"]))
      .unwrap();

    assert_eq!(comparison.results.len(), 1);
    assert_eq!(
      comparison.results[0].risk_tolerance,
      RiskTolerance::Aggressive
    );
  }

  #[test]
  fn frontier_is_produced_for_valid_requests() {
    let provider = FakeProvider::new(&[("AAA.AX", 0.10), ("BBB.AX", 0.06), ("CCC.AX", 0.14)]);
    let engine = PortfolioEngine::default();

    let frontier = engine
      .efficient_frontier(&provider, &request(&["AAA.AX", "BBB.AX", "CCC.AX"]))
      .unwrap();

    assert_eq!(frontier.len(), engine.config().frontier_points);
    for point in &frontier {
      assert!(point.volatility > 0.0);
    }
  }

  #[test]
  fn results_serialize_to_json() {
    let provider = FakeProvider::new(&[("AAA.AX", 0.10), ("BBB.AX", 0.06), ("CCC.AX", 0.14)]);
    let engine = PortfolioEngine::default();

    let result = engine
      .optimize(&provider, &request(&["AAA.AX", "BBB.AX", "CCC.AX"]))
      .unwrap();

    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("\"weights\""));
    assert!(json.contains("\"model\":\"historical\""));
  }

  #[test]
  fn symbol_validation_accepts_exchange_suffixes() {
    assert!(valid_symbol("BHP.AX"));
    assert!(valid_symbol("CBA.AX"));
    assert!(valid_symbol("MSFT"));
    assert!(!valid_symbol("BHP."));
    assert!(!valid_symbol(".AX"));
    assert!(!valid_symbol("BHP.1X"));
    assert!(!valid_symbol("BH P.AX"));
    assert!(!valid_symbol(""));
  }
}
