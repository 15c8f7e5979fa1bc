//! # markowitz-rs
//!
//! $$
//! \mathbf{w}^* = \arg\max_{\mathbf{w}}
//! \frac{\mathbf{w}^\top\mu - r_f}{\sqrt{\mathbf{w}^\top\Sigma\,\mathbf{w}}}
//! \quad \text{s.t.} \quad \textstyle\sum_i w_i = 1,\ 0 \le w_i \le w_{\max}
//! $$
//!
//! Mean-variance portfolio optimization engine. Price histories come in
//! through the [`MarketDataProvider`] seam; expected returns are estimated
//! under one of three models (historical geometric means, CAPM regressions,
//! or fundamentals factor scores), the covariance always from realized
//! history; a Nelder-Mead solve under risk-profile box constraints produces
//! the Sharpe-optimal weights, which are reported together with risk
//! metrics, model diagnostics and an optional buy-and-hold backtest.
//!
//! ```no_run
//! use markowitz_rs::{OptimizeRequest, PortfolioEngine, ReturnModel};
//! use markowitz_rs::types::{LookbackPeriod, RiskTolerance};
//!
//! # fn demo(provider: &impl markowitz_rs::MarketDataProvider) -> anyhow::Result<()> {
//! let engine = PortfolioEngine::default();
//! let request = OptimizeRequest {
//!   symbols: vec!["BHP.AX".into(), "CBA.AX".into(), "CSL.AX".into()],
//!   investment_amount: 10_000.0,
//!   risk_tolerance: RiskTolerance::Moderate,
//!   period: LookbackPeriod::TwoYears,
//!   model: ReturnModel::Historical,
//! };
//! let result = engine.optimize(provider, &request)?;
//! println!("sharpe: {:.2}", result.sharpe_ratio);
//! # Ok(())
//! # }
//! ```

pub mod backtest;
pub mod capm;
pub mod engine;
pub mod error;
pub mod fundamentals;
pub mod optimizer;
pub mod provider;
pub mod risk;
pub mod stats;
pub mod types;

pub use backtest::BacktestReport;
pub use capm::CapmStats;
pub use engine::EngineConfig;
pub use engine::OptimizeRequest;
pub use engine::PortfolioEngine;
pub use engine::ReturnModel;
pub use engine::StrategyComparison;
pub use error::EngineError;
pub use fundamentals::FactorScores;
pub use optimizer::FrontierPoint;
pub use provider::MarketDataProvider;
pub use risk::RiskSummary;
pub use types::OptimizationResult;
pub use types::PriceSeries;
