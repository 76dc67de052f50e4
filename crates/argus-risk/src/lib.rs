//! Portfolio risk and volatility analytics for Argus.
//!
//! Provides:
//! - [`PortfolioRiskEngine`]: beta, covariance-based volatility
//!   decomposition, parametric VaR, and concentration (HHI) metrics
//! - [`VolatilityAnalyzer`]: historical volatility and HV/IV divergence
//! - [`evaluate_alerts`]: threshold policy over computed metrics
//! - A bounded TTL cache so repeated portfolio queries within the cache
//!   window do not re-fetch market data

pub mod alerts;
pub mod cache;
pub mod config;
pub mod engine;
pub mod stats;
pub mod volatility;

pub use alerts::{evaluate_alerts, AlertLevel, AlertReport, RiskAlert};
pub use cache::{CacheStats, MetricsCache};
pub use config::{AlertThresholds, RiskEngineConfig};
pub use engine::{
    interpret_concentration, BetaReport, ConcentrationMetrics, HoldingWeight,
    PortfolioRiskEngine, RiskLevel, RiskSummary, VarReport, VolatilityReport,
};
pub use volatility::{DivergenceStatus, VolatilityAnalysis, VolatilityAnalyzer};
