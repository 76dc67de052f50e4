//! Risk engine configuration.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use argus_types::HistoryPeriod;

/// Alert threshold policy. All percentage thresholds are in percent
/// units (e.g. `25.0` means 25%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    pub beta_critical: f64,
    pub beta_warning: f64,
    pub volatility_critical: f64,
    pub volatility_warning: f64,
    /// 1-day VaR as percent of portfolio value.
    pub var_critical: f64,
    /// Price within this multiple of the stop loss counts as approaching.
    pub stop_loss_proximity: Decimal,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            beta_critical: 1.5,
            beta_warning: 1.3,
            volatility_critical: 35.0,
            volatility_warning: 25.0,
            var_critical: 4.0,
            stop_loss_proximity: Decimal::new(105, 2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEngineConfig {
    /// Symbol used as the market proxy for beta regression.
    pub benchmark: String,
    /// Lookback for beta, covariance, and volatility estimation.
    pub history_period: HistoryPeriod,
    /// Annualized risk-free rate used by the option pricer fallback.
    pub risk_free_rate: f64,
    /// How long computed metrics stay valid for identical queries.
    pub cache_ttl: Duration,
    /// HV/IV ratio band half-width before divergence is flagged.
    pub divergence_threshold: f64,
    pub thresholds: AlertThresholds,
}

impl Default for RiskEngineConfig {
    fn default() -> Self {
        Self {
            benchmark: "SPY".to_string(),
            history_period: HistoryPeriod::OneYear,
            risk_free_rate: 0.05,
            cache_ttl: Duration::from_secs(300),
            divergence_threshold: 0.20,
            thresholds: AlertThresholds::default(),
        }
    }
}
