//! Threshold alerts over computed portfolio metrics.
//!
//! Evaluation is pure: it consumes the reports the engine already
//! produced plus the valued positions, and never fetches data itself.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use argus_data::ValuedPosition;

use crate::config::AlertThresholds;
use crate::engine::{BetaReport, ConcentrationMetrics, VarReport, VolatilityReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAlert {
    pub id: Uuid,
    pub level: AlertLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl RiskAlert {
    pub fn new(level: AlertLevel, message: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            message,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertReport {
    /// Critical alerts first; insertion order preserved within a level.
    pub alerts: Vec<RiskAlert>,
    pub alert_count: usize,
    pub critical_count: usize,
    pub warning_count: usize,
}

/// Apply the threshold policy to a set of computed metrics.
///
/// Each rule fires at most one alert; a metric past the critical bound
/// does not also produce its warning-level alert.
pub fn evaluate_alerts(
    positions: &[ValuedPosition],
    concentration: &ConcentrationMetrics,
    beta: &BetaReport,
    volatility: &VolatilityReport,
    var: &VarReport,
    thresholds: &AlertThresholds,
) -> AlertReport {
    let mut alerts = Vec::new();

    for warning in &concentration.warnings {
        let level = if warning.contains("exceeds 10%") {
            AlertLevel::Critical
        } else {
            AlertLevel::Warning
        };
        alerts.push(RiskAlert::new(level, warning.clone()));
    }

    if beta.portfolio_beta > thresholds.beta_critical {
        alerts.push(RiskAlert::new(
            AlertLevel::Critical,
            format!(
                "Very high portfolio beta ({:.2}) - extreme market sensitivity",
                beta.portfolio_beta
            ),
        ));
    } else if beta.portfolio_beta > thresholds.beta_warning {
        alerts.push(RiskAlert::new(
            AlertLevel::Warning,
            format!(
                "High portfolio beta ({:.2}) - above-average market sensitivity",
                beta.portfolio_beta
            ),
        ));
    }

    if volatility.annualized_volatility_pct > thresholds.volatility_critical {
        alerts.push(RiskAlert::new(
            AlertLevel::Critical,
            format!(
                "Very high portfolio volatility ({:.1}% annualized)",
                volatility.annualized_volatility_pct
            ),
        ));
    } else if volatility.annualized_volatility_pct > thresholds.volatility_warning {
        alerts.push(RiskAlert::new(
            AlertLevel::Warning,
            format!(
                "Elevated portfolio volatility ({:.1}% annualized)",
                volatility.annualized_volatility_pct
            ),
        ));
    }

    if var.var_percent > thresholds.var_critical {
        alerts.push(RiskAlert::new(
            AlertLevel::Critical,
            format!(
                "{}-day VaR of {:.2}% exceeds {:.1}% of portfolio value",
                var.horizon_days, var.var_percent, thresholds.var_critical
            ),
        ));
    }

    for valued in positions {
        let (Some(price), Some(stop)) = (valued.current_price(), valued.position.stop_loss)
        else {
            continue;
        };
        if price <= stop {
            alerts.push(RiskAlert::new(
                AlertLevel::Critical,
                format!(
                    "{} has breached its stop loss (price {}, stop {})",
                    valued.position.symbol, price, stop
                ),
            ));
        } else if price <= stop * thresholds.stop_loss_proximity {
            alerts.push(RiskAlert::new(
                AlertLevel::Warning,
                format!(
                    "{} is approaching its stop loss (price {}, stop {})",
                    valued.position.symbol, price, stop
                ),
            ));
        }
    }

    // Stable: criticals surface first, original order kept within a level
    alerts.sort_by_key(|a| match a.level {
        AlertLevel::Critical => 0,
        AlertLevel::Warning => 1,
    });

    let critical_count = alerts
        .iter()
        .filter(|a| a.level == AlertLevel::Critical)
        .count();
    let warning_count = alerts.len() - critical_count;
    AlertReport {
        alert_count: alerts.len(),
        critical_count,
        warning_count,
        alerts,
    }
}

/// Stop-loss distance as a fraction of the stop, for display layers.
pub fn stop_loss_distance(price: Decimal, stop: Decimal) -> Option<Decimal> {
    if stop <= Decimal::ZERO {
        return None;
    }
    Some((price - stop) / stop)
}
