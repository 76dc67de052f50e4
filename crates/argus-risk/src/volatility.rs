//! Historical volatility and HV/IV divergence analysis.
//!
//! Historical volatility is the annualized sample standard deviation of
//! daily returns over a trailing window. Implied volatility is sampled
//! from the near-the-money call of an expiration 30–60 days out, taking
//! the quoted IV when the feed publishes one and solving from the mid
//! price otherwise. Both are reported in percent.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use argus_data::MarketDataGateway;
use argus_options::{implied_volatility, select_expiration, OptionChain};
use argus_types::daily_returns;

use crate::config::RiskEngineConfig;
use crate::stats::{round_to, sample_std, TRADING_DAYS_PER_YEAR};

/// How implied volatility sits relative to realized volatility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceStatus {
    Normal,
    IvElevated,
    IvDepressed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityAnalysis {
    pub symbol: String,
    /// 30-trading-day historical volatility, percent annualized.
    pub hv_30d: Option<f64>,
    /// 60-trading-day historical volatility, percent annualized.
    pub hv_60d: Option<f64>,
    /// Near-money implied volatility, percent.
    pub iv: Option<f64>,
    /// IV divided by 30-day HV, when both are available and HV is nonzero.
    pub iv_hv_ratio: Option<f64>,
    pub status: DivergenceStatus,
    pub recommendation: String,
}

/// Annualized historical volatility over the trailing `window` returns,
/// in percent. `None` when the series is shorter than the window.
///
/// A constant price series is a real observation, not missing data, so it
/// reports `Some(0.0)`.
pub fn historical_volatility(returns: &[f64], window: usize) -> Option<f64> {
    if window < 2 || returns.len() < window {
        return None;
    }
    let tail = &returns[returns.len() - window..];
    let annualized = sample_std(tail) * TRADING_DAYS_PER_YEAR.sqrt() * 100.0;
    Some(round_to(annualized, 2))
}

/// Near-money implied volatility from a chain, in percent.
///
/// Prefers the quoted IV on the nearest-strike call; when the feed omits
/// it, solves Black-Scholes from the contract's mid price.
pub fn near_money_iv(
    chain: &OptionChain,
    spot: Decimal,
    risk_free_rate: f64,
    today: NaiveDate,
) -> Option<f64> {
    let contract = chain.nearest_strike_call(spot)?;

    if let Some(iv) = contract.implied_volatility.filter(|iv| *iv > 0.0) {
        return Some(round_to(iv * 100.0, 2));
    }

    let market_price = contract.mid_price()?.to_f64()?;
    let time_to_expiry = (chain.expiration - today).num_days() as f64 / 365.0;
    let solved = implied_volatility(
        contract.kind,
        contract.strike.to_f64()?,
        market_price,
        spot.to_f64()?,
        risk_free_rate,
        time_to_expiry,
    )?;
    Some(round_to(solved * 100.0, 2))
}

pub struct VolatilityAnalyzer {
    gateway: Arc<dyn MarketDataGateway>,
    config: RiskEngineConfig,
}

impl VolatilityAnalyzer {
    pub fn new(gateway: Arc<dyn MarketDataGateway>, config: RiskEngineConfig) -> Self {
        Self { gateway, config }
    }

    /// Sample near-money IV for a symbol, in percent. `None` whenever the
    /// quote, expirations, or chain are unavailable; missing options data
    /// is expected for plenty of symbols and is not an error.
    pub async fn implied_volatility(&self, symbol: &str) -> Option<f64> {
        let quote = self.gateway.get_quote(symbol).await.ok()?;
        let expirations = self.gateway.get_expirations(symbol).await.ok()?;
        let today = Utc::now().date_naive();
        let expiration = select_expiration(&expirations, today)?;
        let chain = self
            .gateway
            .get_option_chain(symbol, expiration)
            .await
            .ok()?;
        near_money_iv(&chain, quote.price, self.config.risk_free_rate, today)
    }

    /// Compare implied against realized volatility for one symbol.
    ///
    /// Always produces an analysis record: fields the data cannot support
    /// come back `None` and the recommendation says so.
    pub async fn divergence(&self, symbol: &str) -> VolatilityAnalysis {
        let symbol = symbol.to_uppercase();

        let returns: Vec<f64> = match self
            .gateway
            .get_history(&symbol, self.config.history_period)
            .await
        {
            Ok(bars) => daily_returns(&bars).into_iter().map(|(_, r)| r).collect(),
            Err(e) => {
                debug!(%symbol, error = %e, "no history for volatility analysis");
                Vec::new()
            }
        };

        let hv_30d = historical_volatility(&returns, 30);
        let hv_60d = historical_volatility(&returns, 60);
        let iv = self.implied_volatility(&symbol).await;

        let (iv_hv_ratio, status, recommendation) = self.classify(hv_30d, iv);

        VolatilityAnalysis {
            symbol,
            hv_30d,
            hv_60d,
            iv,
            iv_hv_ratio,
            status,
            recommendation,
        }
    }

    fn classify(
        &self,
        hv_30d: Option<f64>,
        iv: Option<f64>,
    ) -> (Option<f64>, DivergenceStatus, String) {
        let (Some(hv), Some(iv)) = (hv_30d, iv) else {
            return (
                None,
                DivergenceStatus::Normal,
                "Insufficient data to compare implied and historical volatility".to_string(),
            );
        };
        if hv <= 0.0 {
            return (
                None,
                DivergenceStatus::Normal,
                "Realized volatility is zero; implied comparison not meaningful".to_string(),
            );
        }

        let ratio = round_to(iv / hv, 2);
        let high = 1.0 + self.config.divergence_threshold;
        let low = 1.0 - self.config.divergence_threshold;

        if ratio > high {
            (
                Some(ratio),
                DivergenceStatus::IvElevated,
                "Implied volatility is elevated vs realized - options are expensive, favor selling premium".to_string(),
            )
        } else if ratio < low {
            (
                Some(ratio),
                DivergenceStatus::IvDepressed,
                "Implied volatility is depressed vs realized - options are cheap, favor buying options".to_string(),
            )
        } else {
            (
                Some(ratio),
                DivergenceStatus::Normal,
                "Implied and realized volatility are in line".to_string(),
            )
        }
    }
}
