//! Portfolio-level risk metrics: beta, volatility decomposition,
//! parametric VaR, concentration, and the combined risk summary.
//!
//! Every public operation takes the ephemeral weighted holdings produced
//! by the valuation pass and fetches market data per symbol concurrently.
//! A symbol whose data is missing degrades (zero beta contribution, zero
//! return row) rather than failing the portfolio-wide computation;
//! structural problems (empty portfolio, too few overlapping observations)
//! surface as typed errors.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use argus_data::{value_positions, MarketDataGateway};
use argus_types::{
    daily_returns, total_value, weights, EngineError, HistoryPeriod, Position, WeightedHolding,
};

use crate::cache::{CacheStats, MetricsCache};
use crate::config::RiskEngineConfig;
use crate::stats::{
    covariance_matrix, inverse_normal_cdf, mat_vec, quadratic_form, round_to, sample_covariance,
    sample_variance, TRADING_DAYS_PER_YEAR,
};

/// Minimum overlapping daily observations for covariance and regression.
pub const MIN_OBSERVATIONS: usize = 20;

// ---------- reports ----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetaReport {
    /// Value-weighted portfolio beta, rounded to 3 decimals.
    pub portfolio_beta: f64,
    pub benchmark: String,
    /// Per-symbol beta: published, regressed, or `None` when neither was
    /// possible. `None` symbols contribute zero to the weighted sum.
    pub position_betas: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityReport {
    /// Annualized portfolio volatility, percent.
    pub annualized_volatility_pct: f64,
    /// Per-symbol annualized volatility, percent. Symbols without history
    /// carried a zero return row and report 0.
    pub position_volatility_pct: BTreeMap<String, f64>,
    /// Share of total portfolio variance attributed to each symbol,
    /// normalized to sum to 100 when variance is positive.
    pub risk_contribution_pct: BTreeMap<String, f64>,
    /// Overlapping daily observations the covariance was estimated from.
    pub trading_days_used: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarReport {
    pub confidence: f64,
    pub horizon_days: u32,
    /// Loss threshold as percent of portfolio value.
    pub var_percent: f64,
    /// Loss threshold in currency terms.
    pub var_amount: Decimal,
    pub portfolio_value: Decimal,
    pub interpretation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingWeight {
    pub symbol: String,
    pub market_value: Decimal,
    pub weight_percent: f64,
    pub sector: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationMetrics {
    /// Largest holdings first, at most ten.
    pub top_holdings: Vec<HoldingWeight>,
    /// Percent of portfolio value per sector. Symbols without a sector
    /// classification land under "Unknown".
    pub sector_allocation: BTreeMap<String, f64>,
    /// Herfindahl-Hirschman index over percentage weights (0..10000).
    pub hhi: f64,
    /// HHI rescaled so an equal-weight portfolio scores 0 and a single
    /// holding scores 100.
    pub concentration_score: f64,
    pub assessment: String,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub portfolio_value: Decimal,
    pub positions_count: usize,
    pub portfolio_beta: f64,
    pub annualized_volatility_pct: f64,
    pub var_95_percent: f64,
    pub var_95_amount: Decimal,
    pub risk_level: RiskLevel,
    pub warnings: Vec<String>,
}

/// Plain-language reading of a 0..100 concentration score.
pub fn interpret_concentration(score: f64) -> &'static str {
    if score < 20.0 {
        "Well diversified"
    } else if score < 40.0 {
        "Moderately diversified"
    } else if score < 60.0 {
        "Concentrated"
    } else {
        "Highly concentrated"
    }
}

// ---------- engine ----------

pub struct PortfolioRiskEngine {
    gateway: Arc<dyn MarketDataGateway>,
    config: RiskEngineConfig,
    cache: MetricsCache,
}

impl PortfolioRiskEngine {
    pub fn new(gateway: Arc<dyn MarketDataGateway>, config: RiskEngineConfig) -> Self {
        let cache = MetricsCache::new(config.cache_ttl);
        Self {
            gateway,
            config,
            cache,
        }
    }

    pub fn gateway(&self) -> Arc<dyn MarketDataGateway> {
        Arc::clone(&self.gateway)
    }

    pub fn config(&self) -> &RiskEngineConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Value-weighted portfolio beta against the configured benchmark.
    ///
    /// Each symbol's beta is the feed-published value when present, else a
    /// regression of its daily returns on the benchmark's over the
    /// configured lookback. Symbols with neither contribute zero without
    /// renormalizing the remaining weights.
    pub async fn portfolio_beta(
        &self,
        holdings: &[WeightedHolding],
    ) -> Result<BetaReport, EngineError> {
        let w = weights(holdings)?;

        let key = MetricsCache::key("beta", &self.config.benchmark, holdings);
        if let Some(cached) = self.cache.get::<BetaReport>(&key) {
            return Ok(cached);
        }

        let benchmark_returns: Arc<BTreeMap<NaiveDate, f64>> = Arc::new(
            match self
                .gateway
                .get_history(&self.config.benchmark, self.config.history_period)
                .await
            {
                Ok(bars) => daily_returns(&bars).into_iter().collect(),
                Err(e) => {
                    warn!(
                        benchmark = %self.config.benchmark,
                        error = %e,
                        "benchmark history unavailable, regression fallback disabled"
                    );
                    BTreeMap::new()
                }
            },
        );

        let period = self.config.history_period;
        let mut tasks: JoinSet<(usize, Option<f64>)> = JoinSet::new();
        for (idx, holding) in holdings.iter().enumerate() {
            let gateway = Arc::clone(&self.gateway);
            let benchmark_returns = Arc::clone(&benchmark_returns);
            let symbol = holding.symbol.clone();
            tasks.spawn(async move {
                if let Ok(quote) = gateway.get_quote(&symbol).await {
                    if let Some(beta) = quote.beta.filter(|b| b.is_finite()) {
                        return (idx, Some(beta));
                    }
                }
                let beta = match gateway.get_history(&symbol, period).await {
                    Ok(bars) => {
                        let stock: BTreeMap<NaiveDate, f64> =
                            daily_returns(&bars).into_iter().collect();
                        regression_beta(&stock, &benchmark_returns)
                    }
                    Err(_) => None,
                };
                if beta.is_none() {
                    debug!(%symbol, "no beta available, contributes zero");
                }
                (idx, beta)
            });
        }

        let mut betas: Vec<Option<f64>> = vec![None; holdings.len()];
        while let Some(joined) = tasks.join_next().await {
            if let Ok((idx, beta)) = joined {
                betas[idx] = beta;
            }
        }

        let portfolio_beta = round_to(
            w.iter()
                .zip(&betas)
                .map(|(wi, beta)| wi * beta.unwrap_or(0.0))
                .sum(),
            3,
        );
        let position_betas = holdings
            .iter()
            .zip(&betas)
            .map(|(h, beta)| (h.symbol.clone(), beta.map(|b| round_to(b, 3))))
            .collect();

        let report = BetaReport {
            portfolio_beta,
            benchmark: self.config.benchmark.clone(),
            position_betas,
        };
        self.cache.insert(&key, &report);
        Ok(report)
    }

    /// Annualized portfolio volatility from the full sample covariance of
    /// date-aligned daily returns, with a per-symbol risk decomposition.
    pub async fn portfolio_volatility(
        &self,
        holdings: &[WeightedHolding],
        period: HistoryPeriod,
    ) -> Result<VolatilityReport, EngineError> {
        let w = weights(holdings)?;

        let key = MetricsCache::key("volatility", &period.to_string(), holdings);
        if let Some(cached) = self.cache.get::<VolatilityReport>(&key) {
            return Ok(cached);
        }

        let series = self.fetch_return_series(holdings, period).await;

        // Align on the dates every symbol with data actually traded
        let mut common: Option<BTreeSet<NaiveDate>> = None;
        for map in series.iter().filter(|m| !m.is_empty()) {
            let dates: BTreeSet<NaiveDate> = map.keys().copied().collect();
            common = Some(match common {
                None => dates,
                Some(acc) => acc.intersection(&dates).copied().collect(),
            });
        }
        let common = common.ok_or(EngineError::InsufficientData {
            needed: MIN_OBSERVATIONS,
            got: 0,
        })?;
        if common.len() < MIN_OBSERVATIONS {
            return Err(EngineError::InsufficientData {
                needed: MIN_OBSERVATIONS,
                got: common.len(),
            });
        }

        let dates: Vec<NaiveDate> = common.into_iter().collect();
        let rows: Vec<Vec<f64>> = series
            .iter()
            .map(|map| {
                if map.is_empty() {
                    vec![0.0; dates.len()]
                } else {
                    dates
                        .iter()
                        .map(|d| map.get(d).copied().unwrap_or(0.0))
                        .collect()
                }
            })
            .collect();

        let cov = covariance_matrix(&rows);
        let variance = quadratic_form(&cov, &w).max(0.0);
        let annualized = (variance * TRADING_DAYS_PER_YEAR).sqrt() * 100.0;

        let position_volatility_pct = holdings
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let vol = (cov[i][i] * TRADING_DAYS_PER_YEAR).sqrt() * 100.0;
                (h.symbol.clone(), round_to(vol, 2))
            })
            .collect();

        // Component contribution w_i (Cov w)_i sums to the portfolio
        // variance, so dividing by it yields shares summing to 100
        let cov_w = mat_vec(&cov, &w);
        let risk_contribution_pct = holdings
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let share = if variance > 0.0 {
                    w[i] * cov_w[i] / variance * 100.0
                } else {
                    0.0
                };
                (h.symbol.clone(), round_to(share, 2))
            })
            .collect();

        let report = VolatilityReport {
            annualized_volatility_pct: round_to(annualized, 2),
            position_volatility_pct,
            risk_contribution_pct,
            trading_days_used: dates.len(),
        };
        self.cache.insert(&key, &report);
        Ok(report)
    }

    /// Parametric (variance-covariance) value at risk.
    ///
    /// `confidence` is a fraction in (0, 1); `horizon_days` is in trading
    /// days and scales by the square root of time.
    pub async fn value_at_risk(
        &self,
        holdings: &[WeightedHolding],
        confidence: f64,
        horizon_days: u32,
    ) -> Result<VarReport, EngineError> {
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(EngineError::InvalidInput(format!(
                "confidence must be in (0, 1), got {confidence}"
            )));
        }
        if horizon_days == 0 {
            return Err(EngineError::InvalidInput(
                "horizon must be at least one day".to_string(),
            ));
        }

        let params = format!("{}:{}", confidence, horizon_days);
        let key = MetricsCache::key("var", &params, holdings);
        if let Some(cached) = self.cache.get::<VarReport>(&key) {
            return Ok(cached);
        }

        let volatility = self
            .portfolio_volatility(holdings, self.config.history_period)
            .await?;

        let daily_vol =
            volatility.annualized_volatility_pct / 100.0 / TRADING_DAYS_PER_YEAR.sqrt();
        let z = inverse_normal_cdf(confidence);
        let var_percent = round_to(z * daily_vol * (horizon_days as f64).sqrt() * 100.0, 2);

        let portfolio_value = total_value(holdings);
        let var_amount = Decimal::from_f64(
            portfolio_value.to_f64().unwrap_or(0.0) * var_percent / 100.0,
        )
        .unwrap_or_default()
        .round_dp(2);

        let report = VarReport {
            confidence,
            horizon_days,
            var_percent,
            var_amount,
            portfolio_value,
            interpretation: format!(
                "With {:.0}% confidence, losses should not exceed {:.2}% (${}) over {} trading day(s)",
                confidence * 100.0,
                var_percent,
                var_amount,
                horizon_days
            ),
        };
        self.cache.insert(&key, &report);
        Ok(report)
    }

    /// Position and sector concentration via the Herfindahl-Hirschman
    /// index, with allocation warnings.
    pub async fn concentration_metrics(
        &self,
        holdings: &[WeightedHolding],
    ) -> Result<ConcentrationMetrics, EngineError> {
        let w = weights(holdings)?;

        let key = MetricsCache::key("concentration", "", holdings);
        if let Some(cached) = self.cache.get::<ConcentrationMetrics>(&key) {
            return Ok(cached);
        }

        let sectors = self.fetch_sectors(holdings).await;

        let mut entries: Vec<HoldingWeight> = holdings
            .iter()
            .enumerate()
            .map(|(i, h)| HoldingWeight {
                symbol: h.symbol.clone(),
                market_value: h.market_value.round_dp(2),
                weight_percent: round_to(w[i] * 100.0, 2),
                sector: sectors[i].clone().unwrap_or_else(|| "Unknown".to_string()),
            })
            .collect();
        entries.sort_by(|a, b| {
            b.weight_percent
                .partial_cmp(&a.weight_percent)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let hhi_raw: f64 = w.iter().map(|wi| (wi * 100.0).powi(2)).sum();
        let n = holdings.len();
        let concentration_score = if n == 1 {
            100.0
        } else {
            let min_hhi = 10_000.0 / n as f64;
            round_to(
                ((hhi_raw - min_hhi) / (10_000.0 - min_hhi) * 100.0).clamp(0.0, 100.0),
                2,
            )
        };

        let mut sector_allocation: BTreeMap<String, f64> = BTreeMap::new();
        for entry in &entries {
            *sector_allocation.entry(entry.sector.clone()).or_default() += entry.weight_percent;
        }
        for pct in sector_allocation.values_mut() {
            *pct = round_to(*pct, 2);
        }

        let mut warnings = Vec::new();
        for entry in &entries {
            if entry.weight_percent > 10.0 {
                warnings.push(format!(
                    "{} exceeds 10% allocation ({:.1}%)",
                    entry.symbol, entry.weight_percent
                ));
            } else if entry.weight_percent > 5.0 {
                warnings.push(format!(
                    "{} exceeds 5% allocation ({:.1}%)",
                    entry.symbol, entry.weight_percent
                ));
            }
        }
        for (sector, pct) in &sector_allocation {
            // Unclassified symbols are not a real sector bet
            if sector != "Unknown" && *pct > 40.0 {
                warnings.push(format!(
                    "Sector concentration: {} is {:.1}% of portfolio",
                    sector, pct
                ));
            }
        }

        entries.truncate(10);
        let report = ConcentrationMetrics {
            top_holdings: entries,
            sector_allocation,
            hhi: round_to(hhi_raw, 2),
            concentration_score,
            assessment: interpret_concentration(concentration_score).to_string(),
            warnings,
        };
        self.cache.insert(&key, &report);
        Ok(report)
    }

    /// Value the positions and combine beta, volatility, and 1-day 95% VaR
    /// into a single headline summary.
    pub async fn risk_summary(&self, positions: &[Position]) -> Result<RiskSummary, EngineError> {
        if positions.is_empty() {
            return Err(EngineError::EmptyPortfolio);
        }

        let valuation = value_positions(self.gateway(), positions).await;
        let holdings = valuation.holdings();

        let beta = self.portfolio_beta(&holdings).await?;
        let volatility = self
            .portfolio_volatility(&holdings, self.config.history_period)
            .await?;
        let var = self.value_at_risk(&holdings, 0.95, 1).await?;

        let risk_level = if var.var_percent > 3.0 {
            RiskLevel::High
        } else if var.var_percent > 2.0 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        };

        let mut warnings = Vec::new();
        if beta.portfolio_beta > 1.3 {
            warnings.push(format!(
                "High portfolio beta ({:.2}) amplifies market moves",
                beta.portfolio_beta
            ));
        } else if beta.portfolio_beta < 0.7 && beta.portfolio_beta > 0.0 {
            warnings.push(format!(
                "Low portfolio beta ({:.2}) may lag a rising market",
                beta.portfolio_beta
            ));
        }
        if volatility.annualized_volatility_pct > 30.0 {
            warnings.push(format!(
                "Portfolio volatility is very high ({:.1}%)",
                volatility.annualized_volatility_pct
            ));
        } else if volatility.annualized_volatility_pct > 20.0 {
            warnings.push(format!(
                "Portfolio volatility is elevated ({:.1}%)",
                volatility.annualized_volatility_pct
            ));
        }

        Ok(RiskSummary {
            portfolio_value: valuation.total_value().round_dp(2),
            positions_count: positions.len(),
            portfolio_beta: beta.portfolio_beta,
            annualized_volatility_pct: volatility.annualized_volatility_pct,
            var_95_percent: var.var_percent,
            var_95_amount: var.var_amount,
            risk_level,
            warnings,
        })
    }

    async fn fetch_return_series(
        &self,
        holdings: &[WeightedHolding],
        period: HistoryPeriod,
    ) -> Vec<BTreeMap<NaiveDate, f64>> {
        let mut tasks: JoinSet<(usize, BTreeMap<NaiveDate, f64>)> = JoinSet::new();
        for (idx, holding) in holdings.iter().enumerate() {
            let gateway = Arc::clone(&self.gateway);
            let symbol = holding.symbol.clone();
            tasks.spawn(async move {
                let map = match gateway.get_history(&symbol, period).await {
                    Ok(bars) => daily_returns(&bars).into_iter().collect(),
                    Err(e) => {
                        warn!(%symbol, error = %e, "history unavailable, symbol carries zero returns");
                        BTreeMap::new()
                    }
                };
                (idx, map)
            });
        }

        let mut series = vec![BTreeMap::new(); holdings.len()];
        while let Some(joined) = tasks.join_next().await {
            if let Ok((idx, map)) = joined {
                series[idx] = map;
            }
        }
        series
    }

    async fn fetch_sectors(&self, holdings: &[WeightedHolding]) -> Vec<Option<String>> {
        let mut tasks: JoinSet<(usize, Option<String>)> = JoinSet::new();
        for (idx, holding) in holdings.iter().enumerate() {
            let gateway = Arc::clone(&self.gateway);
            let symbol = holding.symbol.clone();
            tasks.spawn(async move {
                let sector = gateway
                    .get_quote(&symbol)
                    .await
                    .ok()
                    .and_then(|q| q.sector);
                (idx, sector)
            });
        }

        let mut sectors = vec![None; holdings.len()];
        while let Some(joined) = tasks.join_next().await {
            if let Ok((idx, sector)) = joined {
                sectors[idx] = sector;
            }
        }
        sectors
    }
}

/// Regression beta: cov(stock, benchmark) / var(benchmark) over the dates
/// both series observed. `None` below [`MIN_OBSERVATIONS`] overlapping
/// points or for a flat benchmark.
fn regression_beta(
    stock: &BTreeMap<NaiveDate, f64>,
    benchmark: &BTreeMap<NaiveDate, f64>,
) -> Option<f64> {
    let mut s = Vec::new();
    let mut b = Vec::new();
    for (date, ret) in stock {
        if let Some(bret) = benchmark.get(date) {
            s.push(*ret);
            b.push(*bret);
        }
    }
    if s.len() < MIN_OBSERVATIONS {
        return None;
    }
    let var_b = sample_variance(&b);
    if var_b <= 0.0 {
        return None;
    }
    Some(sample_covariance(&s, &b) / var_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_data::FixtureGateway;
    use argus_types::{DailyBar, Quote};
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Bars on consecutive dates from a starting price and daily returns.
    fn bars_from_returns(start_price: f64, returns: &[f64]) -> Vec<DailyBar> {
        let mut price = start_price;
        let mut bars = vec![DailyBar::new(
            d(2025, 1, 1),
            Decimal::from_f64(price).unwrap(),
        )];
        for (i, r) in returns.iter().enumerate() {
            price *= 1.0 + r;
            bars.push(DailyBar::new(
                d(2025, 1, 1) + chrono::Duration::days(i as i64 + 1),
                Decimal::from_f64(price).unwrap().round_dp(8),
            ));
        }
        bars
    }

    /// A varying but deterministic return pattern.
    fn pattern(n: usize, scale: f64) -> Vec<f64> {
        (0..n)
            .map(|i| scale * ((i % 5) as f64 - 2.0) / 100.0)
            .collect()
    }

    fn engine(gateway: FixtureGateway) -> PortfolioRiskEngine {
        PortfolioRiskEngine::new(Arc::new(gateway), RiskEngineConfig::default())
    }

    fn equal_holdings(symbols: &[&str]) -> Vec<WeightedHolding> {
        symbols
            .iter()
            .map(|s| WeightedHolding::new(s, dec!(1000)))
            .collect()
    }

    // ----- beta -----

    #[tokio::test]
    async fn test_beta_from_published_quotes() {
        let gw = FixtureGateway::new()
            .with_quote(Quote::new("AAPL", dec!(100)).with_beta(1.2))
            .with_quote(Quote::new("MSFT", dec!(100)).with_beta(0.8));
        let report = engine(gw)
            .portfolio_beta(&equal_holdings(&["AAPL", "MSFT"]))
            .await
            .unwrap();
        assert!((report.portfolio_beta - 1.0).abs() < 1e-9);
        assert_eq!(report.position_betas["AAPL"], Some(1.2));
        assert_eq!(report.benchmark, "SPY");
    }

    #[tokio::test]
    async fn test_beta_missing_symbol_contributes_zero() {
        let gw = FixtureGateway::new().with_quote(Quote::new("AAPL", dec!(100)).with_beta(1.2));
        let report = engine(gw)
            .portfolio_beta(&equal_holdings(&["AAPL", "ZZZZ"]))
            .await
            .unwrap();
        // 0.5 * 1.2 + 0.5 * 0; weights are not renormalized
        assert!((report.portfolio_beta - 0.6).abs() < 1e-9);
        assert_eq!(report.position_betas["ZZZZ"], None);
    }

    #[tokio::test]
    async fn test_beta_regression_fallback() {
        // Stock returns exactly double the benchmark's: beta 2
        let bench_returns = pattern(40, 1.0);
        let stock_returns: Vec<f64> = bench_returns.iter().map(|r| 2.0 * r).collect();
        let gw = FixtureGateway::new()
            .with_history("SPY", bars_from_returns(400.0, &bench_returns))
            .with_history("AAPL", bars_from_returns(150.0, &stock_returns));
        let report = engine(gw)
            .portfolio_beta(&equal_holdings(&["AAPL"]))
            .await
            .unwrap();
        assert!(
            (report.portfolio_beta - 2.0).abs() < 0.01,
            "beta = {}",
            report.portfolio_beta
        );
    }

    #[tokio::test]
    async fn test_beta_insufficient_overlap_is_none() {
        // Only 10 overlapping observations, below the minimum
        let gw = FixtureGateway::new()
            .with_history("SPY", bars_from_returns(400.0, &pattern(10, 1.0)))
            .with_history("AAPL", bars_from_returns(150.0, &pattern(10, 2.0)));
        let report = engine(gw)
            .portfolio_beta(&equal_holdings(&["AAPL"]))
            .await
            .unwrap();
        assert_eq!(report.position_betas["AAPL"], None);
        assert_eq!(report.portfolio_beta, 0.0);
    }

    #[tokio::test]
    async fn test_beta_empty_portfolio() {
        assert_eq!(
            engine(FixtureGateway::new())
                .portfolio_beta(&[])
                .await
                .unwrap_err(),
            EngineError::EmptyPortfolio
        );
    }

    // ----- volatility -----

    #[tokio::test]
    async fn test_volatility_single_asset_matches_series_vol() {
        let returns = pattern(60, 1.0);
        let gw = FixtureGateway::new().with_history("AAPL", bars_from_returns(150.0, &returns));
        let report = engine(gw)
            .portfolio_volatility(&equal_holdings(&["AAPL"]), HistoryPeriod::OneYear)
            .await
            .unwrap();

        assert_eq!(report.trading_days_used, 60);
        // Single asset: portfolio vol equals the position's own vol
        assert_eq!(
            report.annualized_volatility_pct,
            report.position_volatility_pct["AAPL"]
        );
        assert!((report.risk_contribution_pct["AAPL"] - 100.0).abs() < 1e-9);
        assert!(report.annualized_volatility_pct > 0.0);
    }

    #[tokio::test]
    async fn test_volatility_insufficient_data() {
        let gw = FixtureGateway::new().with_history("AAPL", bars_from_returns(150.0, &pattern(10, 1.0)));
        let err = engine(gw)
            .portfolio_volatility(&equal_holdings(&["AAPL"]), HistoryPeriod::OneYear)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientData {
                needed: MIN_OBSERVATIONS,
                got: 10
            }
        );
    }

    #[tokio::test]
    async fn test_volatility_no_data_at_all() {
        let err = engine(FixtureGateway::new())
            .portfolio_volatility(&equal_holdings(&["AAPL"]), HistoryPeriod::OneYear)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientData {
                needed: MIN_OBSERVATIONS,
                got: 0
            }
        );
    }

    #[tokio::test]
    async fn test_volatility_missing_symbol_carries_zero_row() {
        let returns = pattern(60, 1.0);
        let gw = FixtureGateway::new().with_history("AAPL", bars_from_returns(150.0, &returns));
        let holdings = equal_holdings(&["AAPL", "ZZZZ"]);
        let report = engine(gw)
            .portfolio_volatility(&holdings, HistoryPeriod::OneYear)
            .await
            .unwrap();

        assert_eq!(report.position_volatility_pct["ZZZZ"], 0.0);
        assert_eq!(report.risk_contribution_pct["ZZZZ"], 0.0);
        assert!((report.risk_contribution_pct["AAPL"] - 100.0).abs() < 1e-9);
        // Half the weight in a zero-variance sleeve halves the vol
        let single = engine(
            FixtureGateway::new().with_history("AAPL", bars_from_returns(150.0, &returns)),
        );
        let solo = single
            .portfolio_volatility(&equal_holdings(&["AAPL"]), HistoryPeriod::OneYear)
            .await
            .unwrap();
        assert!(
            (report.annualized_volatility_pct - solo.annualized_volatility_pct / 2.0).abs() < 0.01
        );
    }

    #[tokio::test]
    async fn test_volatility_contributions_sum_to_100() {
        let gw = FixtureGateway::new()
            .with_history("AAPL", bars_from_returns(150.0, &pattern(60, 1.0)))
            .with_history("MSFT", bars_from_returns(300.0, &pattern(60, 0.5)));
        let report = engine(gw)
            .portfolio_volatility(&equal_holdings(&["AAPL", "MSFT"]), HistoryPeriod::OneYear)
            .await
            .unwrap();
        let sum: f64 = report.risk_contribution_pct.values().sum();
        assert!((sum - 100.0).abs() < 0.05, "contributions sum = {sum}");
    }

    // ----- VaR -----

    async fn var_engine() -> PortfolioRiskEngine {
        let gw = FixtureGateway::new().with_history("AAPL", bars_from_returns(150.0, &pattern(60, 1.0)));
        engine(gw)
    }

    #[tokio::test]
    async fn test_var_monotonic_in_confidence() {
        let e = var_engine().await;
        let holdings = equal_holdings(&["AAPL"]);
        let var95 = e.value_at_risk(&holdings, 0.95, 1).await.unwrap();
        let var99 = e.value_at_risk(&holdings, 0.99, 1).await.unwrap();
        assert!(var99.var_percent > var95.var_percent);
        assert!(var99.var_amount > var95.var_amount);
    }

    #[tokio::test]
    async fn test_var_monotonic_in_horizon() {
        let e = var_engine().await;
        let holdings = equal_holdings(&["AAPL"]);
        let one = e.value_at_risk(&holdings, 0.95, 1).await.unwrap();
        let five = e.value_at_risk(&holdings, 0.95, 5).await.unwrap();
        assert!(five.var_percent > one.var_percent);
        // √5 scaling, up to rounding
        assert!((five.var_percent - one.var_percent * 5f64.sqrt()).abs() < 0.05);
    }

    #[tokio::test]
    async fn test_var_amount_consistent_with_percent() {
        let e = var_engine().await;
        let holdings = vec![WeightedHolding::new("AAPL", dec!(10000))];
        let var = e.value_at_risk(&holdings, 0.95, 1).await.unwrap();
        let expected = 10000.0 * var.var_percent / 100.0;
        let amount = var.var_amount.to_f64().unwrap();
        assert!((amount - expected).abs() < 0.01);
        assert!(var.interpretation.contains("95%"));
    }

    #[tokio::test]
    async fn test_var_rejects_bad_inputs() {
        let e = var_engine().await;
        let holdings = equal_holdings(&["AAPL"]);
        assert!(matches!(
            e.value_at_risk(&holdings, 1.0, 1).await,
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            e.value_at_risk(&holdings, 0.0, 1).await,
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            e.value_at_risk(&holdings, 0.95, 0).await,
            Err(EngineError::InvalidInput(_))
        ));
    }

    // ----- concentration -----

    #[tokio::test]
    async fn test_hhi_equal_weights() {
        let report = engine(FixtureGateway::new())
            .concentration_metrics(&equal_holdings(&["A", "B", "C", "D", "E"]))
            .await
            .unwrap();
        assert_eq!(report.hhi, 2000.0);
        assert_eq!(report.concentration_score, 0.0);
        assert_eq!(report.assessment, "Well diversified");
    }

    #[tokio::test]
    async fn test_single_holding_scores_100() {
        let report = engine(FixtureGateway::new())
            .concentration_metrics(&equal_holdings(&["AAPL"]))
            .await
            .unwrap();
        assert_eq!(report.hhi, 10000.0);
        assert_eq!(report.concentration_score, 100.0);
        assert_eq!(report.assessment, "Highly concentrated");
    }

    #[tokio::test]
    async fn test_allocation_warnings_thresholds() {
        // BIGA 11%, TINY 4%, rest spread thin enough to stay quiet
        let mut holdings = vec![
            WeightedHolding::new("BIGA", dec!(1100)),
            WeightedHolding::new("TINY", dec!(400)),
        ];
        for i in 0..17 {
            holdings.push(WeightedHolding::new(&format!("S{i:02}"), dec!(500)));
        }
        let report = engine(FixtureGateway::new())
            .concentration_metrics(&holdings)
            .await
            .unwrap();

        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("BIGA") && w.contains("exceeds 10%")));
        assert!(!report.warnings.iter().any(|w| w.contains("TINY")));
    }

    #[tokio::test]
    async fn test_sector_concentration_warning() {
        let gw = FixtureGateway::new()
            .with_quote(Quote::new("AAPL", dec!(1)).with_sector("Technology"))
            .with_quote(Quote::new("MSFT", dec!(1)).with_sector("Technology"))
            .with_quote(Quote::new("XOM", dec!(1)).with_sector("Energy"));
        let holdings = vec![
            WeightedHolding::new("AAPL", dec!(3000)),
            WeightedHolding::new("MSFT", dec!(3000)),
            WeightedHolding::new("XOM", dec!(4000)),
        ];
        let report = engine(gw).concentration_metrics(&holdings).await.unwrap();

        assert_eq!(report.sector_allocation["Technology"], 60.0);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("Technology") && w.contains("60.0%")));
        // 40% exactly does not fire
        assert!(!report.warnings.iter().any(|w| w.contains("Energy is")));
    }

    #[tokio::test]
    async fn test_unknown_sector_never_warns() {
        // 100% unclassified must not read as a sector bet
        let report = engine(FixtureGateway::new())
            .concentration_metrics(&equal_holdings(&["AAPL", "MSFT"]))
            .await
            .unwrap();
        assert_eq!(report.sector_allocation["Unknown"], 100.0);
        assert!(!report.warnings.iter().any(|w| w.contains("Unknown")));
    }

    #[tokio::test]
    async fn test_top_holdings_sorted_and_capped() {
        let holdings: Vec<WeightedHolding> = (0..12)
            .map(|i| WeightedHolding::new(&format!("S{i:02}"), Decimal::from(100 * (i + 1))))
            .collect();
        let report = engine(FixtureGateway::new())
            .concentration_metrics(&holdings)
            .await
            .unwrap();
        assert_eq!(report.top_holdings.len(), 10);
        assert_eq!(report.top_holdings[0].symbol, "S11");
        assert!(report
            .top_holdings
            .windows(2)
            .all(|w| w[0].weight_percent >= w[1].weight_percent));
    }

    #[tokio::test]
    async fn test_concentration_empty_portfolio() {
        assert_eq!(
            engine(FixtureGateway::new())
                .concentration_metrics(&[])
                .await
                .unwrap_err(),
            EngineError::EmptyPortfolio
        );
    }

    // ----- cache -----

    #[tokio::test]
    async fn test_repeated_query_hits_cache() {
        let e = engine(FixtureGateway::new());
        let holdings = equal_holdings(&["AAPL", "MSFT"]);
        let first = e.concentration_metrics(&holdings).await.unwrap();
        let second = e.concentration_metrics(&holdings).await.unwrap();
        assert_eq!(first, second);
        assert!(e.cache_stats().hits >= 1);
    }

    #[tokio::test]
    async fn test_changed_holdings_miss_cache() {
        let e = engine(FixtureGateway::new());
        let a = e
            .concentration_metrics(&equal_holdings(&["AAPL"]))
            .await
            .unwrap();
        let b = e
            .concentration_metrics(&equal_holdings(&["AAPL", "MSFT"]))
            .await
            .unwrap();
        assert_ne!(a.concentration_score, b.concentration_score);
    }

    // ----- summary -----

    #[tokio::test]
    async fn test_risk_summary_end_to_end() {
        let returns = pattern(60, 1.0);
        let gw = FixtureGateway::new()
            .with_quote(Quote::new("AAPL", dec!(200)).with_beta(1.1))
            .with_history("AAPL", bars_from_returns(150.0, &returns))
            .with_history("SPY", bars_from_returns(400.0, &returns));
        let positions = vec![Position::new("AAPL", dec!(10), dec!(150))];
        let summary = engine(gw).risk_summary(&positions).await.unwrap();

        assert_eq!(summary.portfolio_value, dec!(2000));
        assert_eq!(summary.positions_count, 1);
        assert!((summary.portfolio_beta - 1.1).abs() < 1e-9);
        assert!(summary.var_95_percent > 0.0);
    }

    #[tokio::test]
    async fn test_risk_summary_empty_portfolio() {
        assert_eq!(
            engine(FixtureGateway::new())
                .risk_summary(&[])
                .await
                .unwrap_err(),
            EngineError::EmptyPortfolio
        );
    }

    // ----- helpers -----

    #[test]
    fn test_regression_beta_flat_benchmark() {
        let dates: Vec<NaiveDate> = (0..30)
            .map(|i| d(2025, 1, 1) + chrono::Duration::days(i))
            .collect();
        let stock: BTreeMap<NaiveDate, f64> =
            dates.iter().map(|d| (*d, 0.01)).collect();
        let flat: BTreeMap<NaiveDate, f64> = dates.iter().map(|d| (*d, 0.0)).collect();
        assert_eq!(regression_beta(&stock, &flat), None);
    }

    #[test]
    fn test_interpret_concentration_bands() {
        assert_eq!(interpret_concentration(5.0), "Well diversified");
        assert_eq!(interpret_concentration(25.0), "Moderately diversified");
        assert_eq!(interpret_concentration(50.0), "Concentrated");
        assert_eq!(interpret_concentration(80.0), "Highly concentrated");
    }
}
