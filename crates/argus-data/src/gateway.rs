use async_trait::async_trait;
use chrono::NaiveDate;

use argus_options::OptionChain;
use argus_types::{DailyBar, DataError, HistoryPeriod, Quote};

/// Capability consumed by the risk and volatility engines.
///
/// Implementations may fail or return partial data per symbol; callers
/// absorb those failures with the documented fallbacks (cost-basis
/// valuation, null beta, zero-return row) and never escalate a transport
/// error into a portfolio-wide failure. Timeouts are the implementation's
/// responsibility.
#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    /// Current quote for a symbol.
    async fn get_quote(&self, symbol: &str) -> Result<Quote, DataError>;

    /// Daily OHLCV history, chronological, oldest first. An empty vector
    /// signals "no data" without being an error.
    async fn get_history(
        &self,
        symbol: &str,
        period: HistoryPeriod,
    ) -> Result<Vec<DailyBar>, DataError>;

    /// Options chain for one expiration.
    async fn get_option_chain(
        &self,
        symbol: &str,
        expiration: NaiveDate,
    ) -> Result<OptionChain, DataError>;

    /// Available option expirations, ascending.
    async fn get_expirations(&self, symbol: &str) -> Result<Vec<NaiveDate>, DataError>;
}
