//! In-memory gateway with caller-supplied data, for tests and demos.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use argus_options::OptionChain;
use argus_types::{DailyBar, DataError, HistoryPeriod, Quote};

use crate::gateway::MarketDataGateway;

/// Deterministic in-memory market-data source.
///
/// Every response is exactly what was loaded at construction time, which
/// makes risk-engine tests reproducible. Symbols without loaded data get
/// the same per-symbol errors a live gateway would produce.
#[derive(Debug, Default)]
pub struct FixtureGateway {
    quotes: HashMap<String, Quote>,
    history: HashMap<String, Vec<DailyBar>>,
    expirations: HashMap<String, Vec<NaiveDate>>,
    chains: HashMap<(String, NaiveDate), OptionChain>,
}

impl FixtureGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(mut self, quote: Quote) -> Self {
        self.quotes.insert(quote.symbol.clone(), quote);
        self
    }

    pub fn with_history(mut self, symbol: &str, bars: Vec<DailyBar>) -> Self {
        self.history.insert(symbol.to_uppercase(), bars);
        self
    }

    pub fn with_expirations(mut self, symbol: &str, expirations: Vec<NaiveDate>) -> Self {
        self.expirations.insert(symbol.to_uppercase(), expirations);
        self
    }

    pub fn with_chain(mut self, chain: OptionChain) -> Self {
        self.chains
            .insert((chain.symbol.clone(), chain.expiration), chain);
        self
    }
}

/// Generate a deterministic random-walk close series for demo data.
///
/// Uses a simple LCG so the same seed always yields the same series.
pub fn synthetic_walk(
    start: NaiveDate,
    start_price: f64,
    days: usize,
    seed: u64,
) -> Vec<DailyBar> {
    let mut bars = Vec::with_capacity(days);
    let mut price = start_price;
    let mut rng_state = seed;
    let mut date = start;

    for _ in 0..days {
        rng_state = rng_state.wrapping_mul(1103515245).wrapping_add(12345);
        let random = ((rng_state >> 16) & 0xFFFF) as f64 / 65536.0 - 0.5; // -0.5 to 0.5
        price *= 1.0 + random * 0.02; // ±1% daily move

        bars.push(DailyBar::new(
            date,
            Decimal::from_f64(price).unwrap_or_default().round_dp(4),
        ));

        // Skip weekends so the series looks like trading days
        date += Duration::days(1);
        while matches!(date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun) {
            date += Duration::days(1);
        }
    }
    bars
}

#[async_trait]
impl MarketDataGateway for FixtureGateway {
    async fn get_quote(&self, symbol: &str) -> Result<Quote, DataError> {
        self.quotes
            .get(&symbol.to_uppercase())
            .cloned()
            .ok_or_else(|| DataError::QuoteUnavailable {
                symbol: symbol.to_uppercase(),
            })
    }

    async fn get_history(
        &self,
        symbol: &str,
        period: HistoryPeriod,
    ) -> Result<Vec<DailyBar>, DataError> {
        self.history
            .get(&symbol.to_uppercase())
            .cloned()
            .ok_or_else(|| DataError::HistoryUnavailable {
                symbol: symbol.to_uppercase(),
                period: period.to_string(),
            })
    }

    async fn get_option_chain(
        &self,
        symbol: &str,
        expiration: NaiveDate,
    ) -> Result<OptionChain, DataError> {
        self.chains
            .get(&(symbol.to_uppercase(), expiration))
            .cloned()
            .ok_or_else(|| DataError::OptionsUnavailable {
                symbol: symbol.to_uppercase(),
            })
    }

    async fn get_expirations(&self, symbol: &str) -> Result<Vec<NaiveDate>, DataError> {
        self.expirations
            .get(&symbol.to_uppercase())
            .cloned()
            .ok_or_else(|| DataError::OptionsUnavailable {
                symbol: symbol.to_uppercase(),
            })
    }
}
