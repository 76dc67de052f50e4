//! HTTP JSON market-data gateway.
//!
//! Speaks a plain REST quote API (`/quote`, `/history`, `/options`,
//! `/expirations`). Response bodies are deserialized into local DTOs and
//! converted at the boundary; any transport or shape problem becomes a
//! per-symbol [`DataError`] for the caller to absorb.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use argus_options::{OptionChain, OptionContract, OptionKind};
use argus_types::{DailyBar, DataError, HistoryPeriod, Quote};

use crate::gateway::MarketDataGateway;

/// Market-data client over a JSON REST API.
#[derive(Debug)]
pub struct HttpGateway {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct QuoteDto {
    price: f64,
    #[serde(default)]
    change: f64,
    #[serde(default)]
    change_percent: f64,
    #[serde(default)]
    volume: u64,
    market_cap: Option<f64>,
    pe_ratio: Option<f64>,
    beta: Option<f64>,
    sector: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BarDto {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: u64,
}

#[derive(Debug, Deserialize)]
struct ContractDto {
    strike: f64,
    bid: Option<f64>,
    ask: Option<f64>,
    last_price: Option<f64>,
    implied_volatility: Option<f64>,
    volume: Option<u64>,
    open_interest: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChainDto {
    calls: Vec<ContractDto>,
    puts: Vec<ContractDto>,
}

#[derive(Debug, Deserialize)]
struct ExpirationsDto {
    expirations: Vec<String>,
}

fn dec(v: f64) -> Decimal {
    Decimal::from_f64_retain(v).unwrap_or_default()
}

fn parse_date(s: &str, symbol: &str) -> Result<NaiveDate, DataError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| DataError::Malformed {
        symbol: symbol.to_string(),
        message: format!("bad date '{}': {}", s, e),
    })
}

impl HttpGateway {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, DataError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| DataError::Http {
                message: format!("request failed: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(DataError::Http {
                message: format!("HTTP {} from {}", response.status(), path),
            });
        }

        response.json::<T>().await.map_err(|e| DataError::Parse {
            message: format!("bad JSON from {}: {}", path, e),
        })
    }

    fn convert_contract(
        dto: ContractDto,
        kind: OptionKind,
        expiration: NaiveDate,
    ) -> OptionContract {
        OptionContract {
            strike: dec(dto.strike),
            expiration,
            kind,
            bid: dto.bid.map(dec),
            ask: dto.ask.map(dec),
            last_price: dto.last_price.map(dec),
            implied_volatility: dto.implied_volatility.filter(|iv| iv.is_finite()),
            volume: dto.volume,
            open_interest: dto.open_interest,
        }
    }
}

#[async_trait]
impl MarketDataGateway for HttpGateway {
    async fn get_quote(&self, symbol: &str) -> Result<Quote, DataError> {
        let symbol = symbol.to_uppercase();
        let dto: QuoteDto = self.get_json("quote", &[("symbol", &symbol)]).await?;

        if dto.price <= 0.0 || !dto.price.is_finite() {
            return Err(DataError::QuoteUnavailable { symbol });
        }

        let mut quote = Quote::new(&symbol, dec(dto.price));
        quote.change = dec(dto.change);
        quote.change_percent = dec(dto.change_percent);
        quote.volume = dto.volume;
        quote.market_cap = dto.market_cap.map(dec);
        quote.pe_ratio = dto.pe_ratio.map(dec);
        quote.beta = dto.beta.filter(|b| b.is_finite());
        quote.sector = dto.sector;
        Ok(quote)
    }

    async fn get_history(
        &self,
        symbol: &str,
        period: HistoryPeriod,
    ) -> Result<Vec<DailyBar>, DataError> {
        let symbol = symbol.to_uppercase();
        tracing::info!(%symbol, %period, "fetching price history");

        let dtos: Vec<BarDto> = self
            .get_json(
                "history",
                &[("symbol", symbol.as_str()), ("period", &period.to_string())],
            )
            .await?;

        let mut bars = Vec::with_capacity(dtos.len());
        for dto in dtos {
            bars.push(DailyBar {
                date: parse_date(&dto.date, &symbol)?,
                open: dec(dto.open),
                high: dec(dto.high),
                low: dec(dto.low),
                close: dec(dto.close),
                volume: dto.volume,
            });
        }

        // Upstream ordering is not guaranteed; the engine requires oldest-first.
        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    async fn get_option_chain(
        &self,
        symbol: &str,
        expiration: NaiveDate,
    ) -> Result<OptionChain, DataError> {
        let symbol = symbol.to_uppercase();
        let exp_str = expiration.format("%Y-%m-%d").to_string();
        let dto: ChainDto = self
            .get_json(
                "options",
                &[("symbol", symbol.as_str()), ("expiration", &exp_str)],
            )
            .await?;

        let mut chain = OptionChain::new(&symbol, expiration);
        chain.calls = dto
            .calls
            .into_iter()
            .map(|c| Self::convert_contract(c, OptionKind::Call, expiration))
            .collect();
        chain.puts = dto
            .puts
            .into_iter()
            .map(|p| Self::convert_contract(p, OptionKind::Put, expiration))
            .collect();
        Ok(chain)
    }

    async fn get_expirations(&self, symbol: &str) -> Result<Vec<NaiveDate>, DataError> {
        let symbol = symbol.to_uppercase();
        let dto: ExpirationsDto = self
            .get_json("expirations", &[("symbol", symbol.as_str())])
            .await?;

        let mut dates = Vec::with_capacity(dto.expirations.len());
        for s in &dto.expirations {
            dates.push(parse_date(s, &symbol)?);
        }
        dates.sort();
        Ok(dates)
    }
}
