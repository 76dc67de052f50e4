//! CSV-backed history gateway.
//!
//! Serves daily bars from local `{symbol}.csv` files and delegates quotes
//! and options to an inner gateway. Useful for offline analysis where
//! history is bulk-downloaded but quotes still come from a live source.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use csv::ReaderBuilder;
use rust_decimal::Decimal;
use serde::Deserialize;

use argus_options::OptionChain;
use argus_types::{DailyBar, DataError, HistoryPeriod, Quote};

use crate::gateway::MarketDataGateway;

#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date")]
    date: String,
    #[serde(alias = "Open", alias = "open")]
    open: f64,
    #[serde(alias = "High", alias = "high")]
    high: f64,
    #[serde(alias = "Low", alias = "low")]
    low: f64,
    #[serde(alias = "Close", alias = "close")]
    close: f64,
    #[serde(alias = "Volume", alias = "volume", default)]
    volume: u64,
}

/// Layered gateway: history from CSV files, everything else from `inner`.
pub struct CsvHistoryGateway {
    data_directory: PathBuf,
    inner: Arc<dyn MarketDataGateway>,
}

impl CsvHistoryGateway {
    pub fn new<P: AsRef<Path>>(data_directory: P, inner: Arc<dyn MarketDataGateway>) -> Self {
        Self {
            data_directory: data_directory.as_ref().to_path_buf(),
            inner,
        }
    }

    fn file_path(&self, symbol: &str) -> PathBuf {
        self.data_directory.join(format!("{}.csv", symbol))
    }

    fn read_bars(&self, symbol: &str, period: HistoryPeriod) -> Result<Vec<DailyBar>, DataError> {
        let path = self.file_path(symbol);
        if !path.exists() {
            return Err(DataError::HistoryUnavailable {
                symbol: symbol.to_string(),
                period: period.to_string(),
            });
        }

        let file = std::fs::File::open(&path).map_err(|e| DataError::Parse {
            message: format!("cannot open {}: {}", path.display(), e),
        })?;
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);

        let dec = |v: f64| Decimal::from_f64_retain(v).unwrap_or_default();
        let mut bars = Vec::new();
        for result in reader.deserialize() {
            let record: CsvRecord = result.map_err(|e| DataError::Parse {
                message: format!("CSV parsing error: {}", e),
            })?;
            let date =
                NaiveDate::parse_from_str(&record.date, "%Y-%m-%d").map_err(|e| {
                    DataError::Parse {
                        message: format!("date parsing error: {}", e),
                    }
                })?;
            bars.push(DailyBar {
                date,
                open: dec(record.open),
                high: dec(record.high),
                low: dec(record.low),
                close: dec(record.close),
                volume: record.volume,
            });
        }

        bars.sort_by_key(|b| b.date);

        // Trim to the requested lookback, measured from the newest bar
        if let Some(last) = bars.last() {
            let cutoff = last.date - chrono::Duration::days(period.approx_days());
            bars.retain(|b| b.date >= cutoff);
        }
        Ok(bars)
    }
}

#[async_trait]
impl MarketDataGateway for CsvHistoryGateway {
    async fn get_quote(&self, symbol: &str) -> Result<Quote, DataError> {
        self.inner.get_quote(symbol).await
    }

    async fn get_history(
        &self,
        symbol: &str,
        period: HistoryPeriod,
    ) -> Result<Vec<DailyBar>, DataError> {
        self.read_bars(&symbol.to_uppercase(), period)
    }

    async fn get_option_chain(
        &self,
        symbol: &str,
        expiration: NaiveDate,
    ) -> Result<OptionChain, DataError> {
        self.inner.get_option_chain(symbol, expiration).await
    }

    async fn get_expirations(&self, symbol: &str) -> Result<Vec<NaiveDate>, DataError> {
        self.inner.get_expirations(symbol).await
    }
}
