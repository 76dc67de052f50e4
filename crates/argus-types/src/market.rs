use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Live quote snapshot for a symbol.
///
/// Fetched fresh per computation pass; never persisted. Optional fields
/// reflect what the upstream feed actually publishes; `beta` and `sector`
/// in particular are frequently missing and callers must fall back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    pub volume: u64,
    pub market_cap: Option<Decimal>,
    pub pe_ratio: Option<Decimal>,
    /// Published beta vs the broad market, when the feed carries one.
    pub beta: Option<f64>,
    /// Sector classification, when known.
    pub sector: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    pub fn new(symbol: &str, price: Decimal) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            price,
            change: Decimal::ZERO,
            change_percent: Decimal::ZERO,
            volume: 0,
            market_cap: None,
            pe_ratio: None,
            beta: None,
            sector: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = Some(beta);
        self
    }

    pub fn with_sector(mut self, sector: &str) -> Self {
        self.sector = Some(sector.to_string());
        self
    }
}

/// One daily OHLCV observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

impl DailyBar {
    pub fn new(date: NaiveDate, close: Decimal) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0,
        }
    }
}

/// Simple daily returns from a chronological close series:
/// `R_t = (C_t - C_{t-1}) / C_{t-1}`.
///
/// Returns are computed in f64; this is the documented precision boundary
/// between exact decimal transit values and floating-point statistics.
/// Bars with a non-positive previous close are skipped.
pub fn daily_returns(bars: &[DailyBar]) -> Vec<(NaiveDate, f64)> {
    let mut returns = Vec::with_capacity(bars.len().saturating_sub(1));
    for pair in bars.windows(2) {
        let prev = pair[0].close.to_f64().unwrap_or(0.0);
        let curr = pair[1].close.to_f64().unwrap_or(0.0);
        if prev > 0.0 {
            returns.push((pair[1].date, (curr - prev) / prev));
        }
    }
    returns
}

/// Lookback period for historical data requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryPeriod {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
}

impl HistoryPeriod {
    /// Approximate calendar days covered by the period.
    pub fn approx_days(&self) -> i64 {
        match self {
            HistoryPeriod::OneMonth => 30,
            HistoryPeriod::ThreeMonths => 91,
            HistoryPeriod::SixMonths => 182,
            HistoryPeriod::OneYear => 365,
            HistoryPeriod::TwoYears => 730,
        }
    }
}

impl fmt::Display for HistoryPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HistoryPeriod::OneMonth => "1mo",
            HistoryPeriod::ThreeMonths => "3mo",
            HistoryPeriod::SixMonths => "6mo",
            HistoryPeriod::OneYear => "1y",
            HistoryPeriod::TwoYears => "2y",
        };
        write!(f, "{}", s)
    }
}
