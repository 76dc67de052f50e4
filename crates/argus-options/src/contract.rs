use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Option type: call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Call,
    Put,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionKind::Call => write!(f, "call"),
            OptionKind::Put => write!(f, "put"),
        }
    }
}

/// A quoted options contract as fetched from the market-data gateway.
///
/// Ephemeral: fetched per analysis pass, never persisted. Quote fields are
/// optional because illiquid strikes frequently come back without bids,
/// volume, or a usable implied volatility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    pub strike: Decimal,
    pub expiration: NaiveDate,
    pub kind: OptionKind,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub last_price: Option<Decimal>,
    /// Quoted implied volatility as an annualised fraction (0.30 = 30 %).
    pub implied_volatility: Option<f64>,
    pub volume: Option<u64>,
    pub open_interest: Option<u64>,
}

impl OptionContract {
    pub fn new(kind: OptionKind, strike: Decimal, expiration: NaiveDate) -> Self {
        Self {
            strike,
            expiration,
            kind,
            bid: None,
            ask: None,
            last_price: None,
            implied_volatility: None,
            volume: None,
            open_interest: None,
        }
    }

    pub fn with_implied_volatility(mut self, iv: f64) -> Self {
        self.implied_volatility = Some(iv);
        self
    }

    pub fn with_quotes(mut self, bid: Decimal, ask: Decimal, last: Decimal) -> Self {
        self.bid = Some(bid);
        self.ask = Some(ask);
        self.last_price = Some(last);
        self
    }

    /// Intrinsic value given the current underlying price.
    pub fn intrinsic_value(&self, spot: Decimal) -> Decimal {
        let iv = match self.kind {
            OptionKind::Call => spot - self.strike,
            OptionKind::Put => self.strike - spot,
        };
        iv.max(Decimal::ZERO)
    }

    /// True when the option is in-the-money.
    pub fn is_itm(&self, spot: Decimal) -> bool {
        self.intrinsic_value(spot) > Decimal::ZERO
    }

    /// Bid/ask midpoint, falling back to last traded price.
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.bid, self.ask) {
            (Some(b), Some(a)) if b > Decimal::ZERO && a > Decimal::ZERO => {
                Some((b + a) / Decimal::from(2))
            }
            _ => self.last_price.filter(|p| *p > Decimal::ZERO),
        }
    }
}

impl fmt::Display for OptionContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.expiration.format("%Y-%m-%d"),
            self.strike,
            self.kind,
        )
    }
}
