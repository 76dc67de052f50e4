use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::EngineError;

/// Asset classes held in a portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Stock,
    Etf,
    Option,
    Cash,
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssetType::Stock => "stock",
            AssetType::Etf => "etf",
            AssetType::Option => "option",
            AssetType::Cash => "cash",
        };
        write!(f, "{}", s)
    }
}

/// A position snapshot as supplied by the external portfolio store.
///
/// The risk engine only ever reads these; writes belong to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: Decimal,
    pub average_cost: Decimal,
    pub target_price: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub asset_type: AssetType,
}

impl Position {
    pub fn new(symbol: &str, quantity: Decimal, average_cost: Decimal) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            quantity,
            average_cost,
            target_price: None,
            stop_loss: None,
            asset_type: AssetType::Stock,
        }
    }

    pub fn with_stop_loss(mut self, stop_loss: Decimal) -> Self {
        self.stop_loss = Some(stop_loss);
        self
    }

    pub fn with_asset_type(mut self, asset_type: AssetType) -> Self {
        self.asset_type = asset_type;
        self
    }

    /// Check the snapshot against its documented invariants.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.symbol.is_empty() {
            return Err(EngineError::InvalidInput("empty symbol".to_string()));
        }
        if self.quantity < Decimal::ZERO {
            return Err(EngineError::InvalidInput(format!(
                "negative quantity for {}",
                self.symbol
            )));
        }
        if self.average_cost <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(format!(
                "non-positive average cost for {}",
                self.symbol
            )));
        }
        if let Some(sl) = self.stop_loss {
            if sl <= Decimal::ZERO {
                return Err(EngineError::InvalidInput(format!(
                    "non-positive stop loss for {}",
                    self.symbol
                )));
            }
        }
        Ok(())
    }

    /// Cost-basis value: quantity × average cost. Used as the valuation
    /// fallback when no live quote is available.
    pub fn cost_basis(&self) -> Decimal {
        self.quantity * self.average_cost
    }
}

/// Derived, ephemeral valuation of a single position.
///
/// `market_value` is computed by the valuation policy (current price if a
/// quote exists, else cost basis). Weights across a non-empty portfolio
/// with positive total value sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedHolding {
    pub symbol: String,
    pub market_value: Decimal,
}

impl WeightedHolding {
    pub fn new(symbol: &str, market_value: Decimal) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            market_value,
        }
    }
}

/// Total market value of a set of holdings.
pub fn total_value(holdings: &[WeightedHolding]) -> Decimal {
    holdings.iter().map(|h| h.market_value).sum()
}

/// Fractional weights for each holding, in input order.
///
/// Returns a structural error for an empty set or a non-positive total.
pub fn weights(holdings: &[WeightedHolding]) -> Result<Vec<f64>, EngineError> {
    use rust_decimal::prelude::ToPrimitive;

    if holdings.is_empty() {
        return Err(EngineError::EmptyPortfolio);
    }
    let total = total_value(holdings).to_f64().unwrap_or(0.0);
    if total <= 0.0 {
        return Err(EngineError::ZeroPortfolioValue);
    }
    Ok(holdings
        .iter()
        .map(|h| h.market_value.to_f64().unwrap_or(0.0) / total)
        .collect())
}
