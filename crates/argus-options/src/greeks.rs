use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Theoretical price plus greeks from the Black-Scholes model.
///
/// Values are rounded for display at the boundary: 4 decimal places
/// throughout, 6 for gamma.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionGreeks {
    /// Theoretical option price.
    pub price: Decimal,
    /// Rate of change of option price w.r.t. underlying price.
    pub delta: Decimal,
    /// Rate of change of delta w.r.t. underlying price.
    pub gamma: Decimal,
    /// Rate of change of option price w.r.t. time (per calendar day).
    pub theta: Decimal,
    /// Rate of change of option price w.r.t. volatility (per 1% move).
    pub vega: Decimal,
    /// Rate of change of option price w.r.t. risk-free rate (per 1% move).
    pub rho: Decimal,
}

impl OptionGreeks {
    /// Boundary greeks for an expired contract: intrinsic price, terminal
    /// delta, everything else zero.
    pub fn expired(price: Decimal, delta: Decimal) -> Self {
        Self {
            price,
            delta,
            gamma: Decimal::ZERO,
            theta: Decimal::ZERO,
            vega: Decimal::ZERO,
            rho: Decimal::ZERO,
        }
    }
}
