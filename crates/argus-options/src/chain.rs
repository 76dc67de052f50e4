//! Options chain: quoted contracts for a single underlying and expiration.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::contract::{OptionContract, OptionKind};
use crate::greeks::OptionGreeks;
use crate::pricing::price_and_greeks;

/// An option chain for a single underlying/expiration pair, split into
/// calls and puts the way the upstream feed delivers them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChain {
    pub symbol: String,
    pub expiration: NaiveDate,
    pub calls: Vec<OptionContract>,
    pub puts: Vec<OptionContract>,
}

impl OptionChain {
    pub fn new(symbol: &str, expiration: NaiveDate) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            expiration,
            calls: Vec::new(),
            puts: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.calls.len() + self.puts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.puts.is_empty()
    }

    /// The call whose strike is closest to spot (near-the-money).
    pub fn nearest_strike_call(&self, spot: Decimal) -> Option<&OptionContract> {
        Self::nearest_strike(&self.calls, spot)
    }

    /// The put whose strike is closest to spot.
    pub fn nearest_strike_put(&self, spot: Decimal) -> Option<&OptionContract> {
        Self::nearest_strike(&self.puts, spot)
    }

    fn nearest_strike(contracts: &[OptionContract], spot: Decimal) -> Option<&OptionContract> {
        contracts.iter().min_by_key(|c| {
            let diff = (c.strike - spot).abs();
            // Sortable integer key at 1e-4 dollar precision
            (diff * Decimal::from(10000)).to_i64().unwrap_or(i64::MAX)
        })
    }

    /// Contracts of `kind` whose Black-Scholes delta sits closest to
    /// `target_delta`, best match first, at most five.
    ///
    /// Contracts without a usable quoted IV are priced at a 30% default so
    /// illiquid strikes still rank; contracts the pricer rejects are
    /// skipped. Time to expiry is clamped to a small positive floor so a
    /// same-day chain still prices.
    pub fn find_by_delta(
        &self,
        kind: OptionKind,
        target_delta: f64,
        spot: Decimal,
        risk_free_rate: f64,
        today: NaiveDate,
    ) -> Vec<DeltaMatch> {
        const DEFAULT_IV: f64 = 0.30;

        let contracts = match kind {
            OptionKind::Call => &self.calls,
            OptionKind::Put => &self.puts,
        };
        let time_to_expiry = ((self.expiration - today).num_days() as f64 / 365.0).max(0.001);
        let Some(spot) = spot.to_f64() else {
            return Vec::new();
        };

        let mut matches: Vec<DeltaMatch> = contracts
            .iter()
            .filter_map(|contract| {
                let iv = contract
                    .implied_volatility
                    .filter(|iv| iv.is_finite() && *iv > 0.0)
                    .unwrap_or(DEFAULT_IV);
                let strike = contract.strike.to_f64()?;
                let greeks =
                    price_and_greeks(spot, strike, time_to_expiry, iv, risk_free_rate, kind)
                        .ok()?;
                let delta = greeks.delta.to_f64()?;
                Some(DeltaMatch {
                    contract: contract.clone(),
                    greeks,
                    delta_diff: (delta - target_delta).abs(),
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            a.delta_diff
                .partial_cmp(&b.delta_diff)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(5);
        matches
    }
}

/// One candidate from a delta-targeted scan of a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaMatch {
    pub contract: OptionContract,
    pub greeks: OptionGreeks,
    /// Absolute distance of this contract's delta from the target.
    pub delta_diff: f64,
}

/// Pick an expiration for near-money IV sampling: the first one 30–60
/// days out, else the nearest available. `None` when no expirations exist.
pub fn select_expiration(expirations: &[NaiveDate], today: NaiveDate) -> Option<NaiveDate> {
    if expirations.is_empty() {
        return None;
    }
    for exp in expirations {
        let days = (*exp - today).num_days();
        if (30..=60).contains(&days) {
            return Some(*exp);
        }
    }
    // Nearest-available fallback
    expirations
        .iter()
        .min_by_key(|exp| ((**exp - today).num_days() - 45).abs())
        .copied()
}
