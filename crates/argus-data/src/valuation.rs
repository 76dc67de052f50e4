//! Portfolio valuation policy.
//!
//! One rule, applied everywhere market value is computed: value a position
//! at `quantity × live price` when a quote is available, else fall back to
//! `quantity × average cost`. The fallback is a valuation policy, not an
//! error: a symbol whose quote fetch fails still participates in every
//! portfolio-level metric at its cost basis.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::warn;

use argus_types::{AssetType, Position, Quote, WeightedHolding};

use crate::gateway::MarketDataGateway;

/// A position together with the quote used (or not) to value it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuedPosition {
    pub position: Position,
    /// The live quote, when one was available. Kept so downstream layers
    /// (stop-loss checks, sector lookups) reuse the same fetch pass.
    pub quote: Option<Quote>,
    pub market_value: Decimal,
}

impl ValuedPosition {
    /// Current price when quoted.
    pub fn current_price(&self) -> Option<Decimal> {
        self.quote.as_ref().map(|q| q.price)
    }
}

/// Result of valuing a snapshot of positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioValuation {
    pub positions: Vec<ValuedPosition>,
}

impl PortfolioValuation {
    pub fn total_value(&self) -> Decimal {
        self.positions.iter().map(|p| p.market_value).sum()
    }

    /// The ephemeral weighted holdings consumed by the risk engine.
    pub fn holdings(&self) -> Vec<WeightedHolding> {
        self.positions
            .iter()
            .map(|p| WeightedHolding::new(&p.position.symbol, p.market_value))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Value every position, fetching quotes for independent symbols
/// concurrently.
///
/// Failed or missing quotes degrade that one symbol to cost basis; the
/// aggregate only ever consumes completed fetches, so cancelling the
/// parent future cannot leave partial state behind.
pub async fn value_positions(
    gateway: Arc<dyn MarketDataGateway>,
    positions: &[Position],
) -> PortfolioValuation {
    let mut tasks: JoinSet<(usize, Option<Quote>)> = JoinSet::new();

    for (idx, pos) in positions.iter().enumerate() {
        // Cash never has a quote; it is valued at cost basis directly.
        if pos.asset_type == AssetType::Cash {
            continue;
        }
        let gateway = Arc::clone(&gateway);
        let symbol = pos.symbol.clone();
        tasks.spawn(async move {
            let quote = match gateway.get_quote(&symbol).await {
                Ok(q) => Some(q),
                Err(e) => {
                    warn!(%symbol, error = %e, "quote unavailable, falling back to cost basis");
                    None
                }
            };
            (idx, quote)
        });
    }

    let mut quotes: Vec<Option<Quote>> = vec![None; positions.len()];
    while let Some(joined) = tasks.join_next().await {
        if let Ok((idx, quote)) = joined {
            quotes[idx] = quote;
        }
    }

    let valued = positions
        .iter()
        .zip(quotes)
        .map(|(pos, quote)| {
            let market_value = match &quote {
                Some(q) if q.price > Decimal::ZERO => pos.quantity * q.price,
                _ => pos.cost_basis(),
            };
            ValuedPosition {
                position: pos.clone(),
                quote,
                market_value,
            }
        })
        .collect();

    PortfolioValuation { positions: valued }
}
