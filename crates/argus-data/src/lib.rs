//! Market-data access for Argus.
//!
//! Provides:
//! - The [`MarketDataGateway`] capability consumed by the risk engine
//! - Concrete gateways (HTTP JSON API, local CSV history, in-memory fixture)
//! - The portfolio valuation policy (live price with cost-basis fallback)

pub mod csv_history;
pub mod fixture;
pub mod gateway;
pub mod http;
pub mod valuation;

pub use csv_history::CsvHistoryGateway;
pub use fixture::{synthetic_walk, FixtureGateway};
pub use gateway::MarketDataGateway;
pub use http::HttpGateway;
pub use valuation::{value_positions, PortfolioValuation, ValuedPosition};
