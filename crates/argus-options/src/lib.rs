pub mod chain;
pub mod contract;
pub mod greeks;
pub mod pricing;

pub use chain::*;
pub use contract::*;
pub use greeks::*;
pub use pricing::*;
