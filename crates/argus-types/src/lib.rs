pub mod errors;
pub mod market;
pub mod portfolio;

pub use errors::*;
pub use market::*;
pub use portfolio::*;
