use thiserror::Error;

/// Main error type for the Argus system
#[derive(Error, Debug)]
pub enum ArgusError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Per-symbol market-data errors.
///
/// These are always absorbable: a failed quote or history fetch degrades
/// that one symbol (cost-basis valuation, null beta, zero-return row) and
/// never aborts a portfolio-wide computation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("No quote available for {symbol}")]
    QuoteUnavailable { symbol: String },

    #[error("No price history for {symbol} over {period}")]
    HistoryUnavailable { symbol: String, period: String },

    #[error("No options data for {symbol}")]
    OptionsUnavailable { symbol: String },

    #[error("Malformed market data for {symbol}: {message}")]
    Malformed { symbol: String, message: String },

    #[error("HTTP request failed: {message}")]
    Http { message: String },

    #[error("Data parsing error: {message}")]
    Parse { message: String },
}

/// Errors surfaced by the risk/pricing engines.
///
/// `EmptyPortfolio` and `ZeroPortfolioValue` are structural: the caller
/// asked a portfolio-level question of a portfolio that has no answer.
/// `InsufficientData` means a specific metric could not be computed from
/// the observations available; sibling metrics are unaffected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("No positions in portfolio")]
    EmptyPortfolio,

    #[error("Zero portfolio value")]
    ZeroPortfolioValue,

    #[error("Insufficient data: need {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Data error: {0}")]
    Data(#[from] DataError),
}

/// Result type alias for Argus operations
pub type ArgusResult<T> = Result<T, ArgusError>;
