//! Error types for the docpack domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Only [`ConfigurationError`] is ever surfaced to callers of a run; token
//! counting problems are absorbed by the heuristic fallback and selection
//! shortfalls are reported as warnings inside the result.

use thiserror::Error;

/// The top-level error type for all docpack operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Budget policy errors ---
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    // --- Token counting (normally absorbed, see TokenCounter) ---
    #[error("Token count error: {0}")]
    TokenCount(#[from] TokenCountError),

    // --- Configuration file errors ---
    #[error("Config error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- I/O at the tool boundary ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Malformed budget policy. Fatal: raised before any scoring runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("budget percentages sum to {sum:.4}, expected 1.0 (tolerance 0.001)")]
    PercentagesDoNotSum { sum: f64 },

    #[error("percentage for {category} is {value}, expected a value in [0, 1]")]
    PercentageOutOfRange { category: String, value: f64 },

    #[error("missing budget percentage for category: {0}")]
    MissingCategory(String),

    #[error("sub-budgets ({allocated}) plus buffer do not add up to the total budget ({total})")]
    BudgetInvariant { total: usize, allocated: usize },

    #[error("{0}")]
    Invalid(String),
}

/// Failure to count tokens exactly. Never fatal.
#[derive(Debug, Clone, Error)]
pub enum TokenCountError {
    #[error("content could not be encoded: {0}")]
    Encoding(String),

    #[error("tokenizer unavailable: {0}")]
    TokenizerUnavailable(String),
}
