//! Error types for the credit literacy bot

use thiserror::Error;

/// Result type alias for bot operations
pub type Result<T> = std::result::Result<T, BotError>;

#[derive(Error, Debug)]
pub enum BotError {

    // =============================
    // Conversation Errors
    // =============================

    /// Text did not resolve to the numeric type the current step expects.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Value parsed but breaks a domain precondition. The message is shown to the user.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An amortization or rate-solving loop hit its iteration bound.
    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Unknown input: {0}")]
    UnknownInput(String),

    // =============================
    // Infrastructure Errors
    // =============================

    #[error("Session store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl BotError {
    /// Errors the state machine recovers from by repeating the current question.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BotError::Parse(_) | BotError::InvalidInput(_) | BotError::UnknownInput(_)
        )
    }
}
