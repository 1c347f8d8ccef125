//! Wallet error types.

use thiserror::Error;

/// Wallet errors
#[derive(Debug, Error)]
pub enum WalletError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Insufficient balance
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: i64, required: i64 },

    /// User not found
    #[error("User {0} not found")]
    UserNotFound(i64),

    /// Invalid amount (must be non-negative)
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),
}

impl WalletError {
    /// Client-safe error message that doesn't leak internal details.
    pub fn client_message(&self) -> String {
        match self {
            WalletError::Database(_) => "Internal server error".to_string(),
            WalletError::UserNotFound(_) => "User not found".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;
