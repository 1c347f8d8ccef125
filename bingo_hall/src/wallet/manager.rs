//! Wallet manager with an atomic non-negative balance guard.

use super::errors::{WalletError, WalletResult};
use crate::db::models::UserId;
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::sync::Arc;

/// Balance operations behind the engine's wallet seam.
///
/// Debits must never drive a balance negative: a short balance is a
/// validation error, not a ledger state.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Debits `amount`, returning the new balance. Fails with
    /// [`WalletError::InsufficientBalance`] rather than going negative.
    async fn debit(&self, user_id: UserId, amount: i64) -> WalletResult<i64>;

    /// Credits `amount`, returning the new balance.
    async fn credit(&self, user_id: UserId, amount: i64) -> WalletResult<i64>;

    /// Current balance.
    async fn balance(&self, user_id: UserId) -> WalletResult<i64>;
}

/// PostgreSQL-backed wallet manager
#[derive(Clone)]
pub struct WalletManager {
    pool: Arc<PgPool>,
}

impl WalletManager {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WalletStore for WalletManager {
    async fn debit(&self, user_id: UserId, amount: i64) -> WalletResult<i64> {
        if amount < 0 {
            return Err(WalletError::InvalidAmount(amount));
        }

        // The balance guard lives in the statement itself so concurrent
        // debits cannot interleave past it.
        let row = sqlx::query(
            r#"
            UPDATE users
            SET balance = balance - $2
            WHERE id = $1 AND balance >= $2
            RETURNING balance
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(self.pool.as_ref())
        .await?;

        match row {
            Some(row) => Ok(row.get("balance")),
            None => {
                let available = self.balance(user_id).await?;
                Err(WalletError::InsufficientBalance {
                    available,
                    required: amount,
                })
            }
        }
    }

    async fn credit(&self, user_id: UserId, amount: i64) -> WalletResult<i64> {
        if amount < 0 {
            return Err(WalletError::InvalidAmount(amount));
        }

        let row = sqlx::query(
            "UPDATE users SET balance = balance + $2 WHERE id = $1 RETURNING balance",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(WalletError::UserNotFound(user_id))?;

        Ok(row.get("balance"))
    }

    async fn balance(&self, user_id: UserId) -> WalletResult<i64> {
        let row = sqlx::query("SELECT balance FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(WalletError::UserNotFound(user_id))?;

        Ok(row.get("balance"))
    }
}
