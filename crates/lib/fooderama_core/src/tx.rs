//! Transactional mutation coordinator.
//!
//! A mutation opens one transaction with [`begin`], runs every write on that
//! transaction's connection, and hands the outcome to [`settle`]. `Ok` commits,
//! `Err` rolls back. Partial writes are never visible to other connections.

use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, error};

/// An open Postgres transaction that owns its pooled connection.
pub type PgTransaction = Transaction<'static, Postgres>;

/// Open a transaction on a pooled connection.
pub async fn begin(pool: &PgPool) -> Result<PgTransaction, sqlx::Error> {
    pool.begin().await
}

/// Commit on `Ok`, roll back on `Err`.
///
/// A failed commit becomes the returned error. A failed rollback is logged and
/// the original error is returned; dropping the connection discards the
/// transaction server-side.
pub async fn settle<T, E>(tx: PgTransaction, result: Result<T, E>) -> Result<T, E>
where
    E: From<sqlx::Error>,
{
    match result {
        Ok(value) => {
            tx.commit().await?;
            debug!("transaction committed");
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                error!(error = %rollback_err, "transaction rollback failed");
            } else {
                debug!("transaction rolled back");
            }
            Err(e)
        }
    }
}
