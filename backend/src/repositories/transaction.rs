//! Transaction management utilities for repositories.

use crate::error::AppError;
use sqlx::postgres::PgTransaction;
use sqlx::PgPool;

/// Begin a transaction at the database's default isolation level.
pub async fn begin(db: &PgPool) -> Result<PgTransaction<'_>, AppError> {
    db.begin()
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))
}

/// Begin a transaction with isolation raised to SERIALIZABLE.
///
/// Session-state changes are check-then-act sequences (read active sessions,
/// decide, write); serializable isolation is what upholds the occupancy and
/// single-active-session invariants under concurrent badge scans.
pub async fn begin_serializable(db: &PgPool) -> Result<PgTransaction<'_>, AppError> {
    let mut tx = db
        .begin()
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;
    Ok(tx)
}

/// Commit a transaction.
pub async fn commit(tx: PgTransaction<'_>) -> Result<(), AppError> {
    tx.commit()
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))
}

/// Roll back a transaction.
pub async fn rollback(tx: PgTransaction<'_>) -> Result<(), AppError> {
    tx.rollback()
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))
}
