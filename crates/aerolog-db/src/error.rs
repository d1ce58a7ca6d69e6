//! error types for the database layer.

use sea_orm::{DbErr, SqlErr};

/// errors from database operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// failed to connect to the database.
    #[error("database connection failed: {0}")]
    Connection(String),

    /// failed to run migrations.
    #[error("database migration failed: {0}")]
    Migration(String),

    /// an insert or update violated a uniqueness constraint.
    ///
    /// callers racing to create the same row see exactly one success;
    /// the losers get this variant and can re-read the winner's row.
    #[error("record already exists")]
    Conflict,

    /// stored data could not be interpreted.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// any other database error.
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl Error {
    /// wrap an insert error, mapping unique constraint violations to
    /// [`Error::Conflict`].
    pub(crate) fn from_insert(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Error::Conflict,
            _ => Error::Database(err),
        }
    }
}
