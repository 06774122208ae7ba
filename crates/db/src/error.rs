use pressroom_core::CoreError;

/// Errors raised by the storage layer before they are mapped onto
/// [`CoreError`].
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl DbError {
    /// Separate unique violations from other database failures.
    pub fn classify(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return Self::UniqueViolation(db.constraint().unwrap_or("unknown").to_string());
            }
        }
        Self::Sqlx(err)
    }
}

impl From<DbError> for CoreError {
    fn from(err: DbError) -> Self {
        CoreError::Storage(err.to_string())
    }
}

/// Shorthand for `map_err` on sqlx results.
pub(crate) fn storage(err: sqlx::Error) -> CoreError {
    DbError::classify(err).into()
}
