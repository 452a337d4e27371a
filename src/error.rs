//! Error taxonomy for points operations.

/// Result type for points operations.
pub type Result<T> = std::result::Result<T, PointsError>;

/// Errors that can occur while awarding, reading, or redeeming points.
///
/// Business-rule failures (`RewardNotFound`, `RewardInactive`,
/// `InsufficientPoints`) abort the enclosing transaction in full; no partial
/// write survives them. A zero-effect award is a successful outcome, not an
/// error.
#[derive(Debug, thiserror::Error)]
pub enum PointsError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("reward not found: {0}")]
    RewardNotFound(i64),

    #[error("reward {0} is not active")]
    RewardInactive(i64),

    #[error("insufficient points: balance {balance}, cost {cost}")]
    InsufficientPoints { balance: i64, cost: i64 },

    /// A spend carrying an operation id that the ledger has already seen.
    /// The request-level idempotency guard is the normal replay path; this
    /// surfaces only when a retry slips past it.
    #[error("operation already applied: {0}")]
    DuplicateOperation(String),

    /// An idempotency key was replayed with a different request body.
    #[error("idempotency key reused with a different request")]
    IdempotencyMismatch,

    #[error("operation timed out")]
    Timeout,

    /// Lock-wait timeout, pool exhaustion, connection failure. Safe to retry.
    #[error("transient storage error: {0}")]
    TransientStorage(String),

    /// Constraint violation or other database failure that is not the
    /// expected dedup conflict. Not safely retryable without investigation.
    #[error("storage error: {0}")]
    Storage(#[source] sqlx::Error),

    #[error("response serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PointsError {
    /// Whether a caller may retry the operation without investigation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientStorage(_) | Self::Timeout)
    }
}

fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => true,
        // SQLite reports lock-wait exhaustion as "database is locked".
        sqlx::Error::Database(db) => db.message().contains("database is locked"),
        _ => false,
    }
}

impl From<sqlx::Error> for PointsError {
    fn from(err: sqlx::Error) -> Self {
        if is_transient(&err) {
            PointsError::TransientStorage(err.to_string())
        } else {
            PointsError::Storage(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_is_transient() {
        let err = PointsError::from(sqlx::Error::PoolTimedOut);
        assert!(err.is_retryable());
    }

    #[test]
    fn row_not_found_is_permanent() {
        let err = PointsError::from(sqlx::Error::RowNotFound);
        assert!(!err.is_retryable());
        assert!(matches!(err, PointsError::Storage(_)));
    }

    #[test]
    fn timeout_is_retryable_but_business_failures_are_not() {
        assert!(PointsError::Timeout.is_retryable());
        assert!(!PointsError::InsufficientPoints { balance: 10, cost: 20 }.is_retryable());
        assert!(!PointsError::IdempotencyMismatch.is_retryable());
    }
}
