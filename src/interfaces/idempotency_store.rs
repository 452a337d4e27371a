//! Idempotency record storage interface.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::IdempotencyRecord;

/// Interface for idempotency record persistence.
///
/// Records are write-once: `put` must be a first-writer-wins insert keyed on
/// `(owner_id, idempotency_key)`, silently dropping a conflicting concurrent
/// insert. The ledger-level uniqueness constraint is the real safety net;
/// this cache only short-circuits retries at the request boundary.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Fetch the stored response for `(owner_id, key)`, if any.
    async fn get(&self, owner_id: &str, key: &str) -> Result<Option<IdempotencyRecord>>;

    /// Store a response record. A record already present for the same
    /// `(owner_id, key)` wins; the insert is dropped without error.
    async fn put(&self, record: &IdempotencyRecord) -> Result<()>;
}
