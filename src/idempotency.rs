//! Request-level idempotency guard.
//!
//! Wraps Award and Redeem at the request boundary: a retry bearing the same
//! idempotency key receives the stored response instead of re-running the
//! operation. The guard is a cache, not the correctness mechanism; the
//! ledger-level unique constraint is what actually prevents double-applying
//! an operation.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::{PointsError, Result};
use crate::interfaces::IdempotencyStore;
use crate::model::IdempotencyRecord;

/// Outcome of consulting the guard before running an operation.
#[derive(Debug)]
pub enum GuardDecision {
    /// No record for this key: run the operation, then store its response.
    Proceed,
    /// A response was already stored for this key; return it verbatim.
    Replay { status: i32, body: String },
}

/// Fingerprint of a request: endpoint tag plus raw body, SHA-256 hex.
pub fn request_fingerprint(endpoint: &str, body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(endpoint.as_bytes());
    hasher.update(b" ");
    hasher.update(body);
    hex::encode(hasher.finalize())
}

/// Dedup guard keyed on (owner id, idempotency key).
pub struct IdempotencyGuard {
    store: Arc<dyn IdempotencyStore>,
}

impl IdempotencyGuard {
    pub fn new(store: Arc<dyn IdempotencyStore>) -> Self {
        Self { store }
    }

    /// Look up a stored response for `(owner_id, key)`.
    ///
    /// A hit whose fingerprint differs from the stored one is rejected: the
    /// same key with a different body is a caller bug, not a retry, and must
    /// not be served someone else's response.
    pub async fn check(
        &self,
        owner_id: &str,
        key: &str,
        fingerprint: &str,
    ) -> Result<GuardDecision> {
        match self.store.get(owner_id, key).await? {
            None => Ok(GuardDecision::Proceed),
            Some(record) if record.request_hash == fingerprint => Ok(GuardDecision::Replay {
                status: record.response_status,
                body: record.response_body,
            }),
            Some(_) => Err(PointsError::IdempotencyMismatch),
        }
    }

    /// Store the response after the operation committed.
    ///
    /// Failures are logged and dropped: a concurrent first writer winning
    /// the insert is expected, and losing the cache record only costs a
    /// retry its shortcut. Note this store is not atomic with the business
    /// transaction; a crash in between leaves the effect applied with no
    /// record, and the ledger constraint catches the retry.
    pub async fn store(&self, record: IdempotencyRecord) {
        if let Err(err) = self.store.put(&record).await {
            warn!(
                owner_id = %record.owner_id,
                key = %record.idempotency_key,
                error = %err,
                "failed to store idempotency record"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct MemIdempotencyStore {
        records: Mutex<HashMap<(String, String), IdempotencyRecord>>,
    }

    #[async_trait]
    impl IdempotencyStore for MemIdempotencyStore {
        async fn get(&self, owner_id: &str, key: &str) -> Result<Option<IdempotencyRecord>> {
            let records = self.records.lock().unwrap();
            Ok(records.get(&(owner_id.to_string(), key.to_string())).cloned())
        }

        async fn put(&self, record: &IdempotencyRecord) -> Result<()> {
            let mut records = self.records.lock().unwrap();
            records
                .entry((record.owner_id.clone(), record.idempotency_key.clone()))
                .or_insert_with(|| record.clone());
            Ok(())
        }
    }

    fn record(owner: &str, key: &str, hash: &str, body: &str) -> IdempotencyRecord {
        IdempotencyRecord {
            owner_id: owner.to_string(),
            endpoint: "redeem".to_string(),
            idempotency_key: key.to_string(),
            request_hash: hash.to_string(),
            response_status: 200,
            response_body: body.to_string(),
        }
    }

    #[test]
    fn fingerprint_is_deterministic_and_input_sensitive() {
        let a = request_fingerprint("redeem", b"{\"reward_id\":1}");
        let b = request_fingerprint("redeem", b"{\"reward_id\":1}");
        let c = request_fingerprint("redeem", b"{\"reward_id\":2}");
        let d = request_fingerprint("award", b"{\"reward_id\":1}");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn unknown_key_proceeds() {
        let guard = IdempotencyGuard::new(Arc::new(MemIdempotencyStore::default()));
        let decision = guard.check("u1", "k1", "fp").await.unwrap();
        assert!(matches!(decision, GuardDecision::Proceed));
    }

    #[tokio::test]
    async fn matching_fingerprint_replays_stored_response() {
        let guard = IdempotencyGuard::new(Arc::new(MemIdempotencyStore::default()));
        guard.store(record("u1", "k1", "fp", "{\"ok\":true}")).await;

        match guard.check("u1", "k1", "fp").await.unwrap() {
            GuardDecision::Replay { status, body } => {
                assert_eq!(status, 200);
                assert_eq!(body, "{\"ok\":true}");
            }
            GuardDecision::Proceed => panic!("expected replay"),
        }
    }

    #[tokio::test]
    async fn mismatched_fingerprint_is_rejected() {
        let guard = IdempotencyGuard::new(Arc::new(MemIdempotencyStore::default()));
        guard.store(record("u1", "k1", "fp", "{}")).await;

        let err = guard.check("u1", "k1", "other-fp").await.unwrap_err();
        assert!(matches!(err, PointsError::IdempotencyMismatch));
    }

    #[tokio::test]
    async fn first_writer_wins() {
        let guard = IdempotencyGuard::new(Arc::new(MemIdempotencyStore::default()));
        guard.store(record("u1", "k1", "fp", "first")).await;
        guard.store(record("u1", "k1", "fp", "second")).await;

        match guard.check("u1", "k1", "fp").await.unwrap() {
            GuardDecision::Replay { body, .. } => assert_eq!(body, "first"),
            GuardDecision::Proceed => panic!("expected replay"),
        }
    }

    #[tokio::test]
    async fn keys_are_scoped_per_owner() {
        let guard = IdempotencyGuard::new(Arc::new(MemIdempotencyStore::default()));
        guard.store(record("u1", "k1", "fp", "{}")).await;

        let decision = guard.check("u2", "k1", "fp").await.unwrap();
        assert!(matches!(decision, GuardDecision::Proceed));
    }
}
