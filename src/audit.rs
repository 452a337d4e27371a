//! Best-effort audit recording.

use std::sync::Arc;

use tracing::warn;

use crate::interfaces::AuditStore;
use crate::model::AuditEntry;

/// Action tag recorded for reward redemptions.
pub const ACTION_REWARD_REDEEM: &str = "reward_redeem";

/// Fire-and-forget recorder for the audit side channel.
///
/// Callers invoke it only after the business transaction commits. A write
/// failure is logged and discarded; it never rolls back or fails the parent
/// request.
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Append one entry, swallowing any storage failure.
    pub async fn record(&self, entry: AuditEntry) {
        if let Err(err) = self.store.append(&entry).await {
            warn!(action = %entry.action, error = %err, "audit write failed");
        }
    }
}
