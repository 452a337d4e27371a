//! Audit log storage interface.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::AuditEntry;

/// Interface for the append-only audit side channel.
///
/// Writes happen after the business transaction commits and are best-effort:
/// the caller logs and discards failures rather than failing the request.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append one audit entry.
    async fn append(&self, entry: &AuditEntry) -> Result<()>;
}
