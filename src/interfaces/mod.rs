//! Abstract interfaces for the points core.
//!
//! These traits define the contracts for:
//! - Points storage (ledger, balance, redemption transactions)
//! - Idempotency record storage (request-level dedup)
//! - Audit log storage (best-effort side channel)

pub mod audit_store;
pub mod idempotency_store;
pub mod points_store;

pub use audit_store::AuditStore;
pub use idempotency_store::IdempotencyStore;
pub use points_store::PointsStore;
