//! Points storage interface.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{LedgerEntry, PointsSummary, Redemption, RewardCatalogItem};

/// Interface for the transactional points store.
///
/// Every mutating operation runs as a single ACID transaction holding an
/// exclusive lock on the user's balance row for its duration, so concurrent
/// awards and redemptions for one user serialize while other users proceed
/// in parallel. Whatever happens, the invariant
/// `points_balance.points_total == sum(points_ledger.points_delta)` holds
/// for every user once the transaction ends.
///
/// Implementations:
/// - `SqlitePointsStore`: SQLite storage
/// - `PgPointsStore`: PostgreSQL storage
#[async_trait]
pub trait PointsStore: Send + Sync {
    /// Award points for a financial transaction of `amount_minor_units`.
    ///
    /// Base points are `floor(amount / earn_divisor)`, scaled by the
    /// multiplier of the user's tier *before* the award. Returns the points
    /// actually awarded; 0 is a successful no-op (amount too small, or a
    /// duplicate `operation_id` already recorded in the ledger; in the
    /// duplicate case neither the ledger nor the balance is touched).
    async fn award_points(
        &self,
        user_id: &str,
        operation_id: Option<&str>,
        amount_minor_units: i64,
        reason: &str,
    ) -> Result<i64>;

    /// Atomically spend points on a catalog reward.
    ///
    /// Fails with `RewardNotFound` / `RewardInactive` / `InsufficientPoints`
    /// without writing anything. On success a `Redemption` in state
    /// REQUESTED exists, the ledger holds a matching negative delta, and the
    /// balance is decremented, all in one transaction.
    async fn redeem(
        &self,
        user_id: &str,
        reward_id: i64,
        operation_id: Option<&str>,
    ) -> Result<Redemption>;

    /// Current total and tier progress for a user (zero balance if the user
    /// has never earned).
    async fn points_summary(&self, user_id: &str) -> Result<PointsSummary>;

    /// Most-recent-first ledger page for a user.
    async fn ledger(&self, user_id: &str, limit: u32) -> Result<Vec<LedgerEntry>>;

    /// The reward catalog, ordered by id.
    async fn list_rewards(&self) -> Result<Vec<RewardCatalogItem>>;
}
