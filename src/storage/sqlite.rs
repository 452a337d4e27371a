//! SQLite implementations of storage interfaces.

use async_trait::async_trait;
use sea_query::{Expr, OnConflict, Order, Query, SqliteQueryBuilder};
use sqlx::{Row, SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{PointsError, Result};
use crate::interfaces::{AuditStore, IdempotencyStore, PointsStore};
use crate::model::{
    AuditEntry, IdempotencyRecord, LedgerEntry, PointsSummary, Redemption, RedemptionStatus,
    RewardCatalogItem, REASON_REDEEM,
};
use crate::tier::{self, Tier};

use super::schema::{
    AuditLogs, IdempotencyKeys, PointsBalance, PointsLedger, RewardsCatalog, Tiers,
    CREATE_TABLES_SQLITE,
};

/// SQLite has no `SELECT ... FOR UPDATE`. Issuing a no-op update as the first
/// statement of the transaction forces it to take the database write lock
/// before the balance is read, which serializes all mutating transactions
/// and subsumes the per-user row lock the contract requires. `busy_timeout`
/// on the connection bounds how long a blocked transaction waits.
const LOCK_BALANCE: &str = "UPDATE points_balance SET points_total = points_total WHERE user_id = ?";

/// Ledger insert guarded by the partial unique index on
/// (user_id, operation_id). A conflicting row leaves rows_affected at 0.
const INSERT_LEDGER: &str = r#"
INSERT INTO points_ledger (user_id, operation_id, points_delta, reason, created_at)
VALUES (?, ?, ?, ?, ?)
ON CONFLICT DO NOTHING
"#;

/// Additive balance upsert: a concurrent first-award cannot overwrite a
/// sibling's delta because the increment happens in the statement itself.
const UPSERT_BALANCE: &str = r#"
INSERT INTO points_balance (user_id, points_total, updated_at)
VALUES (?, ?, ?)
ON CONFLICT (user_id) DO UPDATE
SET points_total = points_balance.points_total + excluded.points_total,
    updated_at = excluded.updated_at
"#;

const INSERT_REDEMPTION: &str = r#"
INSERT INTO redemptions (user_id, reward_id, points_spent, status, created_at)
VALUES (?, ?, ?, ?, ?)
RETURNING id
"#;

const DECREMENT_BALANCE: &str = r#"
UPDATE points_balance
SET points_total = points_total - ?,
    updated_at = ?
WHERE user_id = ?
"#;

async fn fetch_balance<'e, E>(executor: E, user_id: &str) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let query = Query::select()
        .column(PointsBalance::PointsTotal)
        .from(PointsBalance::Table)
        .and_where(Expr::col(PointsBalance::UserId).eq(user_id))
        .to_string(SqliteQueryBuilder);

    let row = sqlx::query(&query).fetch_optional(executor).await?;
    Ok(row.map(|r| r.get::<i64, _>("points_total")).unwrap_or(0))
}

async fn load_ladder<'e, E>(executor: E) -> Result<Vec<Tier>>
where
    E: SqliteExecutor<'e>,
{
    let query = Query::select()
        .columns([Tiers::TierName, Tiers::MinPoints, Tiers::Multiplier])
        .from(Tiers::Table)
        .order_by(Tiers::MinPoints, Order::Asc)
        .to_string(SqliteQueryBuilder);

    let rows = sqlx::query(&query).fetch_all(executor).await?;

    let ladder = rows
        .iter()
        .map(|row| Tier {
            name: row.get("tier_name"),
            min_points: row.get("min_points"),
            multiplier: row.get("multiplier"),
        })
        .collect();

    Ok(tier::ladder_or_default(ladder))
}

/// SQLite implementation of PointsStore.
pub struct SqlitePointsStore {
    pool: SqlitePool,
    earn_divisor: i64,
}

impl SqlitePointsStore {
    /// Create a new SQLite points store earning one base point per
    /// `earn_divisor` minor currency units.
    pub fn new(pool: SqlitePool, earn_divisor: i64) -> Self {
        Self {
            pool,
            earn_divisor: earn_divisor.max(1),
        }
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> Result<()> {
        sqlx::raw_sql(CREATE_TABLES_SQLITE)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PointsStore for SqlitePointsStore {
    async fn award_points(
        &self,
        user_id: &str,
        operation_id: Option<&str>,
        amount_minor_units: i64,
        reason: &str,
    ) -> Result<i64> {
        if amount_minor_units <= 0 || amount_minor_units / self.earn_divisor <= 0 {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(LOCK_BALANCE)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let current = fetch_balance(&mut *tx, user_id).await?;
        let ladder = load_ladder(&mut *tx).await?;
        let status = tier::resolve(&ladder, current);
        let awarded =
            tier::points_for_amount(amount_minor_units, self.earn_divisor, status.current.multiplier);

        if awarded == 0 {
            tx.commit().await?;
            return Ok(0);
        }

        let now = chrono::Utc::now().to_rfc3339();

        let inserted = sqlx::query(INSERT_LEDGER)
            .bind(user_id)
            .bind(operation_id)
            .bind(awarded)
            .bind(reason)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        // The ledger insert and the balance upsert are one guarded decision:
        // a dedup hit on the operation id skips both.
        if inserted.rows_affected() == 0 {
            debug!(user_id, operation_id = ?operation_id, "duplicate earn skipped");
            tx.commit().await?;
            return Ok(0);
        }

        sqlx::query(UPSERT_BALANCE)
            .bind(user_id)
            .bind(awarded)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(awarded)
    }

    async fn redeem(
        &self,
        user_id: &str,
        reward_id: i64,
        operation_id: Option<&str>,
    ) -> Result<Redemption> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(LOCK_BALANCE)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let balance = fetch_balance(&mut *tx, user_id).await?;

        let query = Query::select()
            .columns([RewardsCatalog::PointsCost, RewardsCatalog::Status])
            .from(RewardsCatalog::Table)
            .and_where(Expr::col(RewardsCatalog::Id).eq(reward_id))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&mut *tx).await?;
        let row = row.ok_or(PointsError::RewardNotFound(reward_id))?;
        let cost: i64 = row.get("points_cost");
        let reward_status: String = row.get("status");

        if !reward_status.eq_ignore_ascii_case("ACTIVE") {
            return Err(PointsError::RewardInactive(reward_id));
        }
        if balance < cost {
            return Err(PointsError::InsufficientPoints { balance, cost });
        }

        let now = chrono::Utc::now().to_rfc3339();

        let row = sqlx::query(INSERT_REDEMPTION)
            .bind(user_id)
            .bind(reward_id)
            .bind(cost)
            .bind(RedemptionStatus::Requested.as_str())
            .bind(&now)
            .fetch_one(&mut *tx)
            .await?;
        let redemption_id: i64 = row.get("id");

        let inserted = sqlx::query(INSERT_LEDGER)
            .bind(user_id)
            .bind(operation_id)
            .bind(-cost)
            .bind(REASON_REDEEM)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        // A replayed spend must not mint a second redemption. Dropping the
        // transaction rolls back the redemption row written above.
        if inserted.rows_affected() == 0 {
            return Err(PointsError::DuplicateOperation(
                operation_id.unwrap_or_default().to_string(),
            ));
        }

        sqlx::query(DECREMENT_BALANCE)
            .bind(cost)
            .bind(&now)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Redemption {
            id: redemption_id,
            user_id: user_id.to_string(),
            reward_id,
            points_spent: cost,
            status: RedemptionStatus::Requested,
            created_at: now,
        })
    }

    async fn points_summary(&self, user_id: &str) -> Result<PointsSummary> {
        let total = fetch_balance(&self.pool, user_id).await?;
        let ladder = load_ladder(&self.pool).await?;
        let status = tier::resolve(&ladder, total);

        Ok(PointsSummary {
            points_total: total,
            tier: status.current.name,
            multiplier: status.current.multiplier,
            next_tier: status.next.name,
            next_tier_min_points: status.next.min_points,
            progress_to_next: status.progress,
        })
    }

    async fn ledger(&self, user_id: &str, limit: u32) -> Result<Vec<LedgerEntry>> {
        let query = Query::select()
            .columns([
                PointsLedger::Id,
                PointsLedger::PointsDelta,
                PointsLedger::Reason,
                PointsLedger::OperationId,
                PointsLedger::CreatedAt,
            ])
            .from(PointsLedger::Table)
            .and_where(Expr::col(PointsLedger::UserId).eq(user_id))
            .order_by(PointsLedger::Id, Order::Desc)
            .limit(limit as u64)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let entries = rows
            .iter()
            .map(|row| LedgerEntry {
                id: row.get("id"),
                points_delta: row.get("points_delta"),
                reason: row.get("reason"),
                operation_id: row.get("operation_id"),
                created_at: row.get("created_at"),
            })
            .collect();

        Ok(entries)
    }

    async fn list_rewards(&self) -> Result<Vec<RewardCatalogItem>> {
        let query = Query::select()
            .columns([
                RewardsCatalog::Id,
                RewardsCatalog::Title,
                RewardsCatalog::Type,
                RewardsCatalog::PointsCost,
                RewardsCatalog::Partner,
                RewardsCatalog::Status,
                RewardsCatalog::CreatedAt,
            ])
            .from(RewardsCatalog::Table)
            .order_by(RewardsCatalog::Id, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let rewards = rows
            .iter()
            .map(|row| RewardCatalogItem {
                id: row.get("id"),
                title: row.get("title"),
                reward_type: row.get("type"),
                points_cost: row.get("points_cost"),
                partner: row.get("partner"),
                status: row.get("status"),
                created_at: row.get("created_at"),
            })
            .collect();

        Ok(rewards)
    }
}

/// SQLite implementation of IdempotencyStore.
pub struct SqliteIdempotencyStore {
    pool: SqlitePool,
}

impl SqliteIdempotencyStore {
    /// Create a new SQLite idempotency store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdempotencyStore for SqliteIdempotencyStore {
    async fn get(&self, owner_id: &str, key: &str) -> Result<Option<IdempotencyRecord>> {
        let query = Query::select()
            .columns([
                IdempotencyKeys::OwnerId,
                IdempotencyKeys::Endpoint,
                IdempotencyKeys::IdempotencyKey,
                IdempotencyKeys::RequestHash,
                IdempotencyKeys::ResponseStatus,
                IdempotencyKeys::ResponseBody,
            ])
            .from(IdempotencyKeys::Table)
            .and_where(Expr::col(IdempotencyKeys::OwnerId).eq(owner_id))
            .and_where(Expr::col(IdempotencyKeys::IdempotencyKey).eq(key))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        Ok(row.map(|row| IdempotencyRecord {
            owner_id: row.get("owner_id"),
            endpoint: row.get("endpoint"),
            idempotency_key: row.get("idempotency_key"),
            request_hash: row.get("request_hash"),
            response_status: row.get("response_status"),
            response_body: row.get("response_body"),
        }))
    }

    async fn put(&self, record: &IdempotencyRecord) -> Result<()> {
        let query = Query::insert()
            .into_table(IdempotencyKeys::Table)
            .columns([
                IdempotencyKeys::OwnerId,
                IdempotencyKeys::Endpoint,
                IdempotencyKeys::IdempotencyKey,
                IdempotencyKeys::RequestHash,
                IdempotencyKeys::ResponseStatus,
                IdempotencyKeys::ResponseBody,
            ])
            .values_panic([
                record.owner_id.clone().into(),
                record.endpoint.clone().into(),
                record.idempotency_key.clone().into(),
                record.request_hash.clone().into(),
                record.response_status.into(),
                record.response_body.clone().into(),
            ])
            .on_conflict(
                OnConflict::columns([IdempotencyKeys::OwnerId, IdempotencyKeys::IdempotencyKey])
                    .do_nothing()
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;

        Ok(())
    }
}

/// SQLite implementation of AuditStore.
pub struct SqliteAuditStore {
    pool: SqlitePool,
}

impl SqliteAuditStore {
    /// Create a new SQLite audit store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn append(&self, entry: &AuditEntry) -> Result<()> {
        let created_at = chrono::Utc::now().to_rfc3339();

        let query = Query::insert()
            .into_table(AuditLogs::Table)
            .columns([
                AuditLogs::UserId,
                AuditLogs::Action,
                AuditLogs::EntityType,
                AuditLogs::EntityId,
                AuditLogs::Ip,
                AuditLogs::UserAgent,
                AuditLogs::Metadata,
                AuditLogs::CreatedAt,
            ])
            .values_panic([
                entry.user_id.clone().into(),
                entry.action.clone().into(),
                entry.entity_type.clone().into(),
                entry.entity_id.clone().into(),
                entry.ip.clone().into(),
                entry.user_agent.clone().into(),
                entry.metadata.clone().into(),
                created_at.into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;

        Ok(())
    }
}
