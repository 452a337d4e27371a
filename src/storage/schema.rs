//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query
//! building, plus the DDL for each backend. The single partial unique index
//! on `points_ledger (user_id, operation_id)` is what makes every mutating
//! operation, earn and spend alike, deduplicable at the ledger level.

use sea_query::Iden;

/// Balance table schema: one row per user, created lazily on first award.
#[derive(Iden)]
pub enum PointsBalance {
    Table,
    #[iden = "user_id"]
    UserId,
    #[iden = "points_total"]
    PointsTotal,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// Ledger table schema: append-only signed point deltas.
#[derive(Iden)]
pub enum PointsLedger {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "user_id"]
    UserId,
    #[iden = "operation_id"]
    OperationId,
    #[iden = "points_delta"]
    PointsDelta,
    #[iden = "reason"]
    Reason,
    #[iden = "created_at"]
    CreatedAt,
}

/// Tier ladder table schema.
#[derive(Iden)]
pub enum Tiers {
    Table,
    #[iden = "tier_name"]
    TierName,
    #[iden = "min_points"]
    MinPoints,
    #[iden = "multiplier"]
    Multiplier,
}

/// Reward catalog table schema.
#[derive(Iden)]
pub enum RewardsCatalog {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "title"]
    Title,
    #[iden = "type"]
    Type,
    #[iden = "points_cost"]
    PointsCost,
    #[iden = "partner"]
    Partner,
    #[iden = "status"]
    Status,
    #[iden = "created_at"]
    CreatedAt,
}

/// Redemptions table schema.
#[derive(Iden)]
pub enum Redemptions {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "user_id"]
    UserId,
    #[iden = "reward_id"]
    RewardId,
    #[iden = "points_spent"]
    PointsSpent,
    #[iden = "status"]
    Status,
    #[iden = "created_at"]
    CreatedAt,
}

/// Idempotency record table schema.
#[derive(Iden)]
pub enum IdempotencyKeys {
    Table,
    #[iden = "owner_id"]
    OwnerId,
    #[iden = "endpoint"]
    Endpoint,
    #[iden = "idempotency_key"]
    IdempotencyKey,
    #[iden = "request_hash"]
    RequestHash,
    #[iden = "response_status"]
    ResponseStatus,
    #[iden = "response_body"]
    ResponseBody,
}

/// Audit log table schema.
#[derive(Iden)]
pub enum AuditLogs {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "user_id"]
    UserId,
    #[iden = "action"]
    Action,
    #[iden = "entity_type"]
    EntityType,
    #[iden = "entity_id"]
    EntityId,
    #[iden = "ip"]
    Ip,
    #[iden = "user_agent"]
    UserAgent,
    #[iden = "metadata"]
    Metadata,
    #[iden = "created_at"]
    CreatedAt,
}

/// SQL for creating all points tables on SQLite.
pub const CREATE_TABLES_SQLITE: &str = r#"
CREATE TABLE IF NOT EXISTS points_balance (
    user_id TEXT PRIMARY KEY,
    points_total INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS points_ledger (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    operation_id TEXT,
    points_delta INTEGER NOT NULL,
    reason TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_ledger_user_operation
    ON points_ledger(user_id, operation_id)
    WHERE operation_id IS NOT NULL;

CREATE INDEX IF NOT EXISTS idx_ledger_user ON points_ledger(user_id);

CREATE TABLE IF NOT EXISTS tiers (
    tier_name TEXT PRIMARY KEY,
    min_points INTEGER NOT NULL,
    multiplier REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS rewards_catalog (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    type TEXT NOT NULL,
    points_cost INTEGER NOT NULL,
    partner TEXT,
    status TEXT NOT NULL DEFAULT 'ACTIVE',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS redemptions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    reward_id INTEGER NOT NULL,
    points_spent INTEGER NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS idempotency_keys (
    owner_id TEXT NOT NULL,
    endpoint TEXT NOT NULL,
    idempotency_key TEXT NOT NULL,
    request_hash TEXT NOT NULL,
    response_status INTEGER NOT NULL,
    response_body TEXT NOT NULL,
    PRIMARY KEY (owner_id, idempotency_key)
);

CREATE TABLE IF NOT EXISTS audit_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT,
    action TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    entity_id TEXT,
    ip TEXT,
    user_agent TEXT,
    metadata TEXT,
    created_at TEXT NOT NULL
);
"#;

/// SQL for creating all points tables on PostgreSQL.
#[cfg(feature = "postgres")]
pub const CREATE_TABLES_POSTGRES: &str = r#"
CREATE TABLE IF NOT EXISTS points_balance (
    user_id TEXT PRIMARY KEY,
    points_total BIGINT NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS points_ledger (
    id BIGSERIAL PRIMARY KEY,
    user_id TEXT NOT NULL,
    operation_id TEXT,
    points_delta BIGINT NOT NULL,
    reason TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_ledger_user_operation
    ON points_ledger(user_id, operation_id)
    WHERE operation_id IS NOT NULL;

CREATE INDEX IF NOT EXISTS idx_ledger_user ON points_ledger(user_id);

CREATE TABLE IF NOT EXISTS tiers (
    tier_name TEXT PRIMARY KEY,
    min_points BIGINT NOT NULL,
    multiplier DOUBLE PRECISION NOT NULL
);

CREATE TABLE IF NOT EXISTS rewards_catalog (
    id BIGSERIAL PRIMARY KEY,
    title TEXT NOT NULL,
    type TEXT NOT NULL,
    points_cost BIGINT NOT NULL,
    partner TEXT,
    status TEXT NOT NULL DEFAULT 'ACTIVE',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS redemptions (
    id BIGSERIAL PRIMARY KEY,
    user_id TEXT NOT NULL,
    reward_id BIGINT NOT NULL,
    points_spent BIGINT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS idempotency_keys (
    owner_id TEXT NOT NULL,
    endpoint TEXT NOT NULL,
    idempotency_key TEXT NOT NULL,
    request_hash TEXT NOT NULL,
    response_status INTEGER NOT NULL,
    response_body TEXT NOT NULL,
    PRIMARY KEY (owner_id, idempotency_key)
);

CREATE TABLE IF NOT EXISTS audit_logs (
    id BIGSERIAL PRIMARY KEY,
    user_id TEXT,
    action TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    entity_id TEXT,
    ip TEXT,
    user_agent TEXT,
    metadata TEXT,
    created_at TEXT NOT NULL
);
"#;
