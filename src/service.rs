//! External operation surface of the points core.
//!
//! Transport-agnostic: callers (HTTP handlers, bots, webhooks) hand in an
//! already-authenticated user id, money amounts in minor currency units, and
//! optionally an idempotency key plus the raw request body. Award and Redeem
//! are wrapped by the idempotency guard and bounded by a request timeout;
//! a timed-out transaction is dropped and rolls back without partial writes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audit::{AuditRecorder, ACTION_REWARD_REDEEM};
use crate::config::PointsConfig;
use crate::error::{PointsError, Result};
use crate::idempotency::{request_fingerprint, GuardDecision, IdempotencyGuard};
use crate::interfaces::{AuditStore, IdempotencyStore, PointsStore};
use crate::model::{
    AuditEntry, IdempotencyRecord, LedgerEntry, PointsSummary, RedemptionStatus, RewardCatalogItem,
};

const ENDPOINT_AWARD: &str = "award";
const ENDPOINT_REDEEM: &str = "redeem";

/// Response status stored alongside cached responses. The core has no
/// transport of its own; the value is carried verbatim for the HTTP layer
/// to replay.
const REPLAY_STATUS_OK: i32 = 200;

/// Per-request metadata supplied by the transport layer.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Caller-supplied token scoping one logical write across retries.
    pub idempotency_key: Option<String>,
    /// Raw request body; fingerprinted for replay validation and recorded
    /// as audit metadata.
    pub raw_body: Vec<u8>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AwardRequest {
    pub user_id: String,
    /// Id of the originating financial transaction. Doubles as the ledger
    /// dedup key: at most one earn is applied per source transaction.
    pub source_transaction_id: Option<String>,
    pub amount_minor_units: i64,
    /// Ledger reason tag, e.g. "earn".
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwardOutcome {
    pub points_awarded: i64,
}

#[derive(Debug, Clone)]
pub struct RedeemRequest {
    pub user_id: String,
    pub reward_id: i64,
    /// Caller-supplied dedup key for the spend ledger entry.
    pub operation_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemOutcome {
    pub redemption_id: i64,
    pub points_spent: i64,
    pub status: RedemptionStatus,
}

/// The points core service: ledger, balance, tiers, redemptions, dedup.
pub struct PointsService {
    store: Arc<dyn PointsStore>,
    guard: IdempotencyGuard,
    audit: AuditRecorder,
    ledger_page_size: u32,
    request_timeout: Duration,
}

impl PointsService {
    pub fn new(
        store: Arc<dyn PointsStore>,
        idempotency: Arc<dyn IdempotencyStore>,
        audit: Arc<dyn AuditStore>,
        config: &PointsConfig,
    ) -> Self {
        Self {
            store,
            guard: IdempotencyGuard::new(idempotency),
            audit: AuditRecorder::new(audit),
            ledger_page_size: config.ledger_page_size,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// Award points for a financial transaction.
    ///
    /// An award too small to earn a point is a successful zero outcome.
    pub async fn award_points(
        &self,
        req: &AwardRequest,
        ctx: &RequestContext,
    ) -> Result<AwardOutcome> {
        if req.reason.trim().is_empty() {
            return Err(PointsError::Validation("reason is required".to_string()));
        }

        let fingerprint = ctx
            .idempotency_key
            .as_ref()
            .map(|_| request_fingerprint(ENDPOINT_AWARD, &ctx.raw_body));
        if let Some(body) = self.replay(&req.user_id, ctx, &fingerprint).await? {
            return Ok(serde_json::from_str(&body)?);
        }

        let awarded = self
            .bounded(self.store.award_points(
                &req.user_id,
                req.source_transaction_id.as_deref(),
                req.amount_minor_units,
                &req.reason,
            ))
            .await?;

        let outcome = AwardOutcome {
            points_awarded: awarded,
        };
        self.cache_response(&req.user_id, ENDPOINT_AWARD, ctx, &fingerprint, &outcome)
            .await;

        Ok(outcome)
    }

    /// Spend points on a catalog reward.
    pub async fn redeem(&self, req: &RedeemRequest, ctx: &RequestContext) -> Result<RedeemOutcome> {
        if req.reward_id <= 0 {
            return Err(PointsError::Validation("reward_id is required".to_string()));
        }

        let fingerprint = ctx
            .idempotency_key
            .as_ref()
            .map(|_| request_fingerprint(ENDPOINT_REDEEM, &ctx.raw_body));
        if let Some(body) = self.replay(&req.user_id, ctx, &fingerprint).await? {
            return Ok(serde_json::from_str(&body)?);
        }

        let redemption = self
            .bounded(
                self.store
                    .redeem(&req.user_id, req.reward_id, req.operation_id.as_deref()),
            )
            .await?;

        // The redemption transaction has committed; the audit write is a
        // best-effort side channel from here on.
        self.audit
            .record(AuditEntry {
                user_id: Some(req.user_id.clone()),
                action: ACTION_REWARD_REDEEM.to_string(),
                entity_type: "reward".to_string(),
                entity_id: Some(redemption.id.to_string()),
                ip: ctx.ip.clone(),
                user_agent: ctx.user_agent.clone(),
                metadata: (!ctx.raw_body.is_empty())
                    .then(|| String::from_utf8_lossy(&ctx.raw_body).into_owned()),
            })
            .await;

        let outcome = RedeemOutcome {
            redemption_id: redemption.id,
            points_spent: redemption.points_spent,
            status: redemption.status,
        };
        self.cache_response(&req.user_id, ENDPOINT_REDEEM, ctx, &fingerprint, &outcome)
            .await;

        Ok(outcome)
    }

    /// Current total and tier progress for a user.
    pub async fn get_points_summary(&self, user_id: &str) -> Result<PointsSummary> {
        self.bounded(self.store.points_summary(user_id)).await
    }

    /// Most-recent-first ledger page; `None` or 0 means the configured
    /// page size, which is also the cap.
    pub async fn get_ledger(&self, user_id: &str, limit: Option<u32>) -> Result<Vec<LedgerEntry>> {
        let limit = match limit {
            Some(n) if n > 0 => n.min(self.ledger_page_size),
            _ => self.ledger_page_size,
        };
        self.bounded(self.store.ledger(user_id, limit)).await
    }

    /// The reward catalog, ordered by id.
    pub async fn list_rewards(&self) -> Result<Vec<RewardCatalogItem>> {
        self.bounded(self.store.list_rewards()).await
    }

    /// Consult the guard; `Some(body)` short-circuits the operation with the
    /// previously stored response.
    async fn replay(
        &self,
        owner_id: &str,
        ctx: &RequestContext,
        fingerprint: &Option<String>,
    ) -> Result<Option<String>> {
        let (Some(key), Some(fp)) = (&ctx.idempotency_key, fingerprint) else {
            return Ok(None);
        };
        match self.guard.check(owner_id, key, fp).await? {
            GuardDecision::Proceed => Ok(None),
            GuardDecision::Replay { body, .. } => Ok(Some(body)),
        }
    }

    /// Store the response for future replays, best-effort.
    async fn cache_response<T: Serialize>(
        &self,
        owner_id: &str,
        endpoint: &str,
        ctx: &RequestContext,
        fingerprint: &Option<String>,
        response: &T,
    ) {
        let (Some(key), Some(fp)) = (&ctx.idempotency_key, fingerprint) else {
            return;
        };
        // Serializing our own outcome types cannot realistically fail; if it
        // does, the retry just loses its shortcut.
        let Ok(body) = serde_json::to_string(response) else {
            return;
        };
        self.guard
            .store(IdempotencyRecord {
                owner_id: owner_id.to_string(),
                endpoint: endpoint.to_string(),
                idempotency_key: key.clone(),
                request_hash: fp.clone(),
                response_status: REPLAY_STATUS_OK,
                response_body: body,
            })
            .await;
    }

    /// Bound a storage operation by the configured request timeout. The
    /// dropped future rolls back its transaction.
    async fn bounded<T>(&self, operation: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.request_timeout, operation)
            .await
            .map_err(|_| PointsError::Timeout)?
    }
}
