//! Data model for the points ledger and its collaborators.

use serde::{Deserialize, Serialize};

/// Ledger reason tag written by the redemption engine.
pub const REASON_REDEEM: &str = "redeem_reward";

/// One immutable row of the append-only points ledger.
///
/// The running balance must always reconcile against the sum of these
/// deltas for a user. `operation_id` is the caller-supplied dedup key: for
/// earn entries it is the originating transaction id, for spends it is an
/// optional retry token. At most one ledger row may exist per
/// `(user_id, operation_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub points_delta: i64,
    pub reason: String,
    pub operation_id: Option<String>,
    pub created_at: String,
}

/// A reward as listed in the catalog. Read-only from the core's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardCatalogItem {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub reward_type: String,
    pub points_cost: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner: Option<String>,
    pub status: String,
    pub created_at: String,
}

impl RewardCatalogItem {
    /// Reward status check, case-insensitive as the catalog is hand-edited.
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("ACTIVE")
    }
}

/// Lifecycle of a redemption.
///
/// Only `Requested` is reachable today; fulfillment is owned by a downstream
/// system. The full machine is modelled so a transition added later cannot
/// bypass validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedemptionStatus {
    Requested,
    Fulfilled,
    Rejected,
    Refunded,
}

impl RedemptionStatus {
    /// Valid transitions: REQUESTED -> {FULFILLED, REJECTED, REFUNDED}.
    /// Every other state is terminal.
    pub fn can_transition(self, next: RedemptionStatus) -> bool {
        matches!(self, RedemptionStatus::Requested) && next != RedemptionStatus::Requested
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RedemptionStatus::Requested => "REQUESTED",
            RedemptionStatus::Fulfilled => "FULFILLED",
            RedemptionStatus::Rejected => "REJECTED",
            RedemptionStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "REQUESTED" => Some(RedemptionStatus::Requested),
            "FULFILLED" => Some(RedemptionStatus::Fulfilled),
            "REJECTED" => Some(RedemptionStatus::Rejected),
            "REFUNDED" => Some(RedemptionStatus::Refunded),
            _ => None,
        }
    }
}

/// A record of spending points against a catalog reward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Redemption {
    pub id: i64,
    pub user_id: String,
    pub reward_id: i64,
    pub points_spent: i64,
    pub status: RedemptionStatus,
    pub created_at: String,
}

impl Redemption {
    /// Apply a status transition, rejecting anything the state machine
    /// does not allow.
    pub fn transition(&mut self, next: RedemptionStatus) -> crate::error::Result<()> {
        if !self.status.can_transition(next) {
            return Err(crate::error::PointsError::Validation(format!(
                "invalid redemption transition {} -> {}",
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        Ok(())
    }
}

/// Tier progress summary for a user, shaped for the read path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsSummary {
    pub points_total: i64,
    pub tier: String,
    pub multiplier: f64,
    pub next_tier: String,
    pub next_tier_min_points: i64,
    pub progress_to_next: f64,
}

/// Cached response for one distinct (owner, idempotency key) pair.
/// Created once, never updated; a concurrent duplicate insert loses silently.
#[derive(Debug, Clone)]
pub struct IdempotencyRecord {
    pub owner_id: String,
    pub endpoint: String,
    pub idempotency_key: String,
    pub request_hash: String,
    pub response_status: i32,
    pub response_body: String,
}

/// Best-effort audit entry written after a redemption commits.
#[derive(Debug, Clone, Default)]
pub struct AuditEntry {
    pub user_id: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub metadata: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_can_reach_every_outcome() {
        for next in [
            RedemptionStatus::Fulfilled,
            RedemptionStatus::Rejected,
            RedemptionStatus::Refunded,
        ] {
            assert!(RedemptionStatus::Requested.can_transition(next));
        }
    }

    #[test]
    fn outcomes_are_terminal() {
        for from in [
            RedemptionStatus::Fulfilled,
            RedemptionStatus::Rejected,
            RedemptionStatus::Refunded,
        ] {
            assert!(!from.can_transition(RedemptionStatus::Requested));
            assert!(!from.can_transition(RedemptionStatus::Fulfilled));
        }
    }

    #[test]
    fn transition_updates_status() {
        let mut redemption = Redemption {
            id: 1,
            user_id: "u1".into(),
            reward_id: 7,
            points_spent: 200,
            status: RedemptionStatus::Requested,
            created_at: String::new(),
        };
        redemption.transition(RedemptionStatus::Fulfilled).unwrap();
        assert_eq!(redemption.status, RedemptionStatus::Fulfilled);
        assert!(redemption.transition(RedemptionStatus::Refunded).is_err());
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            RedemptionStatus::Requested,
            RedemptionStatus::Fulfilled,
            RedemptionStatus::Rejected,
            RedemptionStatus::Refunded,
        ] {
            assert_eq!(RedemptionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RedemptionStatus::parse("SHIPPED"), None);
    }

    #[test]
    fn reward_status_check_is_case_insensitive() {
        let mut reward = RewardCatalogItem {
            id: 1,
            title: "Coffee".into(),
            reward_type: "voucher".into(),
            points_cost: 200,
            partner: None,
            status: "active".into(),
            created_at: String::new(),
        };
        assert!(reward.is_active());
        reward.status = "INACTIVE".into();
        assert!(!reward.is_active());
    }
}
