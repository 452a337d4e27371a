//! Tier ladder resolution.
//!
//! Pure functions: a ladder of tiers ordered ascending by `min_points` and a
//! point total map to the current tier, the next tier, and the progress
//! between them. No caching; callers refresh the ladder per call.

use serde::{Deserialize, Serialize};

/// Name of the floor tier used when the ladder table is empty.
pub const FLOOR_TIER_NAME: &str = "STONE";

/// A named bracket of point totals conferring an earn multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub name: String,
    pub min_points: i64,
    pub multiplier: f64,
}

impl Tier {
    /// The `min_points = 0` floor that always exists.
    pub fn floor() -> Self {
        Tier {
            name: FLOOR_TIER_NAME.to_string(),
            min_points: 0,
            multiplier: 1.0,
        }
    }
}

/// Resolved position of a point total within the ladder.
#[derive(Debug, Clone)]
pub struct TierStatus {
    pub current: Tier,
    pub next: Tier,
    /// Fraction of the way from `current.min_points` to `next.min_points`,
    /// clamped to [0, 1]. 1.0 when already at the top tier.
    pub progress: f64,
}

/// Substitute the floor tier when the ladder is empty, otherwise keep it.
pub fn ladder_or_default(ladder: Vec<Tier>) -> Vec<Tier> {
    if ladder.is_empty() {
        vec![Tier::floor()]
    } else {
        ladder
    }
}

/// Resolve the tier for `total` against a non-empty ascending ladder.
///
/// The current tier is the one with the greatest `min_points <= total`; the
/// next tier is the one immediately above it, or the current tier itself at
/// the top of the ladder.
pub fn resolve(ladder: &[Tier], total: i64) -> TierStatus {
    debug_assert!(!ladder.is_empty());

    let mut current_idx = 0;
    for (i, tier) in ladder.iter().enumerate() {
        if total >= tier.min_points {
            current_idx = i;
        }
    }

    let current = ladder[current_idx].clone();
    let next = ladder.get(current_idx + 1).unwrap_or(&current).clone();

    let progress = if next.min_points > current.min_points {
        let span = (next.min_points - current.min_points) as f64;
        ((total - current.min_points) as f64 / span).clamp(0.0, 1.0)
    } else {
        1.0
    };

    TierStatus {
        current,
        next,
        progress,
    }
}

/// Points earned for a money amount in minor currency units.
///
/// `floor(amount / divisor)` base points scaled by the tier multiplier,
/// floored again. Non-positive amounts earn nothing.
pub fn points_for_amount(amount_minor_units: i64, earn_divisor: i64, multiplier: f64) -> i64 {
    if amount_minor_units <= 0 {
        return 0;
    }
    let base_points = amount_minor_units / earn_divisor;
    if base_points <= 0 {
        return 0;
    }
    (base_points as f64 * multiplier).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder() -> Vec<Tier> {
        vec![
            Tier {
                name: "STONE".into(),
                min_points: 0,
                multiplier: 1.0,
            },
            Tier {
                name: "SILVER".into(),
                min_points: 2000,
                multiplier: 1.05,
            },
            Tier {
                name: "OBSIDIAN".into(),
                min_points: 10000,
                multiplier: 1.1,
            },
        ]
    }

    #[test]
    fn tier_boundaries() {
        let ladder = ladder();
        let cases = [
            (0, "STONE"),
            (1999, "STONE"),
            (2000, "SILVER"),
            (9999, "SILVER"),
            (10000, "OBSIDIAN"),
            (50000, "OBSIDIAN"),
        ];
        for (total, expected) in cases {
            assert_eq!(resolve(&ladder, total).current.name, expected, "total={total}");
        }
    }

    #[test]
    fn multiplier_is_non_decreasing() {
        let ladder = ladder();
        let mut last = 0.0;
        for total in [0, 1, 1999, 2000, 5000, 9999, 10000, 100000] {
            let status = resolve(&ladder, total);
            assert!(status.current.multiplier >= last, "total={total}");
            last = status.current.multiplier;
        }
    }

    #[test]
    fn progress_stays_within_bounds() {
        let ladder = ladder();
        for total in [-50, 0, 1, 1000, 1999, 2000, 6000, 9999, 10000, 1_000_000] {
            let status = resolve(&ladder, total);
            assert!(
                (0.0..=1.0).contains(&status.progress),
                "total={total} progress={}",
                status.progress
            );
        }
    }

    #[test]
    fn top_tier_progress_is_complete() {
        let ladder = ladder();
        let status = resolve(&ladder, 10000);
        assert_eq!(status.next.name, "OBSIDIAN");
        assert_eq!(status.progress, 1.0);
    }

    #[test]
    fn next_tier_is_immediately_above() {
        let ladder = ladder();
        let status = resolve(&ladder, 100);
        assert_eq!(status.current.name, "STONE");
        assert_eq!(status.next.name, "SILVER");
        assert_eq!(status.next.min_points, 2000);
    }

    #[test]
    fn empty_ladder_falls_back_to_floor() {
        let ladder = ladder_or_default(Vec::new());
        assert_eq!(ladder.len(), 1);
        assert_eq!(ladder[0], Tier::floor());
        let status = resolve(&ladder, 12345);
        assert_eq!(status.current.name, FLOOR_TIER_NAME);
        assert_eq!(status.progress, 1.0);
    }

    #[test]
    fn award_math_matches_ladder_multipliers() {
        // 10000 minor units at STONE: 100 base * 1.0.
        assert_eq!(points_for_amount(10000, 100, 1.0), 100);
        // Same spend at SILVER: floor(100 * 1.05) = 105.
        assert_eq!(points_for_amount(10000, 100, 1.05), 105);
        // Amount too small to earn a point.
        assert_eq!(points_for_amount(99, 100, 1.1), 0);
        assert_eq!(points_for_amount(0, 100, 1.0), 0);
        assert_eq!(points_for_amount(-500, 100, 1.0), 0);
    }
}
