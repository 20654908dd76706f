//! Loyalty program domain types — tier catalog, accounts, and the
//! append-only points ledger.
//!
//! Accounts are bookkeeping records: `balance` always equals
//! `lifetime_earned - lifetime_redeemed - lifetime_expired` and never goes
//! negative. Ledger entries are immutable once appended; corrections are
//! new entries with the opposite sign.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Tier Catalog ───────────────────────────────────────────────────────────

/// One loyalty tier: a named rank with a point-threshold range, a discount
/// percentage, and a point-bonus multiplier applied to accruals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierConfig {
    pub name: String,
    pub min_points: u64,
    pub max_points: u64,
    pub discount_pct: f64,
    pub bonus_multiplier: f64,
}

/// Ordered tier catalog. Administered externally; read-only to the engine.
///
/// Tiers are kept sorted by `min_points` so tier resolution is a binary
/// search for the greatest `min_points <= lifetime_earned`. A catalog with
/// gaps or overlaps is a configuration mistake, not a runtime error: lookups
/// that match nothing return `None` and callers keep the current tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierCatalog {
    tiers: Vec<TierConfig>,
}

impl TierCatalog {
    pub fn new(mut tiers: Vec<TierConfig>) -> Self {
        tiers.sort_by_key(|t| t.min_points);
        Self { tiers }
    }

    /// The tier whose `min_points` is the greatest value `<= lifetime_earned`.
    pub fn tier_for(&self, lifetime_earned: u64) -> Option<&TierConfig> {
        let idx = self
            .tiers
            .partition_point(|t| t.min_points <= lifetime_earned);
        if idx == 0 {
            None
        } else {
            self.tiers.get(idx - 1)
        }
    }

    /// The next tier above `lifetime_earned`, for progression display.
    pub fn next_tier_after(&self, lifetime_earned: u64) -> Option<&TierConfig> {
        let idx = self
            .tiers
            .partition_point(|t| t.min_points <= lifetime_earned);
        self.tiers.get(idx)
    }

    pub fn by_name(&self, name: &str) -> Option<&TierConfig> {
        self.tiers.iter().find(|t| t.name == name)
    }

    /// Ordinal rank of a tier (0 = lowest), by position in the sorted catalog.
    pub fn rank_of(&self, name: &str) -> Option<usize> {
        self.tiers.iter().position(|t| t.name == name)
    }

    pub fn tiers(&self) -> &[TierConfig] {
        &self.tiers
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

impl Default for TierCatalog {
    /// Four-tier travel catalog: Bronze, Silver, Gold, Platinum.
    fn default() -> Self {
        Self::new(vec![
            TierConfig {
                name: "Bronze".into(),
                min_points: 0,
                max_points: 999,
                discount_pct: 0.0,
                bonus_multiplier: 1.0,
            },
            TierConfig {
                name: "Silver".into(),
                min_points: 1_000,
                max_points: 4_999,
                discount_pct: 5.0,
                bonus_multiplier: 1.1,
            },
            TierConfig {
                name: "Gold".into(),
                min_points: 5_000,
                max_points: 14_999,
                discount_pct: 10.0,
                bonus_multiplier: 1.25,
            },
            TierConfig {
                name: "Platinum".into(),
                min_points: 15_000,
                max_points: u64::MAX,
                discount_pct: 15.0,
                bonus_multiplier: 1.5,
            },
        ])
    }
}

// ─── Loyalty Account ────────────────────────────────────────────────────────

/// One loyalty account per user, created lazily on first access.
/// Mutated only by the loyalty engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoyaltyAccount {
    pub owner_id: String,
    /// Currently redeemable points.
    pub balance: u64,
    pub lifetime_earned: u64,
    pub lifetime_redeemed: u64,
    pub lifetime_expired: u64,
    /// Current tier name, `None` until a catalog tier has matched.
    pub tier_name: Option<String>,
    /// Watermark after which the remaining balance expires.
    pub expiry_at: Option<DateTime<Utc>>,
    pub tier_updated_at: Option<DateTime<Utc>>,
    pub enrolled_at: DateTime<Utc>,
}

impl LoyaltyAccount {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            balance: 0,
            lifetime_earned: 0,
            lifetime_redeemed: 0,
            lifetime_expired: 0,
            tier_name: None,
            expiry_at: None,
            tier_updated_at: None,
            enrolled_at: Utc::now(),
        }
    }
}

// ─── Ledger ─────────────────────────────────────────────────────────────────

/// Kind of point transaction recorded in the ledger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Earn,
    Redeem,
    Expire,
    Bonus,
    /// Compensating entry for a reversed accrual. Distinguishable from a
    /// fresh earn so audits can pair it with the original.
    Reversal,
}

/// An immutable record of one point-balance change.
///
/// `amount` is the signed balance delta: positive for `Earn`/`Bonus`,
/// negative for `Redeem`/`Expire`/`Reversal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub owner_id: String,
    pub kind: TransactionKind,
    pub amount: i64,
    pub reservation_ref: Option<String>,
    pub description: String,
    /// Set on an `Earn` entry once a reversal has compensated it, so a
    /// second reversal for the same reservation finds nothing to undo.
    pub reversed: bool,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        owner_id: impl Into<String>,
        kind: TransactionKind,
        amount: i64,
        reservation_ref: Option<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            kind,
            amount,
            reservation_ref,
            description: description.into(),
            reversed: false,
            created_at: Utc::now(),
        }
    }
}

// ─── Status / Results ───────────────────────────────────────────────────────

/// Snapshot of an account's standing, exposed to presentation collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoyaltyStatus {
    pub owner_id: String,
    pub balance: u64,
    pub lifetime_earned: u64,
    pub lifetime_redeemed: u64,
    pub tier_name: Option<String>,
    pub discount_pct: f64,
    pub next_tier_name: Option<String>,
    pub points_to_next_tier: u64,
}

/// Result of a successful redemption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Redemption {
    pub owner_id: String,
    pub points_redeemed: u64,
    /// Monetary discount granted, in currency units.
    pub discount_amount: f64,
    pub remaining_balance: u64,
}

// ─── Domain Events ──────────────────────────────────────────────────────────

/// Reservation completion, published by the reservation workflow and
/// consumed synchronously by the loyalty engine's accrue entry point.
/// The reservation id doubles as the accrual idempotency key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationCompleted {
    pub reservation_id: String,
    pub owner_id: String,
    pub total_price: f64,
    /// Star rating of the associated accommodation, when one exists.
    pub accommodation_stars: Option<u8>,
}

/// Reservation cancellation, consumed by `reverse`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationCancelled {
    pub reservation_id: String,
    pub owner_id: String,
}
