//! Recommendation domain types — catalog snapshots, preference profiles,
//! and persisted recommendation records with engagement tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Catalog Input ──────────────────────────────────────────────────────────

/// Kind of catalog item a recommendation can point at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Offer,
    Destination,
    Accommodation,
}

impl ItemKind {
    /// Divisor applied per currency unit outside the preferred price band.
    /// Nightly accommodation rates degrade faster than package prices.
    pub fn price_sensitivity(&self) -> f64 {
        match self {
            ItemKind::Accommodation => 2.0,
            ItemKind::Offer | ItemKind::Destination => 10.0,
        }
    }
}

/// Immutable snapshot of one catalog item, taken by the caller before
/// scoring. Scoring never touches live catalog state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub item_ref: String,
    pub kind: ItemKind,
    /// Price per person for offers, per night for accommodations.
    pub price: f64,
    /// Star ratings of associated accommodations.
    pub star_ratings: Vec<u8>,
    pub reservation_count: u64,
    pub destination_refs: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ItemSnapshot {
    pub fn has_five_star(&self) -> bool {
        self.star_ratings.iter().any(|s| *s == 5)
    }
}

// ─── Preference Profile ─────────────────────────────────────────────────────

/// Price-range bucket from the externally owned preference profile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PriceBucket {
    Budget,
    Standard,
    Premium,
}

impl PriceBucket {
    /// `[min, max]` price band for this bucket, per item kind.
    pub fn band(&self, kind: ItemKind) -> (f64, f64) {
        match kind {
            ItemKind::Offer | ItemKind::Destination => match self {
                PriceBucket::Budget => (0.0, 500.0),
                PriceBucket::Standard => (500.0, 1_500.0),
                PriceBucket::Premium => (1_500.0, 10_000.0),
            },
            ItemKind::Accommodation => match self {
                PriceBucket::Budget => (0.0, 100.0),
                PriceBucket::Standard => (100.0, 300.0),
                PriceBucket::Premium => (300.0, 1_000.0),
            },
        }
    }
}

/// User tastes consumed by scoring. Read-only input; absence means neutral
/// defaults, never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceProfile {
    pub price_bucket: PriceBucket,
    /// Destination refs the user's active offers reference, used as a
    /// coarse categorical-overlap signal.
    pub preferred_destination_refs: Vec<String>,
}

// ─── Recommendation Record ──────────────────────────────────────────────────

/// Engagement events recorded by the presentation layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EngagementEvent {
    Viewed,
    Clicked,
    Booked,
}

/// A persisted recommendation, unique per `(user_id, item_kind, item_ref)`.
/// Recomputation upserts score fields in place; rows are deactivated,
/// never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Uuid,
    pub user_id: String,
    pub item_kind: ItemKind,
    pub item_ref: String,
    /// Weighted match score in [0, 100].
    pub match_score: f64,
    pub preference_match: f64,
    pub price_match: f64,
    pub tier_bonus: f64,
    pub popularity_score: f64,
    pub reason: String,
    pub is_viewed: bool,
    pub viewed_at: Option<DateTime<Utc>>,
    pub is_clicked: bool,
    pub clicked_at: Option<DateTime<Utc>>,
    pub is_booked: bool,
    pub booked_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
