//! Pure multi-signal scoring — a function of (user snapshot, item snapshot)
//! with no hidden state. Missing profile or loyalty data substitutes
//! neutral defaults (50 for preference/price, 0 for tier bonus); the final
//! score is always inside [0, 100].

use serde::{Deserialize, Serialize};

use voyage_core::config::RecommendationConfig;
use voyage_core::recommendation::{ItemSnapshot, PreferenceProfile};

/// Tier bonus by catalog rank (lowest tier first). Ranks past the table
/// cap at the last value.
const TIER_BONUSES: [f64; 4] = [5.0, 15.0, 25.0, 35.0];

/// Immutable view of the user taken before scoring: preference profile (or
/// none) and loyalty tier (or none). Built once per recompute and shared
/// across all candidates.
#[derive(Debug, Clone, Default)]
pub struct UserSnapshot {
    pub preferences: Option<PreferenceProfile>,
    /// Catalog rank of the user's loyalty tier, `None` without an account.
    pub tier_rank: Option<usize>,
    pub tier_name: Option<String>,
}

/// Scoring result for one candidate: the weighted score, its components,
/// and the human-readable explanation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredItem {
    pub match_score: f64,
    pub preference_match: f64,
    pub price_match: f64,
    pub tier_bonus: f64,
    pub popularity: f64,
    pub reason: String,
}

/// Score one catalog item for one user. Deterministic: identical inputs
/// always produce the identical score and reason.
pub fn score_item(
    config: &RecommendationConfig,
    user: &UserSnapshot,
    item: &ItemSnapshot,
) -> ScoredItem {
    let preference_match = preference_match(user, item);
    let price_match = price_match(user, item);
    let tier_bonus = tier_bonus(user);
    let popularity = popularity(item);

    let match_score = (config.preference_weight * preference_match
        + config.price_weight * price_match
        + config.tier_weight * tier_bonus
        + config.popularity_weight * popularity)
        .clamp(0.0, 100.0);

    let reason = build_reason(user, item, preference_match, price_match, tier_bonus);

    ScoredItem {
        match_score,
        preference_match,
        price_match,
        tier_bonus,
        popularity,
        reason,
    }
}

/// Baseline 50, +25 on categorical overlap between the item's destinations
/// and the ones the user's active offers reference.
fn preference_match(user: &UserSnapshot, item: &ItemSnapshot) -> f64 {
    let Some(prefs) = &user.preferences else {
        return 50.0;
    };

    let mut score: f64 = 50.0;
    if item
        .destination_refs
        .iter()
        .any(|d| prefs.preferred_destination_refs.contains(d))
    {
        score += 25.0;
    }
    score.clamp(0.0, 100.0)
}

/// 100 inside the preferred band, degrading per currency unit outside it at
/// the item kind's sensitivity. Floors at 0.
fn price_match(user: &UserSnapshot, item: &ItemSnapshot) -> f64 {
    let Some(prefs) = &user.preferences else {
        return 50.0;
    };

    let (min, max) = prefs.price_bucket.band(item.kind);
    let k = item.kind.price_sensitivity();
    if item.price >= min && item.price <= max {
        100.0
    } else if item.price < min {
        (100.0 - (min - item.price) / k).max(0.0)
    } else {
        (100.0 - (item.price - max) / k).max(0.0)
    }
}

fn tier_bonus(user: &UserSnapshot) -> f64 {
    match user.tier_rank {
        Some(rank) => TIER_BONUSES[rank.min(TIER_BONUSES.len() - 1)],
        None => 0.0,
    }
}

/// `reservation_count / 5` capped at 100, +20 when a 5-star accommodation
/// is associated, still capped at 100.
fn popularity(item: &ItemSnapshot) -> f64 {
    let mut score = (item.reservation_count as f64 / 5.0).min(100.0);
    if item.has_five_star() {
        score += 20.0;
    }
    score.min(100.0)
}

fn build_reason(
    user: &UserSnapshot,
    item: &ItemSnapshot,
    preference_match: f64,
    price_match: f64,
    tier_bonus: f64,
) -> String {
    let mut reasons: Vec<String> = Vec::new();

    if preference_match > 70.0 {
        reasons.push("Matches your preferences".to_string());
    }
    if price_match > 80.0 {
        reasons.push("Good price for your range".to_string());
    }
    if tier_bonus > 0.0 {
        let tier = user.tier_name.as_deref().unwrap_or("Member");
        reasons.push(format!("{tier} tier advantage"));
    }
    if item.has_five_star() {
        reasons.push("5-star accommodation available".to_string());
    }

    if reasons.is_empty() {
        "Recommended for you".to_string()
    } else {
        reasons.join(" \u{2022} ")
    }
}
