//! Cross-engine flow: points accrued from a reservation move the user's
//! tier, and the new tier feeds the recommendation score.

use chrono::Utc;

use voyage_core::config::{LoyaltyConfig, RecommendationConfig};
use voyage_core::event_bus::noop_sink;
use voyage_core::loyalty::{ReservationCancelled, ReservationCompleted, TierCatalog};
use voyage_core::recommendation::{ItemKind, ItemSnapshot, PreferenceProfile, PriceBucket};
use voyage_loyalty::LoyaltyEngine;
use voyage_recommendation::{RecommendationEngine, UserSnapshot};

fn snapshot_user(loyalty: &LoyaltyEngine, owner_id: &str) -> UserSnapshot {
    let account = loyalty.account(owner_id);
    let tier_name = account.and_then(|a| a.tier_name);
    let tier_rank = tier_name
        .as_deref()
        .and_then(|name| loyalty.catalog().rank_of(name));
    UserSnapshot {
        preferences: Some(PreferenceProfile {
            price_bucket: PriceBucket::Standard,
            preferred_destination_refs: vec![],
        }),
        tier_rank,
        tier_name,
    }
}

fn offer(item_ref: &str, price: f64) -> ItemSnapshot {
    ItemSnapshot {
        item_ref: item_ref.to_string(),
        kind: ItemKind::Offer,
        price,
        star_ratings: vec![],
        reservation_count: 0,
        destination_refs: vec![],
        created_at: Utc::now(),
    }
}

#[test]
fn test_accrual_raises_tier_and_recommendation_score() {
    let loyalty = LoyaltyEngine::new(
        &LoyaltyConfig::default(),
        TierCatalog::default(),
        noop_sink(),
    );
    let recommender = RecommendationEngine::new(&RecommendationConfig::default());

    // No loyalty account yet: tier bonus 0, score 0.4*50 + 0.3*100 = 50
    let before = recommender.recommend("u1", &snapshot_user(&loyalty, "u1"), &[offer("a", 800.0)], 10);
    assert_eq!(before[0].tier_bonus, 0.0);
    assert!((before[0].match_score - 50.0).abs() < 1e-9);

    // Implicit enrollment on first touch puts the account at Bronze:
    // 0.4*50 + 0.3*100 + 0.2*5 = 51
    loyalty.status("u1");
    let enrolled = recommender.recommend("u1", &snapshot_user(&loyalty, "u1"), &[offer("a", 800.0)], 10);
    assert!((enrolled[0].match_score - 51.0).abs() < 1e-9);
    assert_eq!(enrolled[0].tier_bonus, 5.0);

    // A 5-star reservation lifts the account to Gold (6000 lifetime points)
    let points = loyalty.accrue(&ReservationCompleted {
        reservation_id: "r1".into(),
        owner_id: "u1".into(),
        total_price: 400.0,
        accommodation_stars: Some(5),
    });
    assert_eq!(points, 6_000);

    let after = recommender.recommend("u1", &snapshot_user(&loyalty, "u1"), &[offer("a", 800.0)], 10);
    // Gold rank 2 -> tier bonus 25: 20 + 30 + 5 = 55
    assert_eq!(after[0].tier_bonus, 25.0);
    assert!((after[0].match_score - 55.0).abs() < 1e-9);
    assert_eq!(after[0].id, enrolled[0].id); // upserted, not duplicated
    assert!(after[0].reason.contains("Gold tier advantage"));

    // Cancellation reverses the accrual and the tier falls back
    loyalty.reverse(&ReservationCancelled {
        reservation_id: "r1".into(),
        owner_id: "u1".into(),
    });
    let reverted = recommender.recommend("u1", &snapshot_user(&loyalty, "u1"), &[offer("a", 800.0)], 10);
    assert_eq!(reverted[0].tier_bonus, 5.0);
}

#[test]
fn test_documented_member_journey_end_to_end() {
    let loyalty = LoyaltyEngine::new(
        &LoyaltyConfig::default(),
        TierCatalog::default(),
        noop_sink(),
    );
    let recommender = RecommendationEngine::new(&RecommendationConfig::default());

    // 200/person x 2 people in a 5-star accommodation: 6000 points, Gold
    let points = loyalty.accrue(&ReservationCompleted {
        reservation_id: "r1".into(),
        owner_id: "u1".into(),
        total_price: 400.0,
        accommodation_stars: Some(5),
    });
    assert_eq!(points, 6_000);
    let status = loyalty.status("u1");
    assert_eq!(status.tier_name.as_deref(), Some("Gold"));
    assert_eq!(status.lifetime_earned, 6_000);

    // Non-positive redemptions are rejected without touching the account
    assert!(loyalty.redeem("u1", 0).is_err());
    assert!(loyalty.redeem("u1", -5).is_err());

    // Redeeming half the balance grants a 30.00 discount
    let redemption = loyalty.redeem("u1", 3_000).unwrap();
    assert!((redemption.discount_amount - 30.0).abs() < f64::EPSILON);
    assert_eq!(redemption.remaining_balance, 3_000);

    // A Gold member sees the documented 55-point score for an in-band offer
    let recs = recommender.recommend("u1", &snapshot_user(&loyalty, "u1"), &[offer("a", 800.0)], 10);
    assert!((recs[0].match_score - 55.0).abs() < 1e-9);

    // Cancellation reverses exactly once and the tier falls back to Bronze
    let cancel = ReservationCancelled {
        reservation_id: "r1".into(),
        owner_id: "u1".into(),
    };
    assert_eq!(loyalty.reverse(&cancel), 6_000);
    assert_eq!(loyalty.reverse(&cancel), 0);
    let account = loyalty.account("u1").unwrap();
    assert_eq!(account.balance, 0);
    assert_eq!(account.lifetime_earned, 0);
    assert_eq!(account.tier_name.as_deref(), Some("Bronze"));
}

#[test]
fn test_duplicate_accrual_guard_via_idempotency_key() {
    let loyalty = LoyaltyEngine::new(
        &LoyaltyConfig::default(),
        TierCatalog::default(),
        noop_sink(),
    );
    let event = ReservationCompleted {
        reservation_id: "r1".into(),
        owner_id: "u1".into(),
        total_price: 400.0,
        accommodation_stars: Some(5),
    };

    // The reservation workflow checks the ledger before accruing
    if !loyalty.already_accrued(&event.owner_id, &event.reservation_id) {
        loyalty.accrue(&event);
    }
    if !loyalty.already_accrued(&event.owner_id, &event.reservation_id) {
        loyalty.accrue(&event);
    }

    assert_eq!(loyalty.account("u1").unwrap().lifetime_earned, 6_000);
}
