//! Recommendation engine — scores candidate catalog items per user,
//! retains the ones above the match threshold, and upserts them as
//! persisted recommendation rows with engagement tracking.

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use voyage_core::config::RecommendationConfig;
use voyage_core::error::{VoyageError, VoyageResult};
use voyage_core::recommendation::{EngagementEvent, ItemKind, ItemSnapshot, Recommendation};

use crate::scoring::{score_item, ScoredItem, UserSnapshot};

/// Upsert key: one recommendation per (user, item kind, item ref).
type RecKey = (String, ItemKind, String);

/// Stateless scoring over shared recommendation rows. Scoring for different
/// users never contends; rows are updated per item under their map entry
/// guard.
pub struct RecommendationEngine {
    config: RecommendationConfig,
    rows: DashMap<RecKey, Recommendation>,
    by_id: DashMap<Uuid, RecKey>,
}

impl RecommendationEngine {
    pub fn new(config: &RecommendationConfig) -> Self {
        Self {
            config: config.clone(),
            rows: DashMap::new(),
            by_id: DashMap::new(),
        }
    }

    /// Score `candidates` for one user and persist the retained set.
    ///
    /// Candidates scoring at or below the threshold are dropped; the rest
    /// are ordered by score descending (item creation time descending as
    /// the tie-break), truncated to `limit`, and upserted in place. Rows
    /// that fall out of the result set are left active until a later
    /// recompute overwrites them.
    pub fn recommend(
        &self,
        user_id: &str,
        user: &UserSnapshot,
        candidates: &[ItemSnapshot],
        limit: usize,
    ) -> Vec<Recommendation> {
        let mut scored: Vec<_> = candidates
            .iter()
            .map(|item| (item, score_item(&self.config, user, item)))
            .filter(|(_, s)| s.match_score > self.config.score_threshold)
            .collect();

        scored.sort_by(|(item_a, a), (item_b, b)| {
            b.match_score
                .partial_cmp(&a.match_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| item_b.created_at.cmp(&item_a.created_at))
        });
        scored.truncate(limit);

        let results: Vec<Recommendation> = scored
            .into_iter()
            .map(|(item, s)| self.upsert(user_id, item, s))
            .collect();

        metrics::counter!("recommendation.generated").increment(results.len() as u64);
        debug!(
            user_id = %user_id,
            candidates = candidates.len(),
            retained = results.len(),
            "Recommendations computed"
        );
        results
    }

    /// Score the candidates with the configured default limit.
    pub fn recommend_default(
        &self,
        user_id: &str,
        user: &UserSnapshot,
        candidates: &[ItemSnapshot],
    ) -> Vec<Recommendation> {
        self.recommend(user_id, user, candidates, self.config.default_limit)
    }

    fn upsert(&self, user_id: &str, item: &ItemSnapshot, scored: ScoredItem) -> Recommendation {
        let key: RecKey = (user_id.to_string(), item.kind, item.item_ref.clone());
        let now = Utc::now();

        match self.rows.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let row = occupied.get_mut();
                row.match_score = scored.match_score;
                row.preference_match = scored.preference_match;
                row.price_match = scored.price_match;
                row.tier_bonus = scored.tier_bonus;
                row.popularity_score = scored.popularity;
                row.reason = scored.reason;
                row.is_active = true;
                row.updated_at = now;
                row.clone()
            }
            Entry::Vacant(vacant) => {
                let row = Recommendation {
                    id: Uuid::new_v4(),
                    user_id: user_id.to_string(),
                    item_kind: item.kind,
                    item_ref: item.item_ref.clone(),
                    match_score: scored.match_score,
                    preference_match: scored.preference_match,
                    price_match: scored.price_match,
                    tier_bonus: scored.tier_bonus,
                    popularity_score: scored.popularity,
                    reason: scored.reason,
                    is_viewed: false,
                    viewed_at: None,
                    is_clicked: false,
                    clicked_at: None,
                    is_booked: false,
                    booked_at: None,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                };
                self.by_id.insert(row.id, key);
                vacant.insert(row.clone());
                row
            }
        }
    }

    /// Active recommendations for a user, best match first.
    pub fn recommendations_for(&self, user_id: &str, limit: usize) -> Vec<Recommendation> {
        let mut rows: Vec<Recommendation> = self
            .rows
            .iter()
            .filter(|entry| entry.value().user_id == user_id && entry.value().is_active)
            .map(|entry| entry.value().clone())
            .collect();

        rows.sort_by(|a, b| {
            b.match_score
                .partial_cmp(&a.match_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        rows.truncate(limit);
        rows
    }

    /// Record a view/click/book transition. Only the first transition per
    /// flag mutates the row; repeats are no-ops.
    pub fn record_engagement(&self, id: Uuid, event: EngagementEvent) -> VoyageResult<()> {
        let key = self
            .by_id
            .get(&id)
            .map(|k| k.clone())
            .ok_or(VoyageError::RecommendationNotFound(id))?;
        let mut row = self
            .rows
            .get_mut(&key)
            .ok_or(VoyageError::RecommendationNotFound(id))?;

        let now = Utc::now();
        let transitioned = match event {
            EngagementEvent::Viewed if !row.is_viewed => {
                row.is_viewed = true;
                row.viewed_at = Some(now);
                true
            }
            EngagementEvent::Clicked if !row.is_clicked => {
                row.is_clicked = true;
                row.clicked_at = Some(now);
                true
            }
            EngagementEvent::Booked if !row.is_booked => {
                row.is_booked = true;
                row.booked_at = Some(now);
                true
            }
            _ => false,
        };

        if transitioned {
            row.updated_at = now;
            metrics::counter!("recommendation.engagements").increment(1);
            debug!(recommendation_id = %id, event = ?event, "Engagement recorded");
        }
        Ok(())
    }

    /// Hide a recommendation without deleting it.
    pub fn deactivate(&self, id: Uuid) -> VoyageResult<()> {
        let key = self
            .by_id
            .get(&id)
            .map(|k| k.clone())
            .ok_or(VoyageError::RecommendationNotFound(id))?;
        let mut row = self
            .rows
            .get_mut(&key)
            .ok_or(VoyageError::RecommendationNotFound(id))?;
        row.is_active = false;
        row.updated_at = Utc::now();
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Option<Recommendation> {
        let key = self.by_id.get(&id)?.clone();
        self.rows.get(&key).map(|r| r.clone())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new(&RecommendationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use voyage_core::recommendation::{PreferenceProfile, PriceBucket};

    fn user() -> UserSnapshot {
        UserSnapshot {
            preferences: Some(PreferenceProfile {
                price_bucket: PriceBucket::Standard,
                preferred_destination_refs: vec!["rome".into()],
            }),
            tier_rank: Some(2),
            tier_name: Some("Gold".into()),
        }
    }

    fn offer(item_ref: &str, price: f64, destinations: &[&str]) -> ItemSnapshot {
        ItemSnapshot {
            item_ref: item_ref.to_string(),
            kind: ItemKind::Offer,
            price,
            star_ratings: vec![],
            reservation_count: 0,
            destination_refs: destinations.iter().map(|d| d.to_string()).collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_threshold_filters_weak_matches() {
        let engine = RecommendationEngine::default();
        // No profile, no account: every candidate scores 35
        let results = engine.recommend(
            "u1",
            &UserSnapshot::default(),
            &[offer("a", 800.0, &[]), offer("b", 900.0, &[])],
            10,
        );
        assert!(results.is_empty());
        assert!(engine.is_empty());
    }

    #[test]
    fn test_results_ordered_by_score_then_recency() {
        let engine = RecommendationEngine::default();
        let in_band = offer("good-price", 800.0, &[]);
        let with_overlap = offer("overlap", 800.0, &["rome"]);
        let mut older_twin = offer("older-twin", 800.0, &[]);
        older_twin.created_at = in_band.created_at - Duration::days(3);

        let results = engine.recommend(
            "u1",
            &user(),
            &[older_twin, in_band, with_overlap],
            10,
        );
        assert_eq!(results.len(), 3);
        // Overlap scores highest; the equal-scored pair breaks the tie on
        // the newer item.
        assert_eq!(results[0].item_ref, "overlap");
        assert_eq!(results[1].item_ref, "good-price");
        assert_eq!(results[2].item_ref, "older-twin");
    }

    #[test]
    fn test_limit_truncates_result_set() {
        let engine = RecommendationEngine::default();
        let candidates: Vec<_> = (0..5)
            .map(|i| offer(&format!("o{i}"), 800.0, &[]))
            .collect();

        let results = engine.recommend("u1", &user(), &candidates, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn test_recompute_upserts_in_place() {
        let engine = RecommendationEngine::default();
        let first = engine.recommend("u1", &user(), &[offer("a", 800.0, &[])], 10);
        let id = first[0].id;
        let first_score = first[0].match_score;

        // Same user and item, now with a destination overlap: the row is
        // overwritten, not duplicated.
        let second = engine.recommend("u1", &user(), &[offer("a", 800.0, &["rome"])], 10);
        assert_eq!(engine.len(), 1);
        assert_eq!(second[0].id, id);
        assert!(second[0].match_score > first_score);
        assert!(second[0].is_active);
    }

    #[test]
    fn test_rows_unique_per_user() {
        let engine = RecommendationEngine::default();
        engine.recommend("u1", &user(), &[offer("a", 800.0, &[])], 10);
        engine.recommend("u2", &user(), &[offer("a", 800.0, &[])], 10);
        assert_eq!(engine.len(), 2);
        assert_eq!(engine.recommendations_for("u1", 10).len(), 1);
    }

    #[test]
    fn test_stale_rows_stay_active_until_overwritten() {
        let engine = RecommendationEngine::default();
        engine.recommend("u1", &user(), &[offer("a", 800.0, &[])], 10);

        // A later recompute over a different candidate set leaves the old
        // row active.
        engine.recommend("u1", &user(), &[offer("b", 800.0, &[])], 10);
        let rows = engine.recommendations_for("u1", 10);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.is_active));
    }

    #[test]
    fn test_engagement_first_transition_only() {
        let engine = RecommendationEngine::default();
        let recs = engine.recommend("u1", &user(), &[offer("a", 800.0, &[])], 10);
        let rec = &recs[0];

        engine.record_engagement(rec.id, EngagementEvent::Viewed).unwrap();
        let viewed_at = engine.get(rec.id).unwrap().viewed_at;
        assert!(viewed_at.is_some());

        // Second view is a no-op: the timestamp does not move
        engine.record_engagement(rec.id, EngagementEvent::Viewed).unwrap();
        assert_eq!(engine.get(rec.id).unwrap().viewed_at, viewed_at);

        engine.record_engagement(rec.id, EngagementEvent::Clicked).unwrap();
        engine.record_engagement(rec.id, EngagementEvent::Booked).unwrap();
        let row = engine.get(rec.id).unwrap();
        assert!(row.is_clicked && row.is_booked);
    }

    #[test]
    fn test_engagement_unknown_id() {
        let engine = RecommendationEngine::default();
        let err = engine
            .record_engagement(Uuid::new_v4(), EngagementEvent::Viewed)
            .unwrap_err();
        assert!(matches!(err, VoyageError::RecommendationNotFound(_)));
    }

    #[test]
    fn test_deactivated_rows_hidden_not_deleted() {
        let engine = RecommendationEngine::default();
        let recs = engine.recommend("u1", &user(), &[offer("a", 800.0, &[])], 10);
        let rec = &recs[0];

        engine.deactivate(rec.id).unwrap();
        assert!(engine.recommendations_for("u1", 10).is_empty());
        assert!(!engine.get(rec.id).unwrap().is_active);

        // A recompute reactivates the same row
        engine.recommend("u1", &user(), &[offer("a", 800.0, &[])], 10);
        assert!(engine.get(rec.id).unwrap().is_active);
    }
}
