//! Recommendation scoring engine — multi-signal weighted match scores over
//! (user profile, catalog item) pairs, persisted as upserted
//! recommendation rows with engagement tracking.

pub mod engine;
pub mod scoring;

pub use engine::RecommendationEngine;
pub use scoring::{score_item, ScoredItem, UserSnapshot};
