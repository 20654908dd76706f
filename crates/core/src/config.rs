use crate::loyalty::{TierCatalog, TierConfig};
use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `VOYAGE__` and deserialized with per-field defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub loyalty: LoyaltyConfig,
    #[serde(default)]
    pub recommendation: RecommendationConfig,
    /// Tier catalog entries; sorted into a [`TierCatalog`] by the engine.
    #[serde(default = "default_tiers")]
    pub tiers: Vec<TierConfig>,
}

/// Point accrual/redemption constants.
#[derive(Debug, Clone, Deserialize)]
pub struct LoyaltyConfig {
    /// Points credited per currency unit of reservation price.
    #[serde(default = "default_points_per_unit")]
    pub points_per_unit: u64,
    /// Fractional bonus on the base when the accommodation is 5-star.
    #[serde(default = "default_five_star_bonus")]
    pub five_star_bonus: f64,
    /// Currency value of one redeemed point.
    #[serde(default = "default_redemption_rate")]
    pub redemption_rate: f64,
    /// Days until an accrued balance expires, reset on each accrual.
    #[serde(default = "default_expiry_days")]
    pub expiry_days: i64,
}

/// Scoring weights and selection thresholds.
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationConfig {
    #[serde(default = "default_preference_weight")]
    pub preference_weight: f64,
    #[serde(default = "default_price_weight")]
    pub price_weight: f64,
    #[serde(default = "default_tier_weight")]
    pub tier_weight: f64,
    #[serde(default = "default_popularity_weight")]
    pub popularity_weight: f64,
    /// Candidates scoring at or below this are dropped.
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f64,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

fn default_points_per_unit() -> u64 {
    10
}
fn default_five_star_bonus() -> f64 {
    0.5
}
fn default_redemption_rate() -> f64 {
    0.01
}
fn default_expiry_days() -> i64 {
    365
}
fn default_preference_weight() -> f64 {
    0.4
}
fn default_price_weight() -> f64 {
    0.3
}
fn default_tier_weight() -> f64 {
    0.2
}
fn default_popularity_weight() -> f64 {
    0.1
}
fn default_score_threshold() -> f64 {
    40.0
}
fn default_limit() -> usize {
    10
}
fn default_tiers() -> Vec<TierConfig> {
    TierCatalog::default().tiers().to_vec()
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        Self {
            points_per_unit: default_points_per_unit(),
            five_star_bonus: default_five_star_bonus(),
            redemption_rate: default_redemption_rate(),
            expiry_days: default_expiry_days(),
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            preference_weight: default_preference_weight(),
            price_weight: default_price_weight(),
            tier_weight: default_tier_weight(),
            popularity_weight: default_popularity_weight(),
            score_threshold: default_score_threshold(),
            default_limit: default_limit(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            loyalty: LoyaltyConfig::default(),
            recommendation: RecommendationConfig::default(),
            tiers: default_tiers(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("VOYAGE")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// The configured tiers as a sorted catalog.
    pub fn tier_catalog(&self) -> TierCatalog {
        TierCatalog::new(self.tiers.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.loyalty.points_per_unit, 10);
        assert_eq!(cfg.loyalty.five_star_bonus, 0.5);
        assert_eq!(cfg.loyalty.redemption_rate, 0.01);
        assert_eq!(cfg.loyalty.expiry_days, 365);
        assert_eq!(cfg.recommendation.score_threshold, 40.0);
        assert_eq!(cfg.tiers.len(), 4);
    }

    #[test]
    fn test_weights_sum_to_one() {
        let r = RecommendationConfig::default();
        let sum = r.preference_weight + r.price_weight + r.tier_weight + r.popularity_weight;
        assert!((sum - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_tier_catalog_from_config() {
        let cfg = AppConfig::default();
        let catalog = cfg.tier_catalog();
        assert_eq!(catalog.tier_for(6_000).map(|t| t.name.clone()), Some("Gold".into()));
    }
}
