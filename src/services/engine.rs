use parking_lot::Mutex;
use rand::{rngs::StdRng, SeedableRng};
use std::{future::Future, sync::Arc, time::Duration};
use uuid::Uuid;

use crate::{
    config::EngineSettings,
    db::{RatingStore, WardrobeRepository},
    error::{EngineError, EngineResult},
    models::{InteractionType, Occasion, OutfitId, RatingAck, ScoredOutfit, TrendSnapshot, WeatherTag},
    services::{
        candidates::CandidateGenerator,
        exploration::ExplorationSelector,
        feedback::FeedbackRecorder,
        outfit_cache::CacheEntry,
        providers::{
            CfOracle, FixedWeather, NeutralCfOracle, StaticTrendProvider, TrendProvider,
            WeatherProvider,
        },
        rules::{DefaultRules, RuleOracles},
        scoring::{MultiSignalScorer, ScoringContext},
        state::EngineState,
    },
};

/// A recommendation request with weather already resolved
#[derive(Debug, Clone)]
pub struct OutfitRequest {
    pub user_id: Uuid,
    pub occasion: Occasion,
    pub weather_tags: Vec<WeatherTag>,
    pub limit: usize,
}

/// Daily outfit recommendation engine
///
/// Each request runs generate → score → explore on its own; the only state
/// shared between requests is the injected [`EngineState`]. None of the public
/// operations fail: collaborator errors degrade to neutral defaults and bad
/// input yields an empty list.
pub struct RecommendationEngine {
    settings: EngineSettings,
    wardrobe: Arc<dyn WardrobeRepository>,
    weather: Arc<dyn WeatherProvider>,
    trends: Arc<dyn TrendProvider>,
    state: Arc<EngineState>,
    generator: CandidateGenerator,
    scorer: MultiSignalScorer,
    explorer: ExplorationSelector,
    feedback: FeedbackRecorder,
    rng: Mutex<StdRng>,
}

impl RecommendationEngine {
    pub fn builder(settings: EngineSettings) -> EngineBuilder {
        EngineBuilder::new(settings)
    }

    /// Recommends up to `limit` outfits for a user's day
    ///
    /// `occasion` is parsed leniently; an unknown value returns no outfits.
    /// Weather is resolved from `location` and falls back to no tags.
    pub async fn generate_daily_outfits(
        &self,
        user_id: Uuid,
        location: &str,
        occasion: &str,
        limit: usize,
    ) -> Vec<ScoredOutfit> {
        let occasion: Occasion = match occasion.parse() {
            Ok(occasion) => occasion,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Unknown occasion, no outfits");
                return Vec::new();
            }
        };

        let weather_tags = with_fallback(
            "weather",
            self.settings.weather_timeout,
            self.weather.weather_tags(location),
            Vec::new(),
        )
        .await;

        self.generate_outfits(OutfitRequest {
            user_id,
            occasion,
            weather_tags,
            limit,
        })
        .await
    }

    /// Runs the recommendation pipeline for a fully resolved request
    ///
    /// Every returned outfit is registered in the ephemeral cache under its
    /// generated id so a later rating can find its items.
    pub async fn generate_outfits(&self, request: OutfitRequest) -> Vec<ScoredOutfit> {
        let OutfitRequest {
            user_id,
            occasion,
            weather_tags,
            limit,
        } = request;

        if limit == 0 {
            return Vec::new();
        }

        let items: Vec<Arc<_>> = match self.wardrobe.items_for_user(user_id).await {
            Ok(items) => items.into_iter().map(Arc::new).collect(),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to load wardrobe");
                return Vec::new();
            }
        };
        if items.is_empty() {
            tracing::info!(user_id = %user_id, "Empty wardrobe, no outfits");
            return Vec::new();
        }

        let trends = with_fallback(
            self.trends.name(),
            self.settings.trend_timeout,
            self.trends.snapshot(user_id, occasion),
            TrendSnapshot::default(),
        )
        .await;

        let candidates = {
            let mut rng = self.rng.lock();
            self.generator
                .generate(&items, occasion, &weather_tags, &mut *rng)
        };
        let generated = candidates.len();

        let ctx = ScoringContext {
            user_id,
            occasion,
            weather: &weather_tags,
            trends: &trends,
            profiles: &self.state.profiles,
        };
        let ranked = self.scorer.score(&ctx, candidates).await;
        let scored = ranked.len();

        let selected = {
            let mut rng = self.rng.lock();
            self.explorer
                .select(ranked, limit, &self.state.bandit, &mut *rng)
        };

        for outfit in &selected {
            self.state.cache.put(CacheEntry {
                outfit_id: outfit.id.clone(),
                user_id,
                items: outfit.items.clone(),
                occasion,
                weather_tags: weather_tags.clone(),
                inserted_at: chrono::Utc::now(),
            });
        }

        tracing::info!(
            user_id = %user_id,
            occasion = %occasion,
            wardrobe = items.len(),
            generated,
            scored,
            trends_available = !trends.is_empty(),
            returned = selected.len(),
            explored = selected.iter().any(|o| o.explored),
            "Generated daily outfits"
        );

        selected
    }

    /// Records a 1-5 rating of a previously returned or saved outfit
    pub async fn record_rating(
        &self,
        user_id: Uuid,
        outfit_id: &OutfitId,
        rating: u8,
        reason: Option<&str>,
    ) -> RatingAck {
        self.feedback
            .record_rating(user_id, outfit_id, rating, reason)
            .await
    }

    /// Applies direct feedback on a single wardrobe item
    pub async fn update_user_preferences(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        interaction: InteractionType,
    ) {
        match self.wardrobe.item(user_id, item_id).await {
            Ok(Some(item)) => self.feedback.record_interaction(user_id, &item, interaction),
            Ok(None) => {
                tracing::warn!(user_id = %user_id, item_id = %item_id, "Item not found, preference unchanged")
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, item_id = %item_id, error = %e, "Failed to load item")
            }
        }
    }

    pub fn state(&self) -> &Arc<EngineState> {
        &self.state
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

/// Awaits a collaborator call within `timeout`, substituting `default` on
/// error or expiry
async fn with_fallback<T, F>(source: &str, timeout: Duration, call: F, default: T) -> T
where
    F: Future<Output = EngineResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            tracing::warn!(source, error = %e, "Collaborator failed, using default");
            default
        }
        Err(_) => {
            tracing::warn!(
                source,
                timeout_ms = timeout.as_millis() as u64,
                "Collaborator timed out, using default"
            );
            default
        }
    }
}

/// Wires an engine from its collaborators
///
/// The wardrobe repository and rating store are required. Everything else
/// has a neutral default: no weather tags, an empty trend snapshot, a 0.5 CF
/// score, [`DefaultRules`] and fresh state.
pub struct EngineBuilder {
    settings: EngineSettings,
    wardrobe: Option<Arc<dyn WardrobeRepository>>,
    ratings: Option<Arc<dyn RatingStore>>,
    weather: Option<Arc<dyn WeatherProvider>>,
    trends: Option<Arc<dyn TrendProvider>>,
    cf_oracle: Option<Arc<dyn CfOracle>>,
    rules: Option<Arc<dyn RuleOracles>>,
    state: Option<Arc<EngineState>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings: settings.normalized(),
            wardrobe: None,
            ratings: None,
            weather: None,
            trends: None,
            cf_oracle: None,
            rules: None,
            state: None,
        }
    }

    pub fn wardrobe(mut self, wardrobe: Arc<dyn WardrobeRepository>) -> Self {
        self.wardrobe = Some(wardrobe);
        self
    }

    pub fn ratings(mut self, ratings: Arc<dyn RatingStore>) -> Self {
        self.ratings = Some(ratings);
        self
    }

    pub fn weather(mut self, weather: Arc<dyn WeatherProvider>) -> Self {
        self.weather = Some(weather);
        self
    }

    pub fn trends(mut self, trends: Arc<dyn TrendProvider>) -> Self {
        self.trends = Some(trends);
        self
    }

    pub fn cf_oracle(mut self, cf_oracle: Arc<dyn CfOracle>) -> Self {
        self.cf_oracle = Some(cf_oracle);
        self
    }

    pub fn rules(mut self, rules: Arc<dyn RuleOracles>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Shares existing state, e.g. between two engines in tests
    pub fn state(mut self, state: Arc<EngineState>) -> Self {
        self.state = Some(state);
        self
    }

    pub fn build(self) -> EngineResult<RecommendationEngine> {
        let settings = self.settings;
        let wardrobe = self
            .wardrobe
            .ok_or_else(|| EngineError::InvalidInput("wardrobe repository is required".into()))?;
        let ratings = self
            .ratings
            .ok_or_else(|| EngineError::InvalidInput("rating store is required".into()))?;

        let state = self
            .state
            .unwrap_or_else(|| Arc::new(EngineState::new(&settings)));
        let rules = self.rules.unwrap_or_else(|| Arc::new(DefaultRules));
        let cf_oracle = self.cf_oracle.unwrap_or_else(|| Arc::new(NeutralCfOracle));

        let rng = match settings.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        tracing::info!(
            explore_probability = settings.explore_probability,
            cache_capacity = settings.cache_capacity,
            cf_oracle = cf_oracle.name(),
            seeded = settings.rng_seed.is_some(),
            "Recommendation engine ready"
        );

        Ok(RecommendationEngine {
            wardrobe,
            weather: self
                .weather
                .unwrap_or_else(|| Arc::new(FixedWeather::default())),
            trends: self
                .trends
                .unwrap_or_else(|| Arc::new(StaticTrendProvider::default())),
            generator: CandidateGenerator::new(
                settings.max_items_per_category,
                settings.accessory_probability,
            ),
            scorer: MultiSignalScorer::new(rules, cf_oracle, settings.cf_timeout),
            explorer: ExplorationSelector::new(
                settings.explore_probability,
                settings.exploration_constant,
            ),
            feedback: FeedbackRecorder::new(state.clone(), ratings),
            state,
            rng: Mutex::new(rng),
            settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryRatingStore, InMemoryWardrobe};
    use crate::models::WardrobeItem;
    use crate::services::providers::MockTrendProvider;

    async fn wardrobe_for(user_id: Uuid) -> Arc<InMemoryWardrobe> {
        let wardrobe = Arc::new(InMemoryWardrobe::new());
        wardrobe
            .add_items(vec![
                WardrobeItem::new(user_id, "top", "white"),
                WardrobeItem::new(user_id, "jeans", "blue"),
                WardrobeItem::new(user_id, "sneakers", "white"),
            ])
            .await;
        wardrobe
    }

    fn settings() -> EngineSettings {
        EngineSettings {
            explore_probability: 0.0,
            rng_seed: Some(7),
            trend_timeout: Duration::from_millis(20),
            ..EngineSettings::default()
        }
    }

    #[test]
    fn test_build_requires_wardrobe_and_ratings() {
        let missing_all = RecommendationEngine::builder(settings()).build();
        assert!(matches!(missing_all, Err(EngineError::InvalidInput(_))));

        let missing_ratings = RecommendationEngine::builder(settings())
            .wardrobe(Arc::new(InMemoryWardrobe::new()))
            .build();
        assert!(matches!(missing_ratings, Err(EngineError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_trend_failure_falls_back_to_default() {
        let user = Uuid::new_v4();
        let mut trends = MockTrendProvider::new();
        trends
            .expect_snapshot()
            .times(1)
            .returning(|_, _| Err(EngineError::ExternalApi("trend service down".into())));
        trends.expect_name().return_const("mock_trends");

        let engine = RecommendationEngine::builder(settings())
            .wardrobe(wardrobe_for(user).await)
            .ratings(Arc::new(InMemoryRatingStore::new()))
            .trends(Arc::new(trends))
            .build()
            .unwrap();

        let outfits = engine.generate_daily_outfits(user, "home", "casual", 3).await;
        assert_eq!(outfits.len(), 1);
        assert_eq!(outfits[0].signals.trend, 0.3);
    }

    struct SlowTrends;

    #[async_trait::async_trait]
    impl TrendProvider for SlowTrends {
        async fn snapshot(&self, _: Uuid, _: Occasion) -> EngineResult<TrendSnapshot> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(TrendSnapshot {
                trending_colors: vec!["white".to_string()],
                ..TrendSnapshot::default()
            })
        }

        fn name(&self) -> &'static str {
            "slow_trends"
        }
    }

    #[tokio::test]
    async fn test_trend_timeout_does_not_block_pipeline() {
        let user = Uuid::new_v4();
        let engine = RecommendationEngine::builder(settings())
            .wardrobe(wardrobe_for(user).await)
            .ratings(Arc::new(InMemoryRatingStore::new()))
            .trends(Arc::new(SlowTrends))
            .build()
            .unwrap();

        let outfits = engine.generate_daily_outfits(user, "home", "casual", 3).await;
        assert_eq!(outfits.len(), 1);
        assert_eq!(outfits[0].signals.trend, 0.3);
    }

    #[tokio::test]
    async fn test_returned_outfits_are_cached_for_user() {
        let user = Uuid::new_v4();
        let engine = RecommendationEngine::builder(settings())
            .wardrobe(wardrobe_for(user).await)
            .ratings(Arc::new(InMemoryRatingStore::new()))
            .build()
            .unwrap();

        let outfits = engine.generate_daily_outfits(user, "home", "casual", 3).await;
        assert!(!outfits.is_empty());
        for outfit in &outfits {
            assert!(outfit.id.is_ephemeral());
            let entry = engine.state().cache.get(&outfit.id).unwrap();
            assert_eq!(entry.user_id, user);
            assert_eq!(entry.items.len(), outfit.items.len());
        }
    }

    #[tokio::test]
    async fn test_zero_limit_returns_nothing() {
        let user = Uuid::new_v4();
        let engine = RecommendationEngine::builder(settings())
            .wardrobe(wardrobe_for(user).await)
            .ratings(Arc::new(InMemoryRatingStore::new()))
            .build()
            .unwrap();

        assert!(engine
            .generate_daily_outfits(user, "home", "casual", 0)
            .await
            .is_empty());
        assert!(engine.state().cache.is_empty());
    }
}
