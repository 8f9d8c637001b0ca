//! Out-of-process collaborators of the recommendation engine
//!
//! Each seam is a trait so the engine never depends on a particular invocation
//! mechanism. Every call across one of these seams is bounded by a timeout in
//! the engine and resolves to a neutral default on failure.

use uuid::Uuid;

use crate::{
    error::EngineResult,
    models::{Occasion, OutfitCandidate, TrendSnapshot, WeatherTag},
};

pub mod collaborative;
pub mod trends;
pub mod weather;

pub use collaborative::{CircuitBreakerCfOracle, HttpCfOracle, NeutralCfOracle};
pub use trends::{HttpTrendProvider, StaticTrendProvider};
pub use weather::FixedWeather;

#[cfg(test)]
use mockall::automock;

/// Source of the per-call trend signal
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait TrendProvider: Send + Sync {
    /// Current trend snapshot for a user and occasion
    async fn snapshot(&self, user_id: Uuid, occasion: Occasion) -> EngineResult<TrendSnapshot>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Collaborative-filtering scorer
///
/// Unreliable and optional. Returns one score in [0,1] per candidate, in order.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait CfOracle: Send + Sync {
    async fn score(
        &self,
        user_id: Uuid,
        candidates: &[OutfitCandidate],
    ) -> EngineResult<Vec<f64>>;

    fn name(&self) -> &'static str;
}

/// Resolves a location into coarse weather tags
#[async_trait::async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn weather_tags(&self, location: &str) -> EngineResult<Vec<WeatherTag>>;
}
