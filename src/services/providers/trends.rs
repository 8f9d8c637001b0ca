//! Trend snapshot providers
//!
//! The HTTP provider asks an external trend service for the already-extracted
//! signal and keeps it in Redis for a short while, so repeated recommendation
//! calls for the same user and occasion don't hit the service again.

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{EngineError, EngineResult},
    models::{Occasion, TrendSnapshot},
    services::providers::TrendProvider,
};
use reqwest::Client as HttpClient;
use uuid::Uuid;

const TREND_CACHE_TTL: u64 = 900; // 15 minutes

#[derive(Clone)]
pub struct HttpTrendProvider {
    http_client: HttpClient,
    api_url: String,
    cache: Cache,
}

impl HttpTrendProvider {
    pub fn new(cache: Cache, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url,
            cache,
        }
    }
}

#[async_trait::async_trait]
impl TrendProvider for HttpTrendProvider {
    async fn snapshot(&self, user_id: Uuid, occasion: Occasion) -> EngineResult<TrendSnapshot> {
        cached!(
            self.cache,
            CacheKey::TrendSnapshot { user_id, occasion },
            TREND_CACHE_TTL,
            async move {
                let url = format!("{}/v1/trends", self.api_url);
                let response = self
                    .http_client
                    .get(&url)
                    .query(&[
                        ("user_id", user_id.to_string()),
                        ("occasion", occasion.to_string()),
                    ])
                    .send()
                    .await?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(EngineError::ExternalApi(format!(
                        "Trend service returned status {}: {}",
                        status, body
                    )));
                }

                let snapshot: TrendSnapshot = response.json().await?;

                tracing::info!(
                    user_id = %user_id,
                    occasion = %occasion,
                    colors = snapshot.trending_colors.len(),
                    keywords = snapshot.keywords.len(),
                    provider = "http_trends",
                    "Trend snapshot fetched"
                );

                Ok(snapshot)
            }
        )
    }

    fn name(&self) -> &'static str {
        "http_trends"
    }
}

/// Serves one fixed snapshot for every request
#[derive(Debug, Clone, Default)]
pub struct StaticTrendProvider {
    snapshot: TrendSnapshot,
}

impl StaticTrendProvider {
    pub fn new(snapshot: TrendSnapshot) -> Self {
        Self { snapshot }
    }
}

#[async_trait::async_trait]
impl TrendProvider for StaticTrendProvider {
    async fn snapshot(&self, _user_id: Uuid, _occasion: Occasion) -> EngineResult<TrendSnapshot> {
        Ok(self.snapshot.clone())
    }

    fn name(&self) -> &'static str {
        "static_trends"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_provider_returns_snapshot() {
        let snapshot = TrendSnapshot {
            trending_colors: vec!["sage".to_string()],
            ..TrendSnapshot::default()
        };
        let provider = StaticTrendProvider::new(snapshot.clone());

        let fetched = provider
            .snapshot(Uuid::new_v4(), Occasion::Casual)
            .await
            .unwrap();
        assert_eq!(fetched, snapshot);
        assert_eq!(provider.name(), "static_trends");
    }
}
