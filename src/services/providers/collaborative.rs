//! Collaborative-filtering oracles
//!
//! The CF model itself lives out of process. These clients only ship the
//! candidate's item ids and attributes and read back one score per candidate.

use crate::{
    error::{EngineError, EngineResult},
    models::OutfitCandidate,
    services::{
        circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState},
        providers::CfOracle,
    },
};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// CF score used whenever the oracle can't answer
pub const NEUTRAL_CF_SCORE: f64 = 0.5;

#[derive(Debug, Serialize)]
struct CfScoreRequest<'a> {
    user_id: Uuid,
    candidates: Vec<CfCandidate<'a>>,
}

#[derive(Debug, Serialize)]
struct CfCandidate<'a> {
    item_ids: Vec<Uuid>,
    categories: Vec<&'a str>,
    colors: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CfScoreResponse {
    scores: Vec<f64>,
}

/// Calls the CF scoring service over HTTP
#[derive(Clone)]
pub struct HttpCfOracle {
    http_client: HttpClient,
    api_url: String,
}

impl HttpCfOracle {
    pub fn new(api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url,
        }
    }
}

#[async_trait::async_trait]
impl CfOracle for HttpCfOracle {
    async fn score(
        &self,
        user_id: Uuid,
        candidates: &[OutfitCandidate],
    ) -> EngineResult<Vec<f64>> {
        let request = CfScoreRequest {
            user_id,
            candidates: candidates
                .iter()
                .map(|candidate| CfCandidate {
                    item_ids: candidate.items.iter().map(|item| item.id).collect(),
                    categories: candidate
                        .items
                        .iter()
                        .map(|item| item.attributes.category.as_str())
                        .collect(),
                    colors: candidate
                        .items
                        .iter()
                        .map(|item| item.attributes.color.as_str())
                        .collect(),
                })
                .collect(),
        };

        let url = format!("{}/v1/score", self.api_url);
        let response = self.http_client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::ExternalApi(format!(
                "CF service returned status {}: {}",
                status, body
            )));
        }

        let payload: CfScoreResponse = response.json().await?;
        if payload.scores.len() != candidates.len() {
            return Err(EngineError::ExternalApi(format!(
                "CF service returned {} scores for {} candidates",
                payload.scores.len(),
                candidates.len()
            )));
        }

        Ok(payload
            .scores
            .into_iter()
            .map(|score| if score.is_finite() { score.clamp(0.0, 1.0) } else { NEUTRAL_CF_SCORE })
            .collect())
    }

    fn name(&self) -> &'static str {
        "http_cf"
    }
}

/// Stand-in when no CF service is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralCfOracle;

#[async_trait::async_trait]
impl CfOracle for NeutralCfOracle {
    async fn score(
        &self,
        _user_id: Uuid,
        candidates: &[OutfitCandidate],
    ) -> EngineResult<Vec<f64>> {
        Ok(vec![NEUTRAL_CF_SCORE; candidates.len()])
    }

    fn name(&self) -> &'static str {
        "neutral_cf"
    }
}

/// Wraps another oracle with a per-call timeout and a circuit breaker
///
/// Once the inner oracle keeps failing, calls fail fast instead of spending
/// the timeout on every candidate of every request.
pub struct CircuitBreakerCfOracle {
    inner: Arc<dyn CfOracle>,
    breaker: CircuitBreaker,
}

impl CircuitBreakerCfOracle {
    pub fn new(inner: Arc<dyn CfOracle>, config: CircuitBreakerConfig) -> Self {
        Self {
            inner,
            breaker: CircuitBreaker::new("cf_oracle", config),
        }
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }
}

#[async_trait::async_trait]
impl CfOracle for CircuitBreakerCfOracle {
    async fn score(
        &self,
        user_id: Uuid,
        candidates: &[OutfitCandidate],
    ) -> EngineResult<Vec<f64>> {
        self.breaker
            .call(|| self.inner.score(user_id, candidates))
            .await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::MockCfOracle;
    use std::time::Duration;

    #[tokio::test]
    async fn test_neutral_oracle_scores_every_candidate() {
        let candidates = vec![
            OutfitCandidate::new(vec![], String::new()),
            OutfitCandidate::new(vec![], String::new()),
        ];
        let scores = NeutralCfOracle
            .score(Uuid::new_v4(), &candidates)
            .await
            .unwrap();
        assert_eq!(scores, vec![0.5, 0.5]);
    }

    #[tokio::test]
    async fn test_breaker_stops_calling_failing_oracle() {
        let mut mock = MockCfOracle::new();
        mock.expect_score()
            .times(2)
            .returning(|_, _| Err(EngineError::ExternalApi("down".to_string())));
        mock.expect_name().return_const("mock_cf");

        let oracle = CircuitBreakerCfOracle::new(
            Arc::new(mock),
            CircuitBreakerConfig {
                failure_threshold: 2,
                open_duration: Duration::from_secs(60),
                call_timeout: Duration::from_millis(100),
            },
        );

        let candidates = vec![OutfitCandidate::new(vec![], String::new())];
        for _ in 0..5 {
            assert!(oracle.score(Uuid::new_v4(), &candidates).await.is_err());
        }
        assert_eq!(oracle.circuit_state(), CircuitState::Open);
    }
}
