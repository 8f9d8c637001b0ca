use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::{
    Occasion, OutfitCandidate, OutfitId, ScoredOutfit, SignalScores, TrendSnapshot, WardrobeItem,
    WeatherTag,
};
use crate::services::{
    preferences::ProfileStore,
    providers::{collaborative::NEUTRAL_CF_SCORE, CfOracle},
    rules::RuleOracles,
};

const USER_WEIGHT: f64 = 0.4;
const TREND_WEIGHT: f64 = 0.3;
const CONTEXT_WEIGHT: f64 = 0.2;
const CF_WEIGHT: f64 = 0.1;

const TREND_BASELINE: f64 = 0.3;
const TREND_COLOR_BOOST: f64 = 0.15;
const TREND_CATEGORY_BOOST: f64 = 0.15;
const TREND_STYLE_BOOST: f64 = 0.1;
const TREND_KEYWORD_BOOST: f64 = 0.1;

/// Inputs shared by every candidate of one recommendation request
pub struct ScoringContext<'a> {
    pub user_id: Uuid,
    pub occasion: Occasion,
    pub weather: &'a [WeatherTag],
    pub trends: &'a TrendSnapshot,
    pub profiles: &'a ProfileStore,
}

/// Combines rule, trend, preference and CF signals into one ranked score
pub struct MultiSignalScorer {
    rules: Arc<dyn RuleOracles>,
    cf_oracle: Arc<dyn CfOracle>,
    cf_timeout: Duration,
}

impl MultiSignalScorer {
    pub fn new(rules: Arc<dyn RuleOracles>, cf_oracle: Arc<dyn CfOracle>, cf_timeout: Duration) -> Self {
        Self {
            rules,
            cf_oracle,
            cf_timeout,
        }
    }

    /// Scores candidates and returns the survivors sorted by total score, best first
    ///
    /// Candidates with a zero occasion or weather score, or failing color
    /// harmony, are dropped before any further work. Rule scores that are not
    /// finite count as zero. Ties keep generation order.
    ///
    /// CF lookups for the survivors run concurrently, so a hung oracle costs one
    /// `cf_timeout` per request rather than one per candidate.
    pub async fn score(
        &self,
        ctx: &ScoringContext<'_>,
        candidates: Vec<OutfitCandidate>,
    ) -> Vec<ScoredOutfit> {
        let generated = candidates.len();

        let mut survivors = Vec::with_capacity(generated);
        for candidate in candidates {
            let occasion = rule_score(self.rules.occasion_score(&candidate.items, ctx.occasion));
            let weather = rule_score(self.rules.weather_score(&candidate.items, ctx.weather));
            if occasion == 0.0 || weather == 0.0 {
                continue;
            }

            if !self.rules.color_harmony_ok(&candidate.items) {
                continue;
            }

            survivors.push((candidate, occasion, weather));
        }

        let cf_tasks: Vec<_> = survivors
            .iter()
            .map(|(candidate, _, _)| self.spawn_cf_score(ctx.user_id, candidate.clone()))
            .collect();

        let mut scored = Vec::with_capacity(survivors.len());
        for ((candidate, occasion, weather), task) in survivors.into_iter().zip(cf_tasks) {
            let cf = match task.await {
                Ok(cf) => cf,
                Err(e) => {
                    tracing::warn!(error = %e, "CF scoring task failed, using neutral score");
                    NEUTRAL_CF_SCORE
                }
            };

            let signals = SignalScores {
                occasion,
                weather,
                color_harmony_pass: true,
                user: ctx.profiles.score_items(ctx.user_id, &candidate.items),
                trend: trend_score(&candidate.items, ctx.trends),
                cf,
            };

            scored.push(ScoredOutfit {
                id: OutfitId::ephemeral(),
                items: candidate.items,
                description: candidate.description,
                total_score: total_score(&signals),
                signals,
                explored: false,
            });
        }

        scored.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));

        tracing::debug!(
            user_id = %ctx.user_id,
            generated,
            survived = scored.len(),
            "Scored outfit candidates"
        );

        scored
    }

    /// CF score for a single candidate on its own task; any failure or timeout
    /// yields the neutral score
    fn spawn_cf_score(&self, user_id: Uuid, candidate: OutfitCandidate) -> JoinHandle<f64> {
        let oracle = self.cf_oracle.clone();
        let timeout = self.cf_timeout;

        tokio::spawn(async move {
            let call = oracle.score(user_id, std::slice::from_ref(&candidate));

            match tokio::time::timeout(timeout, call).await {
                Ok(Ok(scores)) => match scores.first() {
                    Some(score) if score.is_finite() => score.clamp(0.0, 1.0),
                    _ => NEUTRAL_CF_SCORE,
                },
                Ok(Err(e)) => {
                    tracing::debug!(
                        error = %e,
                        oracle = oracle.name(),
                        "CF oracle failed, using neutral score"
                    );
                    NEUTRAL_CF_SCORE
                }
                Err(_) => {
                    tracing::debug!(
                        oracle = oracle.name(),
                        timeout_ms = timeout.as_millis() as u64,
                        "CF oracle timed out, using neutral score"
                    );
                    NEUTRAL_CF_SCORE
                }
            }
        })
    }
}

/// Rule oracle output as a usable signal: non-finite is a reject, the rest is clamped to [0,1]
fn rule_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Weighted blend of the signals, clamped to [0,1]
pub fn total_score(signals: &SignalScores) -> f64 {
    let context = signals.occasion * 0.5 + signals.weather * 0.5;
    let total = signals.user * USER_WEIGHT
        + signals.trend * TREND_WEIGHT
        + context * CONTEXT_WEIGHT
        + signals.cf * CF_WEIGHT;
    if total.is_finite() {
        total.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Trend alignment of an outfit
///
/// Starts at a baseline and adds a fixed boost per item for each trending
/// color, category, style and keyword it matches, clamped to [0,1].
pub fn trend_score(items: &[Arc<WardrobeItem>], trends: &TrendSnapshot) -> f64 {
    if trends.is_empty() {
        return TREND_BASELINE;
    }

    let mut score = TREND_BASELINE;

    for item in items {
        let attrs = &item.attributes;

        if contains_ignore_case(&trends.trending_colors, &attrs.color) {
            score += TREND_COLOR_BOOST;
        }
        if trends
            .trending_categories
            .iter()
            .any(|trending| fuzzy_match(&attrs.category, trending))
        {
            score += TREND_CATEGORY_BOOST;
        }
        if let Some(style) = &attrs.style {
            if contains_ignore_case(&trends.trending_styles, style) {
                score += TREND_STYLE_BOOST;
            }
        }
        if item.tags.iter().any(|tag| {
            trends
                .keywords
                .iter()
                .any(|keyword| fuzzy_match(tag, keyword))
        }) {
            score += TREND_KEYWORD_BOOST;
        }
    }

    score.clamp(0.0, 1.0)
}

fn contains_ignore_case(haystack: &[String], needle: &str) -> bool {
    let needle = needle.trim();
    !needle.is_empty()
        && haystack
            .iter()
            .any(|candidate| candidate.trim().eq_ignore_ascii_case(needle))
}

/// Case-insensitive match where either side may contain the other
/// ("top" ~ "crop tops", "denim" ~ "denim jacket")
fn fuzzy_match(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(&b) || b.contains(&a)
}
