// Explore/exploit selection over ranked outfits.
//
// With probability p_explore, and only when there are more scored outfits
// than requested, the lowest-ranked slot of the top-K is replaced by the
// remainder candidate with the highest UCB1 score:
//
//   UCB(i) = mean_reward(i) + c * sqrt(2 * ln(N) / n(i))
//
// where N is the total pulls across the remainder and n(i) the pulls of
// candidate i's combination arm. Combinations that were never rated score
// +inf, so untried garment combinations get shown first.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::Serialize;
use std::time::Duration;

use crate::models::{OutfitId, ScoredOutfit};

/// Identity of a bandit arm
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArmKey {
    /// A specific generated or saved outfit
    Outfit(OutfitId),
    /// A garment combination, independent of which request generated it
    Combination(String),
}

/// Running reward statistic for one arm
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BanditArm {
    pub pulls: u64,
    pub mean_reward: f64,
}

impl BanditArm {
    /// Folds a reward into the running average
    pub fn record(&mut self, reward: f64) {
        self.pulls += 1;
        self.mean_reward += (reward - self.mean_reward) / self.pulls as f64;
    }
}

/// Process-wide reward table, updated only by the feedback recorder
///
/// Arms for ephemeral outfit ids are dropped once they have gone untouched for
/// longer than `ephemeral_ttl`: the id can no longer be served, so its arm
/// would only grow the table. Combination and saved-outfit arms are kept.
pub struct BanditTable {
    arms: DashMap<ArmKey, (BanditArm, DateTime<Utc>)>,
    ephemeral_ttl: chrono::Duration,
}

impl Default for BanditTable {
    fn default() -> Self {
        Self {
            arms: DashMap::new(),
            ephemeral_ttl: chrono::Duration::MAX,
        }
    }
}

impl BanditTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table whose ephemeral outfit arms expire after `ttl` without updates
    pub fn with_ephemeral_ttl(ttl: Duration) -> Self {
        Self {
            arms: DashMap::new(),
            ephemeral_ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    pub fn record(&self, key: ArmKey, reward: f64) {
        self.record_at(key, reward, Utc::now());
    }

    /// Records a reward as of `now`, pruning expired ephemeral arms first
    pub fn record_at(&self, key: ArmKey, reward: f64, now: DateTime<Utc>) {
        self.prune_expired_at(now);

        let mut entry = self
            .arms
            .entry(key)
            .or_insert_with(|| (BanditArm::default(), now));
        entry.0.record(reward);
        entry.1 = now;
    }

    /// Drops ephemeral outfit arms not updated within the TTL; returns how many
    pub fn prune_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.arms.len();
        let ttl = self.ephemeral_ttl;
        self.arms.retain(|key, (_, updated_at)| match key {
            ArmKey::Outfit(OutfitId::Ephemeral(_)) => now - *updated_at <= ttl,
            _ => true,
        });

        let pruned = before.saturating_sub(self.arms.len());
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned expired ephemeral bandit arms");
        }
        pruned
    }

    pub fn arm(&self, key: &ArmKey) -> Option<BanditArm> {
        self.arms.get(key).map(|entry| entry.0)
    }

    /// Current mean reward of an arm, if it was ever rewarded
    pub fn reward(&self, key: &ArmKey) -> Option<f64> {
        self.arm(key).map(|arm| arm.mean_reward)
    }

    pub fn len(&self) -> usize {
        self.arms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arms.is_empty()
    }

    pub fn clear(&self) {
        self.arms.clear();
    }
}

/// Substitutes one exploratory outfit into the top-K
pub struct ExplorationSelector {
    probability: f64,
    exploration_constant: f64,
}

impl ExplorationSelector {
    pub fn new(probability: f64, exploration_constant: f64) -> Self {
        Self {
            probability,
            exploration_constant,
        }
    }

    /// Truncates a ranked list to `limit`, occasionally swapping in an
    /// exploratory candidate for the last slot
    pub fn select<R: Rng + ?Sized>(
        &self,
        mut ranked: Vec<ScoredOutfit>,
        limit: usize,
        bandit: &BanditTable,
        rng: &mut R,
    ) -> Vec<ScoredOutfit> {
        if limit == 0 {
            return Vec::new();
        }

        if ranked.len() <= limit || self.probability <= 0.0 {
            ranked.truncate(limit);
            return ranked;
        }

        if rng.gen::<f64>() >= self.probability {
            ranked.truncate(limit);
            return ranked;
        }

        let remainder = ranked.split_off(limit);
        let pick = self.pick_from_remainder(&remainder, bandit);
        let mut chosen = match remainder.into_iter().nth(pick) {
            Some(chosen) => chosen,
            None => return ranked,
        };
        chosen.explored = true;

        tracing::debug!(
            outfit_id = %chosen.id,
            total_score = chosen.total_score,
            "Exploration substituted lower-ranked outfit"
        );

        ranked.pop();
        ranked.push(chosen);
        ranked
    }

    fn pick_from_remainder(&self, remainder: &[ScoredOutfit], bandit: &BanditTable) -> usize {
        let arms: Vec<BanditArm> = remainder
            .iter()
            .map(|outfit| {
                bandit
                    .arm(&ArmKey::Combination(outfit.combination_key()))
                    .unwrap_or_default()
            })
            .collect();
        let total_pulls: u64 = arms.iter().map(|arm| arm.pulls).sum();

        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (index, arm) in arms.iter().enumerate() {
            let score = self.ucb_score(arm, total_pulls);
            // strict comparison keeps the higher-ranked candidate on ties
            if score > best_score {
                best = index;
                best_score = score;
            }
        }
        best
    }

    fn ucb_score(&self, arm: &BanditArm, total_pulls: u64) -> f64 {
        if arm.pulls == 0 {
            return f64::INFINITY;
        }

        let explore = if total_pulls > 0 {
            self.exploration_constant
                * ((2.0 * (total_pulls as f64).ln()) / arm.pulls as f64).sqrt()
        } else {
            self.exploration_constant
        };

        arm.mean_reward + explore
    }
}
