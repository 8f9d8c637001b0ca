use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::RatingStore,
    models::{rating_reward, Feedback, InteractionType, OutfitId, RatingAck, WardrobeItem},
    services::{exploration::ArmKey, state::EngineState},
};

/// Closes the loop from user feedback back into bandit and preference state
pub struct FeedbackRecorder {
    state: Arc<EngineState>,
    ratings: Arc<dyn RatingStore>,
}

impl FeedbackRecorder {
    pub fn new(state: Arc<EngineState>, ratings: Arc<dyn RatingStore>) -> Self {
        Self { state, ratings }
    }

    /// Records a 1-5 rating of an outfit
    ///
    /// 1. the outfit's bandit arm gets the mapped reward
    /// 2. if the outfit is still cached, every item's preference weights move
    ///    and the combination arm gets the reward too
    /// 3. a saved outfit also gets a durable rating row
    ///
    /// Never fails: a cache miss skips step 2, a failed write is absorbed.
    pub async fn record_rating(
        &self,
        user_id: Uuid,
        outfit_id: &OutfitId,
        rating: u8,
        reason: Option<&str>,
    ) -> RatingAck {
        let rating = if (1..=5).contains(&rating) {
            rating
        } else {
            tracing::warn!(rating, outfit_id = %outfit_id, "Rating out of range, clamping");
            rating.clamp(1, 5)
        };
        let reward = rating_reward(rating);

        self.state
            .bandit
            .record(ArmKey::Outfit(outfit_id.clone()), reward);

        let items_updated = match self.state.cache.get(outfit_id) {
            Some(entry) if entry.user_id != user_id => {
                tracing::warn!(
                    user_id = %user_id,
                    owner = %entry.user_id,
                    outfit_id = %outfit_id,
                    "Rating for another user's outfit, skipping preference update"
                );
                0
            }
            Some(entry) => {
                for item in &entry.items {
                    self.state
                        .profiles
                        .update(user_id, item, Feedback::Rating(rating));
                }
                self.state.bandit.record(
                    ArmKey::Combination(crate::models::outfit::combination_key(&entry.items)),
                    reward,
                );
                entry.items.len()
            }
            None => {
                tracing::debug!(outfit_id = %outfit_id, "Rated outfit not in cache");
                0
            }
        };

        let persisted = match outfit_id.durable() {
            Some(durable_id) => match self
                .ratings
                .upsert_rating(user_id, durable_id, rating, reason)
                .await
            {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!(
                        error = %e,
                        foreign_key = e.is_foreign_key_violation(),
                        outfit_id = %outfit_id,
                        "Durable rating not written"
                    );
                    false
                }
            },
            None => false,
        };

        tracing::info!(
            user_id = %user_id,
            outfit_id = %outfit_id,
            rating,
            reward,
            items_updated,
            persisted,
            "Outfit rating recorded"
        );

        RatingAck {
            outfit_id: outfit_id.clone(),
            reward,
            items_updated,
            persisted,
        }
    }

    /// Direct per-item feedback that bypasses outfits and the cache
    pub fn record_interaction(
        &self,
        user_id: Uuid,
        item: &WardrobeItem,
        interaction: InteractionType,
    ) {
        self.state
            .profiles
            .update(user_id, item, Feedback::Interaction(interaction));

        tracing::debug!(
            user_id = %user_id,
            item_id = %item.id,
            interaction = ?interaction,
            "Item interaction recorded"
        );
    }
}
