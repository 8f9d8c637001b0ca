use serde::{Deserialize, Serialize};

use super::OutfitId;

/// Step applied per rating point away from the neutral rating of 3
const RATING_STEP: f64 = 0.5;

/// Direct per-item interaction reported by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    Like,
    Dislike,
    Wear,
    Save,
    Skip,
}

/// Feedback signal fed into a user's preference profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Feedback {
    /// Star rating of an outfit containing the item, 1..=5
    Rating(u8),
    Interaction(InteractionType),
}

impl Feedback {
    /// Signed weight change applied to each of the item's preference features
    pub fn preference_delta(&self) -> f64 {
        match self {
            Feedback::Rating(rating) => {
                let rating = (*rating).clamp(1, 5) as f64;
                (rating - 3.0) / 2.0 * RATING_STEP
            }
            Feedback::Interaction(InteractionType::Like) => 0.4,
            Feedback::Interaction(InteractionType::Dislike) => -0.4,
            Feedback::Interaction(InteractionType::Wear) => 0.2,
            Feedback::Interaction(InteractionType::Save) => 0.3,
            Feedback::Interaction(InteractionType::Skip) => -0.1,
        }
    }
}

/// Maps a 1-5 rating onto the bandit reward scale
pub fn rating_reward(rating: u8) -> f64 {
    match rating {
        r if r >= 4 => 1.0,
        r if r <= 2 => 0.0,
        _ => 0.5,
    }
}

/// Acknowledgement returned by the feedback recorder
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RatingAck {
    pub outfit_id: OutfitId,
    pub reward: f64,
    /// Number of items whose preference weights were updated from the cache entry
    pub items_updated: usize,
    /// Whether a durable rating row was written
    pub persisted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_reward_mapping() {
        assert_eq!(rating_reward(5), 1.0);
        assert_eq!(rating_reward(4), 1.0);
        assert_eq!(rating_reward(3), 0.5);
        assert_eq!(rating_reward(2), 0.0);
        assert_eq!(rating_reward(1), 0.0);
    }

    #[test]
    fn test_rating_delta_is_symmetric() {
        assert_eq!(Feedback::Rating(5).preference_delta(), 0.5);
        assert_eq!(Feedback::Rating(1).preference_delta(), -0.5);
        assert_eq!(Feedback::Rating(3).preference_delta(), 0.0);
        // out-of-range ratings are clamped
        assert_eq!(Feedback::Rating(9).preference_delta(), 0.5);
    }

    #[test]
    fn test_interaction_serialization() {
        let json = serde_json::to_string(&InteractionType::Dislike).unwrap();
        assert_eq!(json, "\"dislike\"");
        let parsed: InteractionType = serde_json::from_str("\"wear\"").unwrap();
        assert_eq!(parsed, InteractionType::Wear);
    }
}
