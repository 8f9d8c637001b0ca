use dashmap::DashMap;
use serde::Serialize;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

use crate::models::{Feedback, WardrobeItem};

/// Neutral preference score for an item the profile knows nothing about
pub const NEUTRAL_PREFERENCE: f64 = 0.5;

const MAX_WEIGHT: f64 = 3.0;

/// Per-user online preference model
///
/// Each item is reduced to a handful of attribute features (category, color,
/// style, pattern and the item itself). Feedback nudges the weight of every
/// feature of the rated item; an item's score is the logistic of the mean
/// weight of its features, so unseen items score exactly 0.5.
#[derive(Debug, Clone, Serialize)]
pub struct UserPreferenceProfile {
    pub user_id: Uuid,
    weights: HashMap<String, f64>,
    updates: u64,
}

impl UserPreferenceProfile {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            weights: HashMap::new(),
            updates: 0,
        }
    }

    /// Preference for an item in [0,1]
    pub fn score_item_normalized(&self, item: &WardrobeItem) -> f64 {
        let features = item_features(item);
        let total: f64 = features
            .iter()
            .map(|feature| self.weights.get(feature).copied().unwrap_or(0.0))
            .sum();
        logistic(total / features.len() as f64)
    }

    /// Applies one feedback signal to every feature of the item
    pub fn update(&mut self, item: &WardrobeItem, feedback: Feedback) {
        let delta = feedback.preference_delta();
        for feature in item_features(item) {
            let weight = self.weights.entry(feature).or_insert(0.0);
            *weight = (*weight + delta).clamp(-MAX_WEIGHT, MAX_WEIGHT);
        }
        self.updates += 1;
    }

    pub fn weight(&self, feature: &str) -> Option<f64> {
        self.weights.get(feature).copied()
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }
}

fn item_features(item: &WardrobeItem) -> Vec<String> {
    let attrs = &item.attributes;
    let mut features = vec![
        format!("item:{}", item.id.simple()),
        format!("category:{}", attrs.category.trim().to_lowercase()),
        format!("color:{}", attrs.color.trim().to_lowercase()),
    ];
    if let Some(style) = attrs.style.as_deref().filter(|s| !s.trim().is_empty()) {
        features.push(format!("style:{}", style.trim().to_lowercase()));
    }
    if let Some(pattern) = attrs.pattern.as_deref().filter(|p| !p.trim().is_empty()) {
        features.push(format!("pattern:{}", pattern.trim().to_lowercase()));
    }
    features
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Process-wide map of user profiles
///
/// Profiles are created lazily on first update. Updates for one user hold that
/// user's shard entry for the whole mutation, so concurrent feedback for the
/// same user never loses an update.
#[derive(Default)]
pub struct ProfileStore {
    profiles: DashMap<Uuid, UserPreferenceProfile>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score a single item; users without a profile get the neutral score
    pub fn score_item(&self, user_id: Uuid, item: &WardrobeItem) -> f64 {
        self.profiles
            .get(&user_id)
            .map(|profile| profile.score_item_normalized(item))
            .unwrap_or(NEUTRAL_PREFERENCE)
    }

    /// Arithmetic mean of the item scores
    pub fn score_items(&self, user_id: Uuid, items: &[Arc<WardrobeItem>]) -> f64 {
        if items.is_empty() {
            return NEUTRAL_PREFERENCE;
        }

        match self.profiles.get(&user_id) {
            Some(profile) => {
                items
                    .iter()
                    .map(|item| profile.score_item_normalized(item))
                    .sum::<f64>()
                    / items.len() as f64
            }
            None => NEUTRAL_PREFERENCE,
        }
    }

    pub fn update(&self, user_id: Uuid, item: &WardrobeItem, feedback: Feedback) {
        self.profiles
            .entry(user_id)
            .or_insert_with(|| UserPreferenceProfile::new(user_id))
            .update(item, feedback);
    }

    /// Copy of a user's profile, if one exists
    pub fn snapshot(&self, user_id: Uuid) -> Option<UserPreferenceProfile> {
        self.profiles.get(&user_id).map(|profile| profile.clone())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn clear(&self) {
        self.profiles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InteractionType;

    #[test]
    fn test_unseen_item_is_neutral() {
        let user = Uuid::new_v4();
        let profile = UserPreferenceProfile::new(user);
        let item = WardrobeItem::new(user, "top", "white");
        assert_eq!(profile.score_item_normalized(&item), 0.5);
    }

    #[test]
    fn test_positive_rating_raises_score() {
        let user = Uuid::new_v4();
        let mut profile = UserPreferenceProfile::new(user);
        let item = WardrobeItem::new(user, "top", "white").with_style("casual");
        profile.update(&item, Feedback::Rating(5));

        assert!(profile.score_item_normalized(&item) > 0.5);
        assert_eq!(profile.weight("color:white"), Some(0.5));
        assert_eq!(profile.weight("style:casual"), Some(0.5));
        assert_eq!(profile.updates(), 1);
    }

    #[test]
    fn test_feedback_generalizes_through_shared_attributes() {
        let user = Uuid::new_v4();
        let mut profile = UserPreferenceProfile::new(user);
        let rated = WardrobeItem::new(user, "top", "red");
        let sibling = WardrobeItem::new(user, "bottom", "red");
        let unrelated = WardrobeItem::new(user, "bottom", "green");
        profile.update(&rated, Feedback::Interaction(InteractionType::Dislike));

        assert!(profile.score_item_normalized(&sibling) < 0.5);
        assert_eq!(profile.score_item_normalized(&unrelated), 0.5);
    }

    #[test]
    fn test_pattern_feature_carries_to_other_items() {
        let user = Uuid::new_v4();
        let mut profile = UserPreferenceProfile::new(user);
        let rated = WardrobeItem::new(user, "top", "white").with_pattern(" Striped ");
        let same_pattern = WardrobeItem::new(user, "bottom", "navy").with_pattern("striped");
        let plain = WardrobeItem::new(user, "bottom", "navy");
        profile.update(&rated, Feedback::Rating(5));

        assert_eq!(profile.weight("pattern:striped"), Some(0.5));
        assert!(profile.score_item_normalized(&same_pattern) > 0.5);
        assert_eq!(profile.score_item_normalized(&plain), 0.5);
    }

    #[test]
    fn test_weights_are_clamped() {
        let user = Uuid::new_v4();
        let mut profile = UserPreferenceProfile::new(user);
        let item = WardrobeItem::new(user, "dress", "black");
        for _ in 0..50 {
            profile.update(&item, Feedback::Interaction(InteractionType::Like));
        }
        assert_eq!(profile.weight("category:dress"), Some(3.0));
        let score = profile.score_item_normalized(&item);
        assert!(score < 1.0 && score > 0.9);
    }

    #[test]
    fn test_store_lazily_creates_profiles() {
        let store = ProfileStore::new();
        let user = Uuid::new_v4();
        let item = Arc::new(WardrobeItem::new(user, "shoes", "tan"));

        assert_eq!(store.score_items(user, &[item.clone()]), 0.5);
        assert!(store.snapshot(user).is_none());

        store.update(user, &item, Feedback::Rating(1));
        assert!(store.score_items(user, &[item.clone()]) < 0.5);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let store = Arc::new(ProfileStore::new());
        let user = Uuid::new_v4();
        let item = Arc::new(WardrobeItem::new(user, "top", "navy"));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                let item = item.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store.update(user, &item, Feedback::Interaction(InteractionType::Skip));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.snapshot(user).unwrap().updates(), 100);
    }
}
