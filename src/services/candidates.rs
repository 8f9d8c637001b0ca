use rand::Rng;
use std::sync::Arc;

use crate::models::{ItemCategory, Occasion, OutfitCandidate, WardrobeItem, WeatherTag};

/// Builds outfit candidates from a categorized wardrobe
pub struct CandidateGenerator {
    max_per_category: usize,
    accessory_probability: f64,
}

/// Wardrobe items partitioned by category, each list truncated
#[derive(Default)]
struct Buckets {
    tops: Vec<Arc<WardrobeItem>>,
    bottoms: Vec<Arc<WardrobeItem>>,
    dresses: Vec<Arc<WardrobeItem>>,
    outerwear: Vec<Arc<WardrobeItem>>,
    shoes: Vec<Arc<WardrobeItem>>,
    accessories: Vec<Arc<WardrobeItem>>,
}

impl Buckets {
    fn partition(items: &[Arc<WardrobeItem>], max_per_category: usize) -> Self {
        let mut buckets = Buckets::default();
        for item in items {
            let bucket = match item.category() {
                ItemCategory::Top => &mut buckets.tops,
                ItemCategory::Bottom => &mut buckets.bottoms,
                ItemCategory::Dress => &mut buckets.dresses,
                ItemCategory::Outerwear => &mut buckets.outerwear,
                ItemCategory::Shoes => &mut buckets.shoes,
                ItemCategory::Accessory => &mut buckets.accessories,
                ItemCategory::Other => continue,
            };
            if bucket.len() < max_per_category {
                bucket.push(item.clone());
            }
        }
        buckets
    }
}

impl CandidateGenerator {
    pub fn new(max_per_category: usize, accessory_probability: f64) -> Self {
        Self {
            max_per_category: max_per_category.max(1),
            accessory_probability,
        }
    }

    /// Builds candidates for one request
    ///
    /// - one candidate per dress, plus a pair of shoes when available and,
    ///   with `accessory_probability`, an accessory
    /// - one candidate per (top, bottom) pair, plus outerwear in cold or mild
    ///   weather and shoes when available
    /// - if nothing could be paired, a single candidate of the first three items
    ///
    /// Accompanying pieces rotate through their category so candidates don't all
    /// share the same shoes.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        items: &[Arc<WardrobeItem>],
        occasion: Occasion,
        weather: &[WeatherTag],
        rng: &mut R,
    ) -> Vec<OutfitCandidate> {
        let buckets = Buckets::partition(items, self.max_per_category);
        let mut candidates = Vec::new();

        for (i, dress) in buckets.dresses.iter().enumerate() {
            let mut outfit = vec![dress.clone()];
            if let Some(shoes) = rotate(&buckets.shoes, i) {
                outfit.push(shoes);
            }
            if !buckets.accessories.is_empty() && rng.gen::<f64>() < self.accessory_probability {
                let pick = rng.gen_range(0..buckets.accessories.len());
                outfit.push(buckets.accessories[pick].clone());
            }
            candidates.push(self.candidate(outfit, occasion));
        }

        let layered =
            weather.contains(&WeatherTag::Cold) || weather.contains(&WeatherTag::Mild);
        for (t, top) in buckets.tops.iter().enumerate() {
            for (b, bottom) in buckets.bottoms.iter().enumerate() {
                let slot = t * buckets.bottoms.len() + b;
                let mut outfit = vec![top.clone(), bottom.clone()];
                if layered {
                    if let Some(layer) = rotate(&buckets.outerwear, slot) {
                        outfit.push(layer);
                    }
                }
                if let Some(shoes) = rotate(&buckets.shoes, slot) {
                    outfit.push(shoes);
                }
                candidates.push(self.candidate(outfit, occasion));
            }
        }

        if candidates.is_empty() && !items.is_empty() {
            let fallback: Vec<Arc<WardrobeItem>> = items.iter().take(3).cloned().collect();
            candidates.push(self.candidate(fallback, occasion));
        }

        tracing::debug!(
            wardrobe_size = items.len(),
            candidates = candidates.len(),
            "Generated outfit candidates"
        );

        candidates
    }

    fn candidate(&self, items: Vec<Arc<WardrobeItem>>, occasion: Occasion) -> OutfitCandidate {
        let labels: Vec<String> = items.iter().map(|item| item.label()).collect();
        let description = format!("{} look: {}", occasion, labels.join(" + "));
        OutfitCandidate::new(items, description)
    }
}

fn rotate(pool: &[Arc<WardrobeItem>], slot: usize) -> Option<Arc<WardrobeItem>> {
    if pool.is_empty() {
        None
    } else {
        Some(pool[slot % pool.len()].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use uuid::Uuid;

    fn wardrobe(pieces: &[(&str, &str)]) -> Vec<Arc<WardrobeItem>> {
        let user = Uuid::new_v4();
        pieces.iter()
            .map(|(category, color)| Arc::new(WardrobeItem::new(user, category, color)))
            .collect()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_tops_times_bottoms() {
        let items = wardrobe(&[
            ("top", "white"),
            ("top", "blue"),
            ("bottom", "black"),
            ("jeans", "denim"),
            ("skirt", "grey"),
        ]);
        let generator = CandidateGenerator::new(6, 0.5);
        let candidates = generator.generate(&items, Occasion::Casual, &[], &mut rng());

        assert_eq!(candidates.len(), 6);
        assert!(candidates.iter().all(|c| c.items.len() == 2));
    }

    #[test]
    fn test_outerwear_added_in_cold_weather() {
        let items = wardrobe(&[("top", "white"), ("bottom", "black"), ("coat", "camel")]);
        let generator = CandidateGenerator::new(6, 0.5);

        let cold = generator.generate(&items, Occasion::Work, &[WeatherTag::Cold], &mut rng());
        assert_eq!(cold.len(), 1);
        assert_eq!(cold[0].items.len(), 3);

        let hot = generator.generate(&items, Occasion::Work, &[WeatherTag::Hot], &mut rng());
        assert_eq!(hot[0].items.len(), 2);
    }

    #[test]
    fn test_shoes_appended_to_pairs_and_dresses() {
        let items = wardrobe(&[
            ("dress", "red"),
            ("top", "white"),
            ("bottom", "black"),
            ("sneakers", "white"),
        ]);
        let generator = CandidateGenerator::new(6, 0.0);
        let candidates = generator.generate(&items, Occasion::Casual, &[], &mut rng());

        assert_eq!(candidates.len(), 2);
        assert!(candidates
            .iter()
            .all(|c| c.items.iter().any(|i| i.category() == ItemCategory::Shoes)));
    }

    #[test]
    fn test_accessory_always_added_when_probability_is_one() {
        let items = wardrobe(&[("dress", "black"), ("bag", "tan")]);
        let generator = CandidateGenerator::new(6, 1.0);
        let candidates = generator.generate(&items, Occasion::Party, &[], &mut rng());

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].items.len(), 2);
        assert_eq!(candidates[0].items[1].category(), ItemCategory::Accessory);
    }

    #[test]
    fn test_fallback_takes_first_three_items() {
        let items = wardrobe(&[
            ("top", "white"),
            ("top", "black"),
            ("scarf", "red"),
            ("hat", "blue"),
        ]);
        let generator = CandidateGenerator::new(6, 0.5);
        let candidates = generator.generate(&items, Occasion::Casual, &[], &mut rng());

        assert_eq!(candidates.len(), 1);
        let ids: Vec<Uuid> = candidates[0].items.iter().map(|i| i.id).collect();
        let expected: Vec<Uuid> = items.iter().take(3).map(|i| i.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_empty_wardrobe_yields_nothing() {
        let generator = CandidateGenerator::new(6, 0.5);
        assert!(generator
            .generate(&[], Occasion::Casual, &[], &mut rng())
            .is_empty());
    }

    #[test]
    fn test_categories_truncated_before_pairing() {
        let mut pieces = Vec::new();
        for _ in 0..10 {
            pieces.push(("top", "white"));
            pieces.push(("bottom", "black"));
        }
        let items = wardrobe(&pieces);
        let generator = CandidateGenerator::new(4, 0.5);
        let candidates = generator.generate(&items, Occasion::Casual, &[], &mut rng());

        assert_eq!(candidates.len(), 16);
    }

    #[test]
    fn test_description_lists_items() {
        let items = wardrobe(&[("top", "White"), ("bottom", "black")]);
        let generator = CandidateGenerator::new(6, 0.5);
        let candidates = generator.generate(&items, Occasion::Casual, &[], &mut rng());
        assert_eq!(candidates[0].description, "casual look: white top + black bottom");
    }
}
