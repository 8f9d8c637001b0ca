use std::{collections::HashSet, sync::Arc};

use crate::models::{ItemCategory, Occasion, WardrobeItem, WeatherTag};

/// Rule-based scoring oracles
///
/// Scores are in [0,1]; exactly 0 is a hard reject that removes the candidate.
pub trait RuleOracles: Send + Sync {
    fn occasion_score(&self, items: &[Arc<WardrobeItem>], occasion: Occasion) -> f64;

    fn weather_score(&self, items: &[Arc<WardrobeItem>], weather: &[WeatherTag]) -> f64;

    fn color_harmony_ok(&self, items: &[Arc<WardrobeItem>]) -> bool;
}

const NEUTRAL_COLORS: &[&str] = &[
    "black", "white", "grey", "gray", "beige", "navy", "cream", "ivory", "denim", "brown", "tan",
    "khaki", "camel", "charcoal",
];

const CLASHING_PAIRS: &[(&str, &str)] = &[
    ("red", "green"),
    ("red", "pink"),
    ("orange", "pink"),
    ("orange", "purple"),
    ("purple", "yellow"),
];

/// Style-to-occasion compatibility; items without a known style score neutral
fn style_fit(style: &str, occasion: Occasion) -> f64 {
    match (occasion, style) {
        (Occasion::Formal, "formal" | "elegant" | "classic") => 1.0,
        (Occasion::Formal, "business") => 0.8,
        (Occasion::Formal, "casual" | "streetwear") => 0.3,
        (Occasion::Formal, "sporty" | "athletic") => 0.0,

        (Occasion::Work, "business" | "formal" | "classic") => 1.0,
        (Occasion::Work, "smart casual" | "minimalist") => 0.9,
        (Occasion::Work, "casual") => 0.6,
        (Occasion::Work, "sporty" | "athletic") => 0.2,
        (Occasion::Work, "party") => 0.0,

        (Occasion::Casual, "casual" | "streetwear" | "minimalist") => 1.0,
        (Occasion::Casual, "sporty" | "athletic") => 0.8,
        (Occasion::Casual, _) => 0.7,

        (Occasion::Party | Occasion::Date, "party" | "elegant") => 1.0,
        (Occasion::Party | Occasion::Date, "formal" | "classic" | "streetwear") => 0.8,
        (Occasion::Party | Occasion::Date, "casual" | "minimalist") => 0.7,
        (Occasion::Party | Occasion::Date, "sporty" | "athletic") => 0.3,

        (Occasion::Sport, "sporty" | "athletic") => 1.0,
        (Occasion::Sport, "casual") => 0.6,
        (Occasion::Sport, "formal" | "elegant" | "business") => 0.0,

        _ => 0.6,
    }
}

/// Built-in rules used when no external rule service is wired in
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRules;

impl RuleOracles for DefaultRules {
    fn occasion_score(&self, items: &[Arc<WardrobeItem>], occasion: Occasion) -> f64 {
        if items.is_empty() {
            return 0.0;
        }

        let mut total = 0.0;
        for item in items {
            let fit = match item.attributes.style.as_deref() {
                Some(style) => style_fit(style.trim().to_lowercase().as_str(), occasion),
                None => 0.6,
            };
            if fit == 0.0 {
                return 0.0;
            }
            total += fit;
        }
        total / items.len() as f64
    }

    fn weather_score(&self, items: &[Arc<WardrobeItem>], weather: &[WeatherTag]) -> f64 {
        let has = |tag: WeatherTag| weather.contains(&tag);
        let has_outerwear = items
            .iter()
            .any(|item| item.category() == ItemCategory::Outerwear);
        let exposed = items.iter().any(|item| {
            let label = item.attributes.category.to_lowercase();
            label.contains("shorts") || label.contains("sandal") || label.contains("tank")
        });

        if has(WeatherTag::Hot) && has_outerwear {
            return 0.0;
        }
        if (has(WeatherTag::Cold) || has(WeatherTag::Snow)) && exposed {
            return 0.0;
        }

        let mut score: f64 = 1.0;
        if (has(WeatherTag::Cold) || has(WeatherTag::Snow)) && !has_outerwear {
            score -= 0.6;
        }
        if has(WeatherTag::Rain) {
            let waterproof = items.iter().any(|item| {
                item.tags
                    .iter()
                    .any(|tag| tag.eq_ignore_ascii_case("waterproof"))
            });
            if !waterproof {
                score -= 0.2;
            }
        }
        if has(WeatherTag::Wind) && !has_outerwear {
            score -= 0.1;
        }
        score.clamp(0.0, 1.0)
    }

    fn color_harmony_ok(&self, items: &[Arc<WardrobeItem>]) -> bool {
        let hues: HashSet<String> = items
            .iter()
            .map(|item| item.attributes.color.trim().to_lowercase())
            .filter(|color| !NEUTRAL_COLORS.contains(&color.as_str()))
            .collect();

        if hues.len() > 2 {
            return false;
        }

        !CLASHING_PAIRS
            .iter()
            .any(|(a, b)| hues.contains(*a) && hues.contains(*b))
    }
}
