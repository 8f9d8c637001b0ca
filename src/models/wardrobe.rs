use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

use crate::error::EngineError;

/// Attribute bag describing a single garment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemAttributes {
    /// Free-form category label as entered by the user (e.g. "jeans", "top")
    pub category: String,
    pub color: String,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
}

/// A garment owned by a user
///
/// Owned and mutated by wardrobe management. The engine only reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WardrobeItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub attributes: ItemAttributes,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub wear_count: u32,
    #[serde(default)]
    pub last_worn: Option<NaiveDate>,
}

impl WardrobeItem {
    /// Creates an item with no tags and no wear history
    pub fn new(user_id: Uuid, category: &str, color: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            attributes: ItemAttributes {
                category: category.to_string(),
                color: color.to_string(),
                pattern: None,
                style: None,
            },
            tags: Vec::new(),
            wear_count: 0,
            last_worn: None,
        }
    }

    pub fn with_style(mut self, style: &str) -> Self {
        self.attributes.style = Some(style.to_string());
        self
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.attributes.pattern = Some(pattern.to_string());
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Normalized category used for candidate partitioning
    pub fn category(&self) -> ItemCategory {
        ItemCategory::from_label(&self.attributes.category)
    }

    /// Short human-readable label, e.g. "white top"
    pub fn label(&self) -> String {
        format!(
            "{} {}",
            self.attributes.color.to_lowercase(),
            self.attributes.category.to_lowercase()
        )
    }
}

/// Garment categories the candidate generator understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemCategory {
    Top,
    Bottom,
    Dress,
    Outerwear,
    Shoes,
    Accessory,
    Other,
}

impl ItemCategory {
    /// Maps a free-form category label onto a known category
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "top" | "tops" | "shirt" | "t-shirt" | "tshirt" | "blouse" | "sweater" | "tank"
            | "polo" | "hoodie" | "knitwear" => ItemCategory::Top,
            "bottom" | "bottoms" | "pants" | "trousers" | "jeans" | "skirt" | "shorts"
            | "leggings" | "chinos" => ItemCategory::Bottom,
            "dress" | "dresses" | "jumpsuit" | "gown" => ItemCategory::Dress,
            "outerwear" | "jacket" | "coat" | "blazer" | "cardigan" | "parka" | "raincoat" => {
                ItemCategory::Outerwear
            }
            "shoes" | "shoe" | "sneakers" | "boots" | "heels" | "sandals" | "loafers" | "flats" => {
                ItemCategory::Shoes
            }
            "accessory" | "accessories" | "bag" | "hat" | "scarf" | "belt" | "jewelry"
            | "watch" | "sunglasses" => ItemCategory::Accessory,
            _ => ItemCategory::Other,
        }
    }
}

/// Occasion an outfit is being generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Occasion {
    Casual,
    Work,
    Formal,
    Party,
    Date,
    Sport,
}

impl Display for Occasion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Occasion::Casual => "casual",
            Occasion::Work => "work",
            Occasion::Formal => "formal",
            Occasion::Party => "party",
            Occasion::Date => "date",
            Occasion::Sport => "sport",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for Occasion {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "casual" | "everyday" | "weekend" => Ok(Occasion::Casual),
            "work" | "office" | "business" => Ok(Occasion::Work),
            "formal" | "wedding" | "gala" => Ok(Occasion::Formal),
            "party" | "night out" | "night-out" => Ok(Occasion::Party),
            "date" | "date night" => Ok(Occasion::Date),
            "sport" | "gym" | "workout" | "athletic" => Ok(Occasion::Sport),
            other => Err(EngineError::InvalidInput(format!(
                "Unknown occasion: {}",
                other
            ))),
        }
    }
}

/// Coarse weather conditions relevant to outfit choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherTag {
    Hot,
    Warm,
    Mild,
    Cold,
    Rain,
    Snow,
    Wind,
}

impl FromStr for WeatherTag {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hot" => Ok(WeatherTag::Hot),
            "warm" => Ok(WeatherTag::Warm),
            "mild" => Ok(WeatherTag::Mild),
            "cold" => Ok(WeatherTag::Cold),
            "rain" | "rainy" => Ok(WeatherTag::Rain),
            "snow" | "snowy" => Ok(WeatherTag::Snow),
            "wind" | "windy" => Ok(WeatherTag::Wind),
            other => Err(EngineError::InvalidInput(format!(
                "Unknown weather tag: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_synonyms() {
        assert_eq!(ItemCategory::from_label("Jeans"), ItemCategory::Bottom);
        assert_eq!(ItemCategory::from_label(" sneakers "), ItemCategory::Shoes);
        assert_eq!(ItemCategory::from_label("blazer"), ItemCategory::Outerwear);
        assert_eq!(ItemCategory::from_label("umbrella"), ItemCategory::Other);
    }

    #[test]
    fn test_occasion_parse_aliases() {
        assert_eq!("Office".parse::<Occasion>().unwrap(), Occasion::Work);
        assert_eq!("gym".parse::<Occasion>().unwrap(), Occasion::Sport);
        assert!("funeral-disco".parse::<Occasion>().is_err());
    }

    #[test]
    fn test_occasion_display_round_trips() {
        let occasion = Occasion::Party;
        assert_eq!(occasion.to_string().parse::<Occasion>().unwrap(), occasion);
    }

    #[test]
    fn test_weather_tag_serialization() {
        let json = serde_json::to_string(&WeatherTag::Cold).unwrap();
        assert_eq!(json, "\"cold\"");
        assert_eq!("Rainy".parse::<WeatherTag>().unwrap(), WeatherTag::Rain);
    }

    #[test]
    fn test_item_label() {
        let item = WardrobeItem::new(Uuid::new_v4(), "Top", "White");
        assert_eq!(item.label(), "white top");
        assert_eq!(item.category(), ItemCategory::Top);
    }
}
