use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt::Display, str::FromStr, sync::Arc};
use uuid::Uuid;

use super::WardrobeItem;
use crate::error::EngineError;

const EPHEMERAL_PREFIX: &str = "gen_";

/// Identifier for an outfit, which is either a generated (ephemeral) outfit or
/// one the user explicitly saved
///
/// The two are never interchangeable: only `Saved` ids are ever written to
/// durable storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OutfitId {
    /// Generated recommendation, valid only while its cache entry lives
    Ephemeral(Uuid),
    /// Outfit persisted through the save flow
    Saved(Uuid),
}

impl OutfitId {
    /// Fresh ephemeral id for a newly scored candidate
    pub fn ephemeral() -> Self {
        OutfitId::Ephemeral(Uuid::new_v4())
    }

    /// The durable id, if this outfit was saved
    pub fn durable(&self) -> Option<Uuid> {
        match self {
            OutfitId::Saved(id) => Some(*id),
            OutfitId::Ephemeral(_) => None,
        }
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self, OutfitId::Ephemeral(_))
    }
}

impl Display for OutfitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutfitId::Ephemeral(id) => write!(f, "{}{}", EPHEMERAL_PREFIX, id.simple()),
            OutfitId::Saved(id) => write!(f, "{}", id.hyphenated()),
        }
    }
}

impl FromStr for OutfitId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(token) = s.strip_prefix(EPHEMERAL_PREFIX) {
            return Uuid::parse_str(token)
                .map(OutfitId::Ephemeral)
                .map_err(|e| EngineError::InvalidInput(format!("Bad ephemeral outfit id: {}", e)));
        }

        Uuid::parse_str(s)
            .map(OutfitId::Saved)
            .map_err(|e| EngineError::InvalidInput(format!("Bad outfit id {}: {}", s, e)))
    }
}

impl Serialize for OutfitId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OutfitId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An unscored combination of wardrobe items
#[derive(Debug, Clone, Serialize)]
pub struct OutfitCandidate {
    pub items: Vec<Arc<WardrobeItem>>,
    pub description: String,
}

impl OutfitCandidate {
    pub fn new(items: Vec<Arc<WardrobeItem>>, description: String) -> Self {
        Self { items, description }
    }

    /// Order-independent signature of the item combination
    ///
    /// Used as the bandit arm for a combination, so the same set of garments
    /// accumulates reward across requests even though every request mints new
    /// outfit ids.
    pub fn combination_key(&self) -> String {
        combination_key(&self.items)
    }
}

pub(crate) fn combination_key(items: &[Arc<WardrobeItem>]) -> String {
    let mut ids: Vec<String> = items.iter().map(|item| item.id.simple().to_string()).collect();
    ids.sort();
    ids.join("+")
}

/// Per-signal breakdown of a candidate's score
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct SignalScores {
    pub occasion: f64,
    pub weather: f64,
    pub color_harmony_pass: bool,
    pub user: f64,
    pub trend: f64,
    pub cf: f64,
}

/// A candidate that survived the hard filters, with its scores
#[derive(Debug, Clone, Serialize)]
pub struct ScoredOutfit {
    pub id: OutfitId,
    pub items: Vec<Arc<WardrobeItem>>,
    pub description: String,
    pub signals: SignalScores,
    pub total_score: f64,
    /// Set when the exploration selector substituted this outfit into the result
    pub explored: bool,
}

impl ScoredOutfit {
    pub fn combination_key(&self) -> String {
        combination_key(&self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ephemeral_id_display_and_parse() {
        let id = OutfitId::ephemeral();
        let rendered = id.to_string();
        assert!(rendered.starts_with("gen_"));
        assert_eq!(rendered.parse::<OutfitId>().unwrap(), id);
        assert_eq!(id.durable(), None);
    }

    #[test]
    fn test_saved_id_display_and_parse() {
        let uuid = Uuid::new_v4();
        let id = OutfitId::Saved(uuid);
        assert_eq!(id.to_string(), uuid.to_string());
        assert_eq!(id.to_string().parse::<OutfitId>().unwrap(), id);
        assert_eq!(id.durable(), Some(uuid));
    }

    #[test]
    fn test_same_uuid_different_kinds_are_distinct() {
        let uuid = Uuid::new_v4();
        assert_ne!(OutfitId::Ephemeral(uuid), OutfitId::Saved(uuid));
        assert_ne!(OutfitId::Ephemeral(uuid).to_string(), OutfitId::Saved(uuid).to_string());
    }

    #[test]
    fn test_id_serializes_as_string() {
        let id = OutfitId::ephemeral();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        assert_eq!(serde_json::from_str::<OutfitId>(&json).unwrap(), id);
    }

    #[test]
    fn test_garbage_id_is_rejected() {
        assert!("outfit-123".parse::<OutfitId>().is_err());
        assert!("gen_not-a-uuid".parse::<OutfitId>().is_err());
    }

    #[test]
    fn test_combination_key_is_order_independent() {
        let user = Uuid::new_v4();
        let a = Arc::new(WardrobeItem::new(user, "top", "white"));
        let b = Arc::new(WardrobeItem::new(user, "bottom", "black"));
        let first = OutfitCandidate::new(vec![a.clone(), b.clone()], String::new());
        let second = OutfitCandidate::new(vec![b, a], String::new());
        assert_eq!(first.combination_key(), second.combination_key());
    }
}
