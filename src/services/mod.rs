pub mod candidates;
pub mod circuit_breaker;
pub mod engine;
pub mod exploration;
pub mod feedback;
pub mod outfit_cache;
pub mod preferences;
pub mod providers;
pub mod rules;
pub mod scoring;
pub mod state;

pub use engine::{EngineBuilder, OutfitRequest, RecommendationEngine};
pub use exploration::{ArmKey, BanditArm, BanditTable};
pub use outfit_cache::{CacheEntry, OutfitCache};
pub use preferences::{ProfileStore, UserPreferenceProfile};
pub use rules::{DefaultRules, RuleOracles};
pub use state::EngineState;
