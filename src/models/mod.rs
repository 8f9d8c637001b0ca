pub mod feedback;
pub mod outfit;
pub mod trend;
pub mod wardrobe;

pub use feedback::{rating_reward, Feedback, InteractionType, RatingAck};
pub use outfit::{OutfitCandidate, OutfitId, ScoredOutfit, SignalScores};
pub use trend::TrendSnapshot;
pub use wardrobe::{ItemAttributes, ItemCategory, Occasion, WardrobeItem, WeatherTag};
