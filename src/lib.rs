//! Daily outfit recommendations built from a user's own wardrobe.
//!
//! [`RecommendationEngine`] generates candidate outfits, scores them against
//! rules, trends, learned preferences and collaborative filtering, and learns
//! from ratings of what it returned.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use config::{Config, EngineSettings};
pub use error::{EngineError, EngineResult};
pub use services::{EngineBuilder, EngineState, OutfitRequest, RecommendationEngine};
