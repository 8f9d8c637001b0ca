use crate::config::EngineSettings;

use super::{exploration::BanditTable, outfit_cache::OutfitCache, preferences::ProfileStore};

/// Process-wide mutable state shared by recommendation and feedback calls
///
/// Injected into the engine at construction. Horizontal scaling would need
/// these three stores externalized; a single process owns them here.
pub struct EngineState {
    pub cache: OutfitCache,
    pub bandit: BanditTable,
    pub profiles: ProfileStore,
}

impl EngineState {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            cache: OutfitCache::new(settings.cache_capacity, settings.cache_ttl),
            bandit: BanditTable::with_ephemeral_ttl(settings.cache_ttl),
            profiles: ProfileStore::new(),
        }
    }

    /// Drops every cached outfit, bandit arm and preference profile
    pub fn clear(&self) {
        self.cache.clear();
        self.bandit.clear();
        self.profiles.clear();
        tracing::info!("Engine state cleared");
    }
}
