use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc, time::Duration};
use uuid::Uuid;

use crate::models::{Occasion, OutfitId, WardrobeItem, WeatherTag};

/// A generated outfit remembered for later feedback
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub outfit_id: OutfitId,
    /// User the outfit was generated for
    pub user_id: Uuid,
    pub items: Vec<Arc<WardrobeItem>>,
    pub occasion: Occasion,
    pub weather_tags: Vec<WeatherTag>,
    pub inserted_at: DateTime<Utc>,
}

/// Bounded, TTL-based map from ephemeral outfit id to the outfit's items
///
/// Lets a later "rate this outfit" call recover which garments a generated
/// outfit contained without writing every candidate to durable storage.
///
/// Eviction is insertion-order: when full, the entry with the oldest
/// `inserted_at` goes. Reads do not refresh recency. Expired entries are
/// removed lazily on read.
///
/// The whole map sits behind one mutex so the size check, the eviction and the
/// insert happen atomically; a sharded map could race two inserts past the cap.
pub struct OutfitCache {
    entries: Mutex<HashMap<OutfitId, CacheEntry>>,
    capacity: usize,
    ttl: chrono::Duration,
}

impl OutfitCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);

        tracing::debug!(
            capacity,
            ttl_secs = ttl.num_seconds(),
            "Initializing ephemeral outfit cache"
        );

        Self {
            entries: Mutex::new(HashMap::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Stores an entry, stamping it with the current time
    pub fn put(&self, entry: CacheEntry) {
        self.put_at(entry, Utc::now());
    }

    /// Stores an entry with an explicit insertion time
    pub fn put_at(&self, mut entry: CacheEntry, now: DateTime<Utc>) {
        entry.inserted_at = now;
        let mut entries = self.entries.lock();

        if !entries.contains_key(&entry.outfit_id) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(id, _)| id.clone());

            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                tracing::debug!(outfit_id = %oldest, "Evicted oldest cached outfit");
            }
        }

        entries.insert(entry.outfit_id.clone(), entry);
    }

    /// Returns the entry if present and not expired
    pub fn get(&self, outfit_id: &OutfitId) -> Option<CacheEntry> {
        self.get_at(outfit_id, Utc::now())
    }

    /// Reads an entry as of `now`, removing it if its TTL has elapsed
    pub fn get_at(&self, outfit_id: &OutfitId, now: DateTime<Utc>) -> Option<CacheEntry> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(outfit_id) {
            None => return None,
            Some(entry) => now - entry.inserted_at > self.ttl,
        };

        if expired {
            entries.remove(outfit_id);
            tracing::debug!(outfit_id = %outfit_id, "Cached outfit expired");
            return None;
        }

        entries.get(outfit_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(outfit_id: OutfitId) -> CacheEntry {
        let user_id = Uuid::new_v4();
        CacheEntry {
            outfit_id,
            user_id,
            items: vec![Arc::new(WardrobeItem::new(user_id, "top", "white"))],
            occasion: Occasion::Casual,
            weather_tags: vec![WeatherTag::Mild],
            inserted_at: Utc::now(),
        }
    }

    #[test]
    fn test_put_then_get() {
        let cache = OutfitCache::new(10, Duration::from_secs(60));
        let id = OutfitId::ephemeral();
        cache.put(entry(id.clone()));

        let found = cache.get(&id).unwrap();
        assert_eq!(found.outfit_id, id);
        assert_eq!(found.items.len(), 1);
    }

    #[test]
    fn test_missing_entry() {
        let cache = OutfitCache::new(10, Duration::from_secs(60));
        assert!(cache.get(&OutfitId::ephemeral()).is_none());
    }

    #[test]
    fn test_size_never_exceeds_capacity() {
        let cache = OutfitCache::new(3, Duration::from_secs(60));
        for _ in 0..20 {
            cache.put(entry(OutfitId::ephemeral()));
            assert!(cache.len() <= 3);
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_evicts_oldest_insertion() {
        let cache = OutfitCache::new(2, Duration::from_secs(3600));
        let start = Utc::now();
        let first = OutfitId::ephemeral();
        let second = OutfitId::ephemeral();
        let third = OutfitId::ephemeral();

        cache.put_at(entry(first.clone()), start);
        cache.put_at(entry(second.clone()), start + chrono::Duration::seconds(1));
        // reading does not refresh recency
        assert!(cache.get_at(&first, start + chrono::Duration::seconds(2)).is_some());
        cache.put_at(entry(third.clone()), start + chrono::Duration::seconds(3));

        let later = start + chrono::Duration::seconds(4);
        assert!(cache.get_at(&first, later).is_none());
        assert!(cache.get_at(&second, later).is_some());
        assert!(cache.get_at(&third, later).is_some());
    }

    #[test]
    fn test_reinserting_existing_key_does_not_evict() {
        let cache = OutfitCache::new(2, Duration::from_secs(60));
        let a = OutfitId::ephemeral();
        let b = OutfitId::ephemeral();
        cache.put(entry(a.clone()));
        cache.put(entry(b.clone()));
        cache.put(entry(a.clone()));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&b).is_some());
    }

    #[test]
    fn test_expired_entry_is_removed_on_read() {
        let cache = OutfitCache::new(10, Duration::from_secs(1800));
        let id = OutfitId::ephemeral();
        let start = Utc::now();
        cache.put_at(entry(id.clone()), start);

        assert!(cache
            .get_at(&id, start + chrono::Duration::minutes(30))
            .is_some());
        assert!(cache
            .get_at(&id, start + chrono::Duration::minutes(31))
            .is_none());
        assert!(cache.is_empty());
        // stays gone even if the clock were read earlier again
        assert!(cache.get_at(&id, start).is_none());
    }

    #[test]
    fn test_concurrent_puts_respect_capacity() {
        let cache = Arc::new(OutfitCache::new(50, Duration::from_secs(60)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let id = OutfitId::ephemeral();
                        cache.put(entry(id.clone()));
                        let _ = cache.get(&id);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 50);
    }

    #[test]
    fn test_clear() {
        let cache = OutfitCache::new(10, Duration::from_secs(60));
        cache.put(entry(OutfitId::ephemeral()));
        cache.clear();
        assert!(cache.is_empty());
    }
}
