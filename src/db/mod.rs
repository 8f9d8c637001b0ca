pub mod postgres;
pub mod ratings;
pub mod redis;
pub mod wardrobe;

pub use postgres::create_pool;
pub use ratings::{InMemoryRatingStore, PgRatingStore, RatingRecord, RatingStore};
pub use redis::{create_redis_client, Cache, CacheKey, CacheWriterHandle};
pub use wardrobe::{InMemoryWardrobe, PgWardrobeRepository, WardrobeRepository};
