/// Read-through caching against the Redis [`Cache`](crate::db::Cache).
///
/// Returns the cached value for `$key` when present. Otherwise awaits `$block`,
/// queues the result for a background write with a TTL of `$ttl` seconds and
/// returns it. Errors from the cache read or the block propagate with `?`, so
/// the enclosing function must return `EngineResult`.
///
/// ```rust,ignore
/// cached!(self.cache, CacheKey::TrendSnapshot { user_id, occasion }, 900, async move {
///     fetch_snapshot().await
/// })
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        match $cache.get_from_cache(&key).await? {
            Some(hit) => Ok(hit),
            None => {
                let value = $block.await?;
                $cache.set_in_background(&key, &value, $ttl);
                Ok(value)
            }
        }
    }};
}
