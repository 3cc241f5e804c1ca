/// Read-through caching over [`Cache`](crate::db::Cache).
///
/// Checks the cache for `$key`; on a miss, awaits `$block` to compute the
/// value, stores it under `$key` with the given TTL via the background
/// writer, and returns it. `$block` must evaluate to an `AppResult`.
///
/// # Example
/// ```rust,ignore
/// let items = cached!(cache, key, 3600, async move {
///     fetch_trending(&client).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        if let Some(cached) = $cache.get_from_cache(&$key).await? {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&$key, &value, $ttl);
            Ok(value)
        }
    }};
}
