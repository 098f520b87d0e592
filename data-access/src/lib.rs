use std::sync::Arc;

use cache::{CacheStore, Tag, TaggedCache};
use serde::{Serialize, de::DeserializeOwned};
use sqlx::SqlitePool;

/// The authoritative database paired with the cache in front of it.
pub struct DataAccess<S> {
    pool: SqlitePool,
    cache: Arc<TaggedCache<S>>,
}

impl<S: CacheStore> DataAccess<S> {
    pub fn new(pool: SqlitePool, cache: TaggedCache<S>) -> Self {
        Self {
            pool,
            cache: Arc::new(cache),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn cache(&self) -> &TaggedCache<S> {
        &self.cache
    }

    /// Answers from the cache, running `query` only on a miss.
    pub async fn read<'conn, V, T, Fut>(
        &'conn self,
        query: impl FnOnce(&'conn SqlitePool) -> Fut,
        key: &str,
        ttl_seconds: u64,
        tags: &[T],
    ) -> Fut::Output
    where
        Fut: Future<Output = Result<V, sqlx::Error>>,
        V: Serialize + DeserializeOwned,
        T: Tag,
    {
        self.cache
            .get_or_populate(key, ttl_seconds, tags, || query(&self.pool))
            .await
    }

    /// Runs `query`, then invalidates every tag the `tagger` derives from its result.
    pub async fn write<'conn, V, T, Fut>(
        &'conn self,
        query: impl FnOnce(&'conn SqlitePool) -> Fut,
        tagger: impl FnOnce(&V) -> Vec<T>,
    ) -> Fut::Output
    where
        Fut: Future<Output = Result<V, sqlx::Error>>,
        T: Tag,
    {
        let value = query(&self.pool).await?;
        self.cache.invalidate_tags(&tagger(&value)).await;
        Ok(value)
    }

    /// Runs `query` and caches its result under `key`, so the next read of
    /// that key does not go back to the database.
    pub async fn store<'conn, V, T, Fut>(
        &'conn self,
        query: impl FnOnce(&'conn SqlitePool) -> Fut,
        key: &str,
        ttl_seconds: u64,
        tags: &[T],
    ) -> Fut::Output
    where
        Fut: Future<Output = Result<V, sqlx::Error>>,
        V: Serialize,
        T: Tag,
    {
        let value = query(&self.pool).await?;

        match serde_json::to_string(&value) {
            Ok(raw) => self.cache.write(key, &raw, ttl_seconds, tags).await,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("unable to serialize result for `{}` :: {:?}", key, _e);
            }
        }

        Ok(value)
    }
}

impl<S> Clone for DataAccess<S> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            cache: Arc::clone(&self.cache),
        }
    }
}
