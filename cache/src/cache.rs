use std::future::Future;

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    single_flight::SingleFlight,
    store::{CacheStore, CacheUnavailable},
    tag::{Tag, TagIndex, TagInvalidationError},
};

/// Convenience for writes that carry no tags.
pub const NO_TAGS: &[&str] = &[];

/// Cache-aside access to a [`CacheStore`] with tag based invalidation.
///
/// Every operation comes in two flavours. The plain ones fail open: a store
/// that cannot be reached reads as a miss and swallows writes, so callers fall
/// through to the authoritative source. The `try_*` ones report
/// [`CacheUnavailable`] for callers that need to tell a miss from an outage.
pub struct TaggedCache<S> {
    tags: TagIndex<S>,
    flights: SingleFlight,
}

impl<S: CacheStore> TaggedCache<S> {
    pub fn new(store: S) -> Self {
        Self {
            tags: TagIndex::new(store),
            flights: SingleFlight::new(),
        }
    }

    pub fn store(&self) -> &S {
        self.tags.store()
    }

    pub fn tag_index(&self) -> &TagIndex<S> {
        &self.tags
    }

    pub async fn try_read(&self, key: &str) -> Result<Option<String>, CacheUnavailable> {
        let value = self.store().get(key).await?;

        #[cfg(feature = "tracing")]
        tracing::debug!("GET :: {} hit:{}", key, value.is_some());

        Ok(value)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(key = %key), skip_all)
    )]
    pub async fn read(&self, key: &str) -> Option<String> {
        self.try_read(key)
            .await
            .inspect_err(|_e| {
                #[cfg(feature = "tracing")]
                tracing::error!("GET :: {} :: {:?}", key, _e);
            })
            .ok()
            .flatten()
    }

    /// Writes `value` with a TTL, then records `key` under every tag.
    ///
    /// Tags are only recorded once the value write succeeded. A zero TTL is
    /// raised to one second.
    pub async fn try_write<T: Tag>(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
        tags: &[T],
    ) -> Result<(), CacheUnavailable> {
        let ttl_seconds = ttl_seconds.max(1);
        self.store().set_with_expiry(key, value, ttl_seconds).await?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "SET :: {} ttl:{}s tags:{:?}",
            key,
            ttl_seconds,
            tags.iter().map(|tag| tag.id()).collect::<Vec<_>>()
        );

        for tag in tags {
            self.tags.tag(tag, key).await?;
        }

        Ok(())
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(key = %key, ttl = ttl_seconds), skip_all)
    )]
    pub async fn write<T: Tag>(&self, key: &str, value: &str, ttl_seconds: u64, tags: &[T]) {
        let _ = self
            .try_write(key, value, ttl_seconds, tags)
            .await
            .inspect_err(|_e| {
                #[cfg(feature = "tracing")]
                tracing::error!("SET :: {} :: {:?}", key, _e);
            });
    }

    /// Removes a single key. Tag sets that reference it are left alone.
    pub async fn try_delete(&self, key: &str) -> Result<bool, CacheUnavailable> {
        let deleted = self.store().delete_many(&[key.to_string()]).await? > 0;

        #[cfg(feature = "tracing")]
        tracing::debug!("DEL{} :: {}", if deleted { "" } else { " skipped" }, key);

        Ok(deleted)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(key = %key), skip_all)
    )]
    pub async fn delete(&self, key: &str) {
        let _ = self.try_delete(key).await.inspect_err(|_e| {
            #[cfg(feature = "tracing")]
            tracing::error!("DEL :: {} :: {:?}", key, _e);
        });
    }

    pub async fn try_exists(&self, key: &str) -> Result<bool, CacheUnavailable> {
        let exists = self.store().exists(key).await?;

        #[cfg(feature = "tracing")]
        tracing::debug!("EXISTS :: {} = {}", key, exists);

        Ok(exists)
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.try_exists(key)
            .await
            .inspect_err(|_e| {
                #[cfg(feature = "tracing")]
                tracing::error!("EXISTS :: {} :: {:?}", key, _e);
            })
            .unwrap_or(false)
    }

    pub async fn try_members<T: Tag + ?Sized>(
        &self,
        tag: &T,
    ) -> Result<Vec<String>, CacheUnavailable> {
        self.tags.members(tag).await
    }

    pub async fn try_invalidate_tag<T: Tag + ?Sized>(
        &self,
        tag: &T,
    ) -> Result<(), CacheUnavailable> {
        self.tags.invalidate_tag(tag).await
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(tag = tag.id()), skip_all)
    )]
    pub async fn invalidate_tag<T: Tag + ?Sized>(&self, tag: &T) {
        let _ = self.tags.invalidate_tag(tag).await.inspect_err(|_e| {
            #[cfg(feature = "tracing")]
            tracing::error!("invalidate tag :: {} :: {:?}", tag.id(), _e);
        });
    }

    pub async fn try_invalidate_tags<T: Tag>(
        &self,
        tags: &[T],
    ) -> Result<(), TagInvalidationError> {
        self.tags.invalidate_tags(tags).await
    }

    pub async fn invalidate_tags<T: Tag>(&self, tags: &[T]) {
        let _ = self.tags.invalidate_tags(tags).await.inspect_err(|_e| {
            #[cfg(feature = "tracing")]
            tracing::error!("{} :: {:?}", _e, _e.0);
        });
    }

    /// Returns the cached value for `key`, or runs `producer`, caches what it
    /// returns and hands it back.
    ///
    /// The producer is never run on a hit. A stored value that no longer
    /// deserializes as `V` counts as a miss and gets overwritten. Only producer
    /// errors reach the caller; cache failures are logged and ignored.
    ///
    /// Concurrent calls on the same cold key all run their producer and the
    /// last write wins. See [`TaggedCache::get_or_populate_exclusive`].
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(key = %key, ttl = ttl_seconds), skip_all)
    )]
    pub async fn get_or_populate<V, E, T, F, Fut>(
        &self,
        key: &str,
        ttl_seconds: u64,
        tags: &[T],
        producer: F,
    ) -> Result<V, E>
    where
        V: Serialize + DeserializeOwned,
        T: Tag,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.cached(key).await {
            return Ok(value);
        }

        let value = producer().await?;
        self.populate(key, ttl_seconds, tags, &value).await;
        Ok(value)
    }

    /// Like [`TaggedCache::get_or_populate`], but tasks of this process that
    /// miss on the same key wait for each other, so only the first one runs its
    /// producer and the others read what it cached.
    ///
    /// If the store is unreachable every waiter still ends up running its own
    /// producer, one at a time.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(key = %key, ttl = ttl_seconds), skip_all)
    )]
    pub async fn get_or_populate_exclusive<V, E, T, F, Fut>(
        &self,
        key: &str,
        ttl_seconds: u64,
        tags: &[T],
        producer: F,
    ) -> Result<V, E>
    where
        V: Serialize + DeserializeOwned,
        T: Tag,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.cached(key).await {
            return Ok(value);
        }

        let _flight = self.flights.lock(key).await;

        // populated by whoever held the key before us
        if let Some(value) = self.cached(key).await {
            return Ok(value);
        }

        let value = producer().await?;
        self.populate(key, ttl_seconds, tags, &value).await;
        Ok(value)
    }

    async fn cached<V: DeserializeOwned>(&self, key: &str) -> Option<V> {
        let raw = self.read(key).await?;

        serde_json::from_str::<V>(&raw)
            .inspect_err(|_e| {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "cached value is not a valid {} :: {} :: {:?}",
                    std::any::type_name::<V>(),
                    key,
                    _e
                );
            })
            .ok()
    }

    async fn populate<V: Serialize, T: Tag>(
        &self,
        key: &str,
        ttl_seconds: u64,
        tags: &[T],
        value: &V,
    ) {
        match serde_json::to_string(value) {
            Ok(raw) => self.write(key, &raw, ttl_seconds, tags).await,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "unable to serialize {} for caching :: {} :: {:?}",
                    std::any::type_name::<V>(),
                    key,
                    _e
                );
            }
        }
    }
}
