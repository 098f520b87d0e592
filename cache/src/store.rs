use std::{future::Future, sync::Arc};

/// Raised by a [`CacheStore`] when a round trip cannot be completed.
#[derive(thiserror::Error, Debug)]
pub enum CacheUnavailable {
    #[error("cache store is not configured")]
    NotConfigured,

    #[error("cache store round trip failed :: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("cache store rejected the command :: {0}")]
    Rejected(String),
}

impl CacheUnavailable {
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        CacheUnavailable::Transport(Box::new(err))
    }
}

/// The primitives the cache needs from a remote key-value store.
///
/// Implementations pass every call straight through to the store and do not
/// retry. Any failure to reach the store is reported as [`CacheUnavailable`].
pub trait CacheStore: Send + Sync {
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, CacheUnavailable>> + Send;

    fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> impl Future<Output = Result<(), CacheUnavailable>> + Send;

    fn set_add(
        &self,
        set_key: &str,
        member: &str,
    ) -> impl Future<Output = Result<(), CacheUnavailable>> + Send;

    fn set_members(
        &self,
        set_key: &str,
    ) -> impl Future<Output = Result<Vec<String>, CacheUnavailable>> + Send;

    /// Deletes every given key and returns how many existed.
    fn delete_many(
        &self,
        keys: &[String],
    ) -> impl Future<Output = Result<usize, CacheUnavailable>> + Send;

    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, CacheUnavailable>> + Send;
}

impl<S: CacheStore> CacheStore for Arc<S> {
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, CacheUnavailable>> + Send {
        S::get(self, key)
    }

    fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> impl Future<Output = Result<(), CacheUnavailable>> + Send {
        S::set_with_expiry(self, key, value, ttl_seconds)
    }

    fn set_add(
        &self,
        set_key: &str,
        member: &str,
    ) -> impl Future<Output = Result<(), CacheUnavailable>> + Send {
        S::set_add(self, set_key, member)
    }

    fn set_members(
        &self,
        set_key: &str,
    ) -> impl Future<Output = Result<Vec<String>, CacheUnavailable>> + Send {
        S::set_members(self, set_key)
    }

    fn delete_many(
        &self,
        keys: &[String],
    ) -> impl Future<Output = Result<usize, CacheUnavailable>> + Send {
        S::delete_many(self, keys)
    }

    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, CacheUnavailable>> + Send {
        S::exists(self, key)
    }
}
