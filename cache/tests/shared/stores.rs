use cache::{CacheStore, CacheUnavailable, DashStore};

/// Accepts everything except value writes, which it rejects.
#[derive(Default)]
pub struct ValueWritesRejected {
    pub inner: DashStore,
}

impl CacheStore for ValueWritesRejected {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheUnavailable> {
        self.inner.get(key).await
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        _value: &str,
        _ttl_seconds: u64,
    ) -> Result<(), CacheUnavailable> {
        Err(CacheUnavailable::Rejected(format!("OOM writing `{}`", key)))
    }

    async fn set_add(&self, set_key: &str, member: &str) -> Result<(), CacheUnavailable> {
        self.inner.set_add(set_key, member).await
    }

    async fn set_members(&self, set_key: &str) -> Result<Vec<String>, CacheUnavailable> {
        self.inner.set_members(set_key).await
    }

    async fn delete_many(&self, keys: &[String]) -> Result<usize, CacheUnavailable> {
        self.inner.delete_many(keys).await
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheUnavailable> {
        self.inner.exists(key).await
    }
}
