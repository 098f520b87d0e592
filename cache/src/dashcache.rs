use std::{
    collections::HashSet,
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use dashmap::DashMap;

use crate::store::{CacheStore, CacheUnavailable};

/// An in-process [`CacheStore`] backed by `DashMap`s.
///
/// An expired entry is dropped the next time it is looked up, or on the next
/// write of any key, whichever comes first. The store can be switched off with [`DashStore::set_available`],
/// after which every operation fails the way an unreachable remote store would.
pub struct DashStore {
    values: DashMap<String, (String, Instant)>,
    sets: DashMap<String, HashSet<String>>,
    available: AtomicBool,
}

#[derive(thiserror::Error, Debug)]
#[error("store switched off")]
struct Offline;

impl DashStore {
    pub fn new() -> Self {
        Self {
            values: DashMap::new(),
            sets: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of live (unexpired) values.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.values
            .iter()
            .filter(|entry| entry.value().1 > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every expired value and returns how many there were.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.values.len();
        self.values.retain(|_, (_, expires_at)| *expires_at > now);
        before.saturating_sub(self.values.len())
    }

    fn ensure_available(&self) -> Result<(), CacheUnavailable> {
        match self.available.load(Ordering::SeqCst) {
            true => Ok(()),
            false => Err(CacheUnavailable::transport(Offline)),
        }
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.values
            .remove_if(key, |_, (_, expires_at)| *expires_at <= now);
        self.values.get(key).map(|entry| entry.value().0.clone())
    }
}

impl Default for DashStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for DashStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheUnavailable> {
        self.ensure_available()?;
        Ok(self.live_value(key))
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<(), CacheUnavailable> {
        self.ensure_available()?;
        if ttl_seconds == 0 {
            return Err(CacheUnavailable::Rejected(format!(
                "invalid expire time for `{}`",
                key
            )));
        }

        self.purge_expired();

        let expires_at = Instant::now() + Duration::from_secs(ttl_seconds);
        self.values
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn set_add(&self, set_key: &str, member: &str) -> Result<(), CacheUnavailable> {
        self.ensure_available()?;
        self.sets
            .entry(set_key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn set_members(&self, set_key: &str) -> Result<Vec<String>, CacheUnavailable> {
        self.ensure_available()?;
        Ok(self
            .sets
            .get(set_key)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<usize, CacheUnavailable> {
        self.ensure_available()?;
        let mut deleted = 0;
        for key in keys {
            let value = self.live_value(key).is_some() && self.values.remove(key).is_some();
            let set = self.sets.remove(key).is_some();
            if value || set {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheUnavailable> {
        self.ensure_available()?;
        Ok(self.live_value(key).is_some() || self.sets.contains_key(key))
    }
}
