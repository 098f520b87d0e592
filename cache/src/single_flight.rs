use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-key async locks used to let only one task populate a cold key at a time.
///
/// Only tasks in the same process are coordinated. Other processes sharing the
/// store may still populate the same key concurrently.
#[derive(Default)]
pub struct SingleFlight {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Held while a key is being populated. Dropping it lets the next waiter in.
pub struct Flight<'a> {
    flights: &'a SingleFlight,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other task holds `key`, then holds it.
    pub async fn lock(&self, key: &str) -> Flight<'_> {
        // built before waiting so a waiter cancelled midway still cleans up
        let mut flight = Flight {
            flights: self,
            key: key.to_string(),
            guard: None,
        };

        let lock = {
            let entry = self
                .locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())));
            Arc::clone(&entry)
        };

        flight.guard = Some(lock.lock_owned().await);
        flight
    }

    /// Number of keys that currently have a holder or waiters.
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        // the map's own reference is the last one once nobody holds or waits
        self.flights
            .locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
