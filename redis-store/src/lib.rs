use std::{
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use cache::{CacheStore, CacheUnavailable};
use redis::{
    AsyncCommands, Client, RedisError,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tokio::sync::OnceCell;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);
const RECONNECT_COOLDOWN: Duration = Duration::from_secs(5);

#[derive(thiserror::Error, Debug)]
#[error("redis unreachable, next connection attempt in {0:?}")]
struct CoolingDown(Duration);

/// [`CacheStore`] over a Redis server.
///
/// The connection is opened on first use and then shared by every clone of the
/// underlying `ConnectionManager`, which reconnects on its own after a drop.
/// Opening is attempted once, without retries, and bounded by a connect
/// timeout. After a failed attempt every call fails with
/// [`CacheUnavailable::Transport`] right away until the cooldown has passed.
pub struct RedisStore {
    client: Option<Client>,
    connection: OnceCell<ConnectionManager>,
    last_failure: Mutex<Option<Instant>>,
    connect_timeout: Duration,
    response_timeout: Duration,
    cooldown: Duration,
}

impl RedisStore {
    /// Validates `url` without connecting.
    pub fn open(url: &str) -> Result<Self, RedisError> {
        Ok(Self::with_client(Some(Client::open(url)?)))
    }

    /// A store that answers every call with [`CacheUnavailable::NotConfigured`].
    pub fn disabled() -> Self {
        Self::with_client(None)
    }

    /// Opens `url` when given, falling back to a disabled store when it is
    /// missing or malformed.
    pub fn from_url(url: Option<&str>) -> Self {
        match url {
            Some(url) => Self::open(url)
                .inspect_err(|e| tracing::error!("invalid redis url :: {:?}", e))
                .unwrap_or_else(|_| Self::disabled()),
            None => {
                tracing::warn!("no redis url configured, caching is disabled");
                Self::disabled()
            }
        }
    }

    fn with_client(client: Option<Client>) -> Self {
        Self {
            client,
            connection: OnceCell::new(),
            last_failure: Mutex::new(None),
            connect_timeout: CONNECT_TIMEOUT,
            response_timeout: RESPONSE_TIMEOUT,
            cooldown: RECONNECT_COOLDOWN,
        }
    }

    /// Bounds how long opening the connection and each command may take.
    pub fn with_timeouts(mut self, connect: Duration, response: Duration) -> Self {
        self.connect_timeout = connect;
        self.response_timeout = response;
        self
    }

    /// How long to fail fast after a connection attempt failed.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    fn cooling_down(&self) -> Option<Duration> {
        let last_failure = *self
            .last_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        last_failure
            .map(|at| self.cooldown.saturating_sub(at.elapsed()))
            .filter(|remaining| !remaining.is_zero())
    }

    fn mark_failed(&self) {
        *self
            .last_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheUnavailable> {
        let client = self
            .client
            .as_ref()
            .ok_or(CacheUnavailable::NotConfigured)?;

        self.connection
            .get_or_try_init(|| async {
                // callers queued behind a failed attempt land here too
                if let Some(remaining) = self.cooling_down() {
                    return Err(CacheUnavailable::transport(CoolingDown(remaining)));
                }

                let config = ConnectionManagerConfig::new()
                    .set_number_of_retries(0)
                    .set_connection_timeout(self.connect_timeout)
                    .set_response_timeout(self.response_timeout);

                match ConnectionManager::new_with_config(client.clone(), config).await {
                    Ok(manager) => {
                        tracing::info!(
                            "connected to redis :: {}",
                            client.get_connection_info().addr
                        );
                        Ok(manager)
                    }
                    Err(e) => {
                        tracing::error!("redis connection error :: {:?}", e);
                        self.mark_failed();
                        Err(CacheUnavailable::transport(e))
                    }
                }
            })
            .await
            .cloned()
    }
}

impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheUnavailable> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(CacheUnavailable::transport)
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<(), CacheUnavailable> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds)
            .await
            .map_err(CacheUnavailable::transport)
    }

    async fn set_add(&self, set_key: &str, member: &str) -> Result<(), CacheUnavailable> {
        let mut conn = self.connection().await?;
        conn.sadd::<_, _, ()>(set_key, member)
            .await
            .map_err(CacheUnavailable::transport)
    }

    async fn set_members(&self, set_key: &str) -> Result<Vec<String>, CacheUnavailable> {
        let mut conn = self.connection().await?;
        conn.smembers::<_, Vec<String>>(set_key)
            .await
            .map_err(CacheUnavailable::transport)
    }

    async fn delete_many(&self, keys: &[String]) -> Result<usize, CacheUnavailable> {
        // DEL without arguments is a syntax error
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection().await?;
        conn.del::<_, usize>(keys)
            .await
            .map_err(CacheUnavailable::transport)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheUnavailable> {
        let mut conn = self.connection().await?;
        conn.exists::<_, bool>(key)
            .await
            .map_err(CacheUnavailable::transport)
    }
}
