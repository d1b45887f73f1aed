//! Pool of trust clients keyed by client configuration.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use fed_core::{Event, EventType, StsPoolConfig};
use fed_registry::Registries;
use parking_lot::Mutex;
use tokio::sync::{OnceCell, OwnedSemaphorePermit, Semaphore};

use crate::authority::TrustAuthorityConnector;
use crate::client::StsClient;
use crate::config::StsClientConfig;
use crate::error::{StsError, StsResult};

/// Clients for one configuration key.
///
/// A permit is held for every checked-out client, so at most `max`
/// clients are in use. New clients are only connected while holding a
/// permit with the free list empty, which keeps live clients at or below
/// `max` as well.
struct SubPool {
    key: String,
    client_config: StsClientConfig,
    permits: Arc<Semaphore>,
    free: Mutex<Vec<StsClient>>,
    live: AtomicUsize,
    prewarmed: OnceCell<()>,
    closed: AtomicBool,
}

impl SubPool {
    fn new(key: String, client_config: StsClientConfig, max: usize) -> Self {
        Self {
            key,
            client_config,
            permits: Arc::new(Semaphore::new(max)),
            free: Mutex::new(Vec::new()),
            live: AtomicUsize::new(0),
            prewarmed: OnceCell::new(),
            closed: AtomicBool::new(false),
        }
    }

    fn check_in(&self, client: StsClient) {
        if client.is_poisoned() || self.closed.load(Ordering::SeqCst) {
            self.live.fetch_sub(1, Ordering::SeqCst);
            tracing::debug!(
                key = %self.key,
                client_id = %client.id(),
                poisoned = client.is_poisoned(),
                "trust client discarded"
            );
            return;
        }
        self.free.lock().push(client);
    }
}

struct Lease {
    pool: Arc<SubPool>,
    _permit: OwnedSemaphorePermit,
}

/// A trust client checked out of a [`StsClientPool`].
///
/// Dereferences to [`StsClient`]. Dropping it returns the client to its
/// sub-pool, or discards it if a call timed out.
pub struct PooledClient {
    client: StsClient,
    default_timeout: Option<Duration>,
    lease: Option<Lease>,
}

impl PooledClient {
    /// Returns whether the client belongs to a sub-pool.
    #[must_use]
    pub const fn is_pooled(&self) -> bool {
        self.lease.is_some()
    }

    /// Returns the pool key of the client's configuration.
    #[must_use]
    pub fn key(&self) -> String {
        self.client.config().key()
    }
}

impl Deref for PooledClient {
    type Target = StsClient;

    fn deref(&self) -> &StsClient {
        &self.client
    }
}

impl DerefMut for PooledClient {
    fn deref_mut(&mut self) -> &mut StsClient {
        &mut self.client
    }
}

impl Drop for PooledClient {
    fn drop(&mut self) {
        // The client is back on the free list before the permit is released.
        if let Some(lease) = self.lease.take() {
            lease.pool.check_in(self.client.reclaim(self.default_timeout));
        }
    }
}

impl std::fmt::Debug for PooledClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledClient")
            .field("client", &self.client)
            .field("pooled", &self.is_pooled())
            .finish()
    }
}

/// Reuses trust clients per [`StsClientConfig::key`].
pub struct StsClientPool {
    config: StsPoolConfig,
    connector: Arc<dyn TrustAuthorityConnector>,
    registries: Registries,
    pools: DashMap<String, Arc<SubPool>>,
}

impl StsClientPool {
    /// Creates a pool.
    #[must_use]
    pub fn new(
        config: StsPoolConfig,
        connector: Arc<dyn TrustAuthorityConnector>,
        registries: Registries,
    ) -> Self {
        Self {
            config,
            connector,
            registries,
            pools: DashMap::new(),
        }
    }

    /// Returns the pool configuration.
    #[must_use]
    pub const fn config(&self) -> &StsPoolConfig {
        &self.config
    }

    fn default_timeout(&self) -> Option<Duration> {
        (self.config.call_timeout_ms > 0).then(|| self.config.call_timeout())
    }

    async fn connect(&self, config: &StsClientConfig) -> StsResult<StsClient> {
        let mut client =
            StsClient::connect(config.clone(), self.connector.as_ref(), self.registries.clone())
                .await?;
        client.set_call_timeout(self.default_timeout());
        Ok(client)
    }

    /// Returns a client for `config`.
    ///
    /// With pooling disabled a fresh client is connected on every call.
    /// Otherwise the sub-pool for the key is created and pre-warmed on
    /// first use, then a client is checked out of it.
    ///
    /// # Errors
    ///
    /// Returns connection errors, or [`StsError::PoolExhausted`].
    pub async fn create(&self, config: &StsClientConfig) -> StsResult<PooledClient> {
        if !self.config.pooling_enabled() {
            let client = self.connect(config).await?;
            tracing::debug!(endpoint = config.endpoint_address(), "unpooled trust client created");
            return Ok(PooledClient {
                client,
                default_timeout: self.default_timeout(),
                lease: None,
            });
        }

        let key = config.key();
        let pool = self
            .pools
            .entry(key.clone())
            .or_insert_with(|| {
                tracing::info!(key = %key, max = self.config.max_clients_per_key, "trust client sub-pool created");
                Arc::new(SubPool::new(
                    key.clone(),
                    config.clone(),
                    self.config.max_clients_per_key,
                ))
            })
            .clone();

        pool.prewarmed
            .get_or_try_init(|| self.prewarm(&pool))
            .await?;

        self.check_out(&key).await
    }

    async fn prewarm(&self, pool: &SubPool) -> StsResult<()> {
        let count = self.config.initial_clients.min(self.config.max_clients_per_key);
        if count == 0 {
            return Ok(());
        }
        // Hold the permits so concurrent check-outs cannot overshoot `max`.
        let permits = u32::try_from(count).unwrap_or(u32::MAX);
        let _permits = Arc::clone(&pool.permits)
            .acquire_many_owned(permits)
            .await
            .map_err(|_| StsError::UnknownPool(pool.key.clone()))?;

        // Nothing is published until every connect succeeds; a failed
        // attempt drops its clients and the next `create` starts over.
        let mut warmed = Vec::with_capacity(count);
        for _ in 0..count {
            warmed.push(self.connect(&pool.client_config).await?);
        }
        pool.live.fetch_add(warmed.len(), Ordering::SeqCst);
        pool.free.lock().extend(warmed);
        tracing::debug!(key = %pool.key, count, "trust client sub-pool pre-warmed");
        Ok(())
    }

    /// Checks out a client from the sub-pool for `key`.
    ///
    /// Reuses a free client, connects a new one while fewer than
    /// `max_clients_per_key` are live, and otherwise waits up to
    /// `checkout_timeout` for a client to be returned.
    ///
    /// # Errors
    ///
    /// - [`StsError::UnknownPool`] if no sub-pool exists for `key`.
    /// - [`StsError::PoolExhausted`] if the wait bound elapses.
    pub async fn check_out(&self, key: &str) -> StsResult<PooledClient> {
        let pool = self
            .pools
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| StsError::UnknownPool(key.to_string()))?;

        let started = Instant::now();
        let bound = self.config.checkout_timeout();
        let permit = match tokio::time::timeout(bound, Arc::clone(&pool.permits).acquire_owned())
            .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(StsError::UnknownPool(key.to_string())),
            Err(_) => {
                let waited = started.elapsed();
                Event::builder(EventType::PoolExhausted)
                    .failure("no free trust client")
                    .subject(key)
                    .detail("waited_ms", waited.as_millis().to_string())
                    .emit();
                return Err(StsError::PoolExhausted {
                    key: key.to_string(),
                    waited,
                });
            }
        };

        let reused = pool.free.lock().pop();
        let client = match reused {
            Some(client) => client,
            None => {
                let client = self.connect(&pool.client_config).await?;
                let live = pool.live.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::debug!(key = %key, live, "trust client connected");
                client
            }
        };

        Ok(PooledClient {
            client,
            default_timeout: self.default_timeout(),
            lease: Some(Lease {
                pool,
                _permit: permit,
            }),
        })
    }

    /// Returns a client to its sub-pool. Same as dropping it.
    pub fn check_in(&self, client: PooledClient) {
        drop(client);
    }

    /// Removes the sub-pool for `config`.
    ///
    /// Free clients are dropped, waiters fail with
    /// [`StsError::UnknownPool`] and checked-out clients are discarded on
    /// return. Returns `false` if no sub-pool existed.
    pub fn destroy(&self, config: &StsClientConfig) -> bool {
        let key = config.key();
        let Some((_, pool)) = self.pools.remove(&key) else {
            return false;
        };
        pool.closed.store(true, Ordering::SeqCst);
        pool.permits.close();
        let dropped = std::mem::take(&mut *pool.free.lock()).len();
        pool.live.fetch_sub(dropped, Ordering::SeqCst);
        tracing::info!(key = %key, dropped, "trust client sub-pool destroyed");
        true
    }

    /// Returns the number of live clients (free and checked out) for `key`.
    #[must_use]
    pub fn live_clients(&self, key: &str) -> usize {
        self.pools
            .get(key)
            .map_or(0, |pool| pool.live.load(Ordering::SeqCst))
    }

    /// Returns the number of free clients for `key`.
    #[must_use]
    pub fn free_clients(&self, key: &str) -> usize {
        self.pools.get(key).map_or(0, |pool| pool.free.lock().len())
    }
}

impl std::fmt::Debug for StsClientPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StsClientPool")
            .field("config", &self.config)
            .field("sub_pools", &self.pools.len())
            .finish_non_exhaustive()
    }
}
