//! Typed key-value cache with per-key TTL.
//!
//! Reads never fail: an unreachable cache, a timed out call or a value of
//! an unexpected shape are all treated as a miss.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use ::redis::RedisError;
use serde::{de::DeserializeOwned, Serialize};
use slog::{debug, error, warn, Logger};
use thiserror::Error;
use tokio_util::task::TaskTracker;

use crate::context::{Interrupted, RequestContext};

pub use self::redis::RedisCache;

#[cfg(any(test, feature = "test-util"))]
pub use self::memory::MemoryCache;

pub mod redis;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),
    #[error("Cache call was cancelled")]
    Cancelled,
    #[error("Cache call timed out")]
    TimedOut,
    #[error("Cache is unavailable: {0}")]
    Unavailable(String),
}

impl From<Interrupted> for Error {
    fn from(interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::Cancelled => Self::Cancelled,
            Interrupted::TimedOut => Self::TimedOut,
        }
    }
}

/// Raw access to the cache storage.
#[async_trait]
pub trait CacheClient: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;

    /// Overwrites any previous value of the `key`, which expires after the `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), Error>;

    async fn delete(&self, key: &str) -> Result<(), Error>;
}

/// JSON (de)serializing cache on top of a [`CacheClient`].
pub struct Cache<C: CacheClient> {
    client: Arc<C>,
    /// Timeout for every single call, incl. the background writes.
    timeout: Duration,
    /// The pending background writes, shared between clones.
    writes: TaskTracker,
    logger: Logger,
}

impl<C: CacheClient> Clone for Cache<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            timeout: self.timeout,
            writes: self.writes.clone(),
            logger: self.logger.clone(),
        }
    }
}

impl<C: CacheClient> Cache<C> {
    pub fn new(client: Arc<C>, timeout: Duration, logger: Logger) -> Self {
        Self {
            client,
            timeout,
            writes: TaskTracker::new(),
            logger,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, ctx: &RequestContext, key: &str) -> Option<T> {
        let bytes = match ctx.run(self.timeout, self.client.get(key)).await {
            Ok(Ok(bytes)) => bytes?,
            Ok(Err(err)) => {
                warn!(&self.logger, "Reading from the cache failed: {}", err; "key" => key, "module" => "cache");
                return None;
            }
            Err(interrupted) => {
                debug!(&self.logger, "Reading from the cache was interrupted: {}", interrupted; "key" => key, "module" => "cache");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(&self.logger, "Cached value has an unexpected shape: {}", err; "key" => key, "module" => "cache");
                None
            }
        }
    }

    /// Writes the value in the background and returns immediately.
    ///
    /// The write is not bound to the request context and failures are only logged.
    /// Use [`Cache::flush`] before shutting down the runtime, otherwise pending writes are lost.
    pub fn set_async<T: Serialize>(&self, key: String, value: &T, ttl: Duration) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(&self.logger, "Serializing the value for the cache failed: {}", err; "key" => key, "module" => "cache");
                return;
            }
        };

        let client = self.client.clone();
        let timeout = self.timeout;
        let logger = self.logger.clone();

        self.writes.spawn(async move {
            let result = match tokio::time::timeout(timeout, client.set(&key, bytes, ttl)).await {
                Ok(result) => result,
                Err(_elapsed) => Err(Error::TimedOut),
            };

            if let Err(err) = result {
                error!(&logger, "Writing to the cache failed: {}", err; "key" => key, "module" => "cache");
            }
        });
    }

    pub async fn delete(&self, ctx: &RequestContext, key: &str) -> Result<(), Error> {
        ctx.run(self.timeout, self.client.delete(key)).await?
    }

    /// Waits for the pending background writes, for at most the cache timeout.
    ///
    /// Writes started afterwards are tracked again.
    pub async fn flush(&self) -> Result<(), Error> {
        self.writes.close();
        let flushed = tokio::time::timeout(self.timeout, self.writes.wait()).await;
        self.writes.reopen();

        match flushed {
            Ok(()) => Ok(()),
            Err(_elapsed) => {
                error!(&self.logger, "Pending cache writes did not finish in time"; "pending" => self.writes.len(), "module" => "cache");

                Err(Error::TimedOut)
            }
        }
    }
}
