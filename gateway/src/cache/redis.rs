use std::{convert::TryFrom, time::Duration};

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, IntoConnectionInfo, RedisError};

use super::{CacheClient, Error};

/// [`CacheClient`] on a multiplexed Redis connection.
///
/// Cloning is cheap, all clones share the same connection.
#[derive(Clone)]
pub struct RedisCache {
    connection: MultiplexedConnection,
}

impl RedisCache {
    pub fn new(connection: MultiplexedConnection) -> Self {
        Self { connection }
    }

    pub async fn connect<T: IntoConnectionInfo>(info: T) -> Result<Self, RedisError> {
        let client = redis::Client::open(info)?;

        Ok(Self::new(client.get_multiplexed_tokio_connection().await?))
    }
}

#[async_trait]
impl CacheClient for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let value = redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<Vec<u8>>>(&mut self.connection.clone())
            .await?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), Error> {
        let ttl_millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);

        redis::cmd("SET")
            .arg(key)
            .arg(value.as_slice())
            .arg("PX")
            .arg(ttl_millis)
            .query_async::<_, ()>(&mut self.connection.clone())
            .await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut self.connection.clone())
            .await?;

        Ok(())
    }
}
