use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{CacheClient, Error};

/// In-memory [`CacheClient`] which honours the TTL of the entries.
///
/// It can be switched to fail every call.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, (Vec<u8>, Instant)>,
    unavailable: AtomicBool,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst)
    }

    /// Whether an entry exists for the `key`, regardless of it being expired.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn check(&self) -> Result<(), Error> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(Error::Unavailable("the in-memory cache is switched off".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheClient for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        self.check()?;

        let value = self
            .entries
            .get(key)
            .filter(|entry| Instant::now() < entry.value().1)
            .map(|entry| entry.value().0.clone());

        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), Error> {
        self.check()?;

        self.entries
            .insert(key.to_string(), (value, Instant::now() + ttl));

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.check()?;

        self.entries.remove(key);

        Ok(())
    }
}
