//! Read-through access to Apps, Units and reward configs.
//!
//! Every lookup is answered from the cache while the cached entry is fresh,
//! otherwise from the store after which the cache is refilled in the background.
//! Missing entities are cached too, so repeated lookups of unknown ids
//! don't reach the store while the entry is fresh.
//!
//! Only Units survive a store failure: a previously cached Unit is returned
//! even when it is no longer fresh.
use std::{sync::Arc, time::Duration};

use chrono::{serde::ts_milliseconds, DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use slog::{debug, warn, Logger};
use thiserror::Error;

use primitives::{
    unit::UnitDefaults, App, Config, ReferralRewardConfig, Unit, UnitKind, WelcomeRewardConfig,
    WelcomeRewardConfigs,
};

use crate::{
    cache::{Cache, CacheClient},
    context::RequestContext,
    db::{self, Store, UnitQuery},
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Store is unavailable: {0}")]
    StoreUnavailable(#[source] db::Error),
    #[error("Request was cancelled")]
    Cancelled,
}

impl From<db::Error> for Error {
    fn from(error: db::Error) -> Self {
        match error {
            db::Error::Cancelled => Self::Cancelled,
            error => Self::StoreUnavailable(error),
        }
    }
}

pub mod keys {
    use primitives::UnitKind;

    pub fn app(app_id: i64) -> String {
        format!("app:{}", app_id)
    }

    pub fn unit(unit_id: i64) -> String {
        format!("unit:{}", unit_id)
    }

    pub fn app_unit(app_id: i64) -> String {
        format!("appUnit:{}", app_id)
    }

    pub fn app_unit_kind(app_id: i64, unit_kind: UnitKind) -> String {
        format!("appUnit:{}:{}", app_id, unit_kind)
    }

    pub fn welcome_reward_configs(unit_id: i64) -> String {
        format!("wrcs:{}", unit_id)
    }
}

/// A cached value together with the time it was cached at.
///
/// A `None` payload means that the store had no such entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cached<T> {
    pub payload: T,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl<T> Cached<T> {
    pub fn new(payload: T) -> Self {
        Self::new_at(payload, Utc::now())
    }

    pub fn new_at(payload: T, created_at: DateTime<Utc>) -> Self {
        Self {
            payload,
            created_at,
        }
    }

    pub fn is_fresh_at(&self, freshness: chrono::Duration, now: DateTime<Utc>) -> bool {
        now < self.created_at + freshness
    }
}

pub struct Repository<S: Store, C: CacheClient> {
    store: Arc<S>,
    cache: Cache<C>,
    freshness: chrono::Duration,
    expiration: Duration,
    unit_defaults: UnitDefaults,
    logger: Logger,
}

impl<S: Store, C: CacheClient> Clone for Repository<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
            freshness: self.freshness,
            expiration: self.expiration,
            unit_defaults: self.unit_defaults.clone(),
            logger: self.logger.clone(),
        }
    }
}

impl<S: Store, C: CacheClient> Repository<S, C> {
    pub fn new(store: Arc<S>, cache_client: Arc<C>, config: &Config, logger: Logger) -> Self {
        Self {
            store,
            cache: Cache::new(cache_client, config.cache_timeout(), logger.clone()),
            freshness: chrono::Duration::milliseconds(config.cache_freshness.into()),
            expiration: config.cache_expiration(),
            unit_defaults: config.unit_defaults.clone(),
            logger,
        }
    }

    pub async fn get_app(&self, ctx: &RequestContext, app_id: i64) -> Result<Option<App>, Error> {
        let key = keys::app(app_id);

        if let Some(cached) = self.fresh::<Option<App>>(ctx, &key).await {
            return Ok(cached.payload);
        }

        let app = self.store.fetch_app(ctx, app_id).await?.map(App::from);
        self.refill(key, &app);

        Ok(app)
    }

    pub async fn get_unit_by_id(
        &self,
        ctx: &RequestContext,
        unit_id: i64,
    ) -> Result<Option<Unit>, Error> {
        self.get_unit(ctx, keys::unit(unit_id), UnitQuery::by_id(unit_id))
            .await
    }

    /// The unit with the lowest id of the app.
    pub async fn get_unit_by_app_id(
        &self,
        ctx: &RequestContext,
        app_id: i64,
    ) -> Result<Option<Unit>, Error> {
        self.get_unit(ctx, keys::app_unit(app_id), UnitQuery::by_app_id(app_id))
            .await
    }

    /// The unit with the lowest id of the given kind of the app.
    pub async fn get_unit_by_app_id_and_kind(
        &self,
        ctx: &RequestContext,
        app_id: i64,
        unit_kind: UnitKind,
    ) -> Result<Option<Unit>, Error> {
        self.get_unit(
            ctx,
            keys::app_unit_kind(app_id, unit_kind),
            UnitQuery::by_app_id_and_kind(app_id, unit_kind),
        )
        .await
    }

    /// The welcome reward configs of the unit which are in their rewarding window.
    pub async fn get_rewarding_welcome_reward_configs(
        &self,
        ctx: &RequestContext,
        unit_id: i64,
    ) -> Result<WelcomeRewardConfigs, Error> {
        let key = keys::welcome_reward_configs(unit_id);

        if let Some(cached) = self.fresh::<WelcomeRewardConfigs>(ctx, &key).await {
            return Ok(cached.payload);
        }

        let configs = self
            .store
            .find_rewarding_welcome_reward_configs(ctx, unit_id, Utc::now())
            .await?
            .into_iter()
            .map(WelcomeRewardConfig::from)
            .collect::<WelcomeRewardConfigs>();
        self.refill(key, &configs);

        Ok(configs)
    }

    /// Always read from the store.
    pub async fn get_referral_reward_config(
        &self,
        ctx: &RequestContext,
        app_id: i64,
    ) -> Result<Option<ReferralRewardConfig>, Error> {
        let config = self
            .store
            .fetch_referral_reward_config(ctx, app_id)
            .await?
            .map(ReferralRewardConfig::from);

        Ok(config)
    }

    /// Waits for the background cache refills, see [`Cache::flush`].
    pub async fn flush_cache_writes(&self) -> Result<(), crate::cache::Error> {
        self.cache.flush().await
    }

    async fn get_unit(
        &self,
        ctx: &RequestContext,
        key: String,
        query: UnitQuery,
    ) -> Result<Option<Unit>, Error> {
        let cached = match self.cache.get::<Cached<Option<Unit>>>(ctx, &key).await {
            Some(cached) if cached.is_fresh_at(self.freshness, Utc::now()) => {
                return Ok(cached.payload)
            }
            cached => cached,
        };

        match self.store.fetch_unit(ctx, &query).await {
            Ok(record) => {
                let unit = record.map(|record| record.into_unit(&self.unit_defaults));
                self.refill(key, &unit);

                Ok(unit)
            }
            Err(db::Error::Cancelled) => Err(Error::Cancelled),
            Err(error) => match cached.and_then(|cached| cached.payload) {
                Some(stale) if stale.id != 0 => {
                    warn!(&self.logger, "Store failed, serving the stale cached unit: {}", error; "key" => key, "module" => "repository");

                    Ok(Some(stale))
                }
                _ => Err(error.into()),
            },
        }
    }

    async fn fresh<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        key: &str,
    ) -> Option<Cached<T>> {
        let cached = self.cache.get::<Cached<T>>(ctx, key).await;

        match cached {
            Some(cached) if cached.is_fresh_at(self.freshness, Utc::now()) => Some(cached),
            _ => {
                debug!(&self.logger, "Cache miss"; "key" => key, "module" => "repository");
                None
            }
        }
    }

    fn refill<T: Serialize>(&self, key: String, payload: &T) {
        self.cache
            .set_async(key, &Cached::new(payload), self.expiration)
    }
}
