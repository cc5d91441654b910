use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use primitives::{
    config::Environment, App, Config, ReferralRewardConfig, Unit, UnitKind, WelcomeRewardConfig,
    WelcomeRewardConfigs, GLOBAL_COUNTRY,
};
use redis::ConnectionInfo;
use serde::{Deserialize, Deserializer};
use slog::Logger;

/// an error used when deserializing a [`EnvConfig`] instance from environment variables
/// see [`EnvConfig::from_env()`]
pub use envy::Error as EnvError;

use crate::{
    cache::CacheClient,
    context::RequestContext,
    db::Store,
    repository::{Error, Repository},
};

pub static DEFAULT_REDIS_URL: Lazy<ConnectionInfo> = Lazy::new(|| {
    "redis://127.0.0.1:6379"
        .parse::<ConnectionInfo>()
        .expect("Valid URL")
});

#[derive(Debug, Deserialize, Clone)]
pub struct EnvConfig {
    /// Defaults to `Development`: [`Environment::default()`]
    #[serde(default)]
    pub env: Environment,
    #[serde(deserialize_with = "redis_url", default = "default_redis_url")]
    /// Defaults to locally running Redis server: [`DEFAULT_REDIS_URL`]
    pub redis_url: ConnectionInfo,
}

impl EnvConfig {
    /// Deserialize the [`EnvConfig`] from Environment variables.
    ///
    /// The Postgres connection is configured separately with [`crate::db::PostgresConfig`].
    pub fn from_env() -> Result<Self, EnvError> {
        envy::from_env()
    }
}

fn redis_url<'de, D>(deserializer: D) -> Result<ConnectionInfo, D::Error>
where
    D: Deserializer<'de>,
{
    let url_string = String::deserialize(deserializer)?;

    url_string.parse().map_err(serde::de::Error::custom)
}

fn default_redis_url() -> ConnectionInfo {
    DEFAULT_REDIS_URL.clone()
}

/// Picks the single welcome reward a device registered at `registered_at` can claim at `now`.
///
/// The latest ending config for the `country` is preferred over the latest global one.
/// When no country is given and a single config is rewardable,
/// it is picked regardless of its country.
pub fn select_rewardable(
    configs: &WelcomeRewardConfigs,
    country: &str,
    registered_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<WelcomeRewardConfig> {
    let rewardable = configs.rewardable_for_at(registered_at, now);

    if let Some(for_country) = rewardable.by_country(country).pick_latest() {
        return Some(for_country.clone());
    }

    if let Some(global) = rewardable.by_country(GLOBAL_COUNTRY).pick_latest() {
        return Some(global.clone());
    }

    match &*rewardable {
        [lone] if country == GLOBAL_COUNTRY => Some(lone.clone()),
        _ => None,
    }
}

/// The entry point for reading Apps, Units and rewards.
pub struct AppService<S: Store, C: CacheClient> {
    repository: Repository<S, C>,
}

impl<S: Store, C: CacheClient> Clone for AppService<S, C> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
        }
    }
}

impl<S: Store, C: CacheClient> AppService<S, C> {
    pub fn new(repository: Repository<S, C>) -> Self {
        Self { repository }
    }

    pub fn with_config(store: Arc<S>, cache: Arc<C>, config: &Config, logger: Logger) -> Self {
        Self::new(Repository::new(store, cache, config, logger))
    }

    pub async fn get_app(&self, ctx: &RequestContext, app_id: i64) -> Result<Option<App>, Error> {
        self.repository.get_app(ctx, app_id).await
    }

    pub async fn get_unit_by_id(
        &self,
        ctx: &RequestContext,
        unit_id: i64,
    ) -> Result<Option<Unit>, Error> {
        self.repository.get_unit_by_id(ctx, unit_id).await
    }

    pub async fn get_unit_by_app_id(
        &self,
        ctx: &RequestContext,
        app_id: i64,
    ) -> Result<Option<Unit>, Error> {
        self.repository.get_unit_by_app_id(ctx, app_id).await
    }

    pub async fn get_unit_by_app_id_and_kind(
        &self,
        ctx: &RequestContext,
        app_id: i64,
        unit_kind: UnitKind,
    ) -> Result<Option<Unit>, Error> {
        self.repository
            .get_unit_by_app_id_and_kind(ctx, app_id, unit_kind)
            .await
    }

    pub async fn get_referral_reward_config(
        &self,
        ctx: &RequestContext,
        app_id: i64,
    ) -> Result<Option<ReferralRewardConfig>, Error> {
        self.repository.get_referral_reward_config(ctx, app_id).await
    }

    /// `country` is [`GLOBAL_COUNTRY`] when the device country is unknown.
    pub async fn get_rewardable_welcome_reward_config(
        &self,
        ctx: &RequestContext,
        unit_id: i64,
        country: &str,
        registered_at: DateTime<Utc>,
    ) -> Result<Option<WelcomeRewardConfig>, Error> {
        let configs = self
            .repository
            .get_rewarding_welcome_reward_configs(ctx, unit_id)
            .await?;

        Ok(select_rewardable(&configs, country, registered_at, Utc::now()))
    }

    pub async fn get_active_welcome_reward_configs(
        &self,
        ctx: &RequestContext,
        unit_id: i64,
    ) -> Result<WelcomeRewardConfigs, Error> {
        let configs = self
            .repository
            .get_rewarding_welcome_reward_configs(ctx, unit_id)
            .await?;

        Ok(configs.active_at(Utc::now()))
    }

    /// Waits for the background cache refills, call it before shutting down.
    pub async fn flush(&self) -> Result<(), crate::cache::Error> {
        self.repository.flush_cache_writes().await
    }
}
