use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::context::RequestContext;

use super::{
    model::{AppRecord, ReferralRewardConfigRecord, UnitRecord, WelcomeRewardConfigRecord},
    Error, Store, UnitQuery,
};

/// In-memory [`Store`] applying the same predicates as the Postgres queries.
///
/// It counts the calls made to it and can be switched to fail every call.
#[derive(Debug, Default)]
pub struct MemoryStore {
    apps: DashMap<i64, AppRecord>,
    units: DashMap<i64, UnitRecord>,
    welcome_reward_configs: DashMap<i64, WelcomeRewardConfigRecord>,
    referral_reward_configs: DashMap<i64, ReferralRewardConfigRecord>,
    calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_app(&self, app: AppRecord) {
        self.apps.insert(app.id, app);
    }

    pub fn insert_unit(&self, unit: UnitRecord) {
        self.units.insert(unit.id, unit);
    }

    pub fn insert_welcome_reward_config(&self, config: WelcomeRewardConfigRecord) {
        self.welcome_reward_configs.insert(config.id, config);
    }

    pub fn insert_referral_reward_config(&self, config: ReferralRewardConfigRecord) {
        self.referral_reward_configs.insert(config.app_id, config);
    }

    /// How many times the store has been called, including the failed calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst)
    }

    fn call(&self, ctx: &RequestContext) -> Result<(), Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if ctx.is_cancelled() {
            Err(Error::Cancelled)
        } else if self.unavailable.load(Ordering::SeqCst) {
            Err(Error::Unavailable("the in-memory store is switched off".to_string()))
        } else {
            Ok(())
        }
    }
}

fn is_rewarding(config: &WelcomeRewardConfigRecord, unit_id: i64, now: DateTime<Utc>) -> bool {
    config.unit_id == unit_id
        && !config.is_exhausted
        && !config.is_terminated
        && config.start_time < now
        && (config.max_num_rewards.is_some()
            || config.end_time.map_or(false, |end_time| {
                now < end_time + Duration::days(config.retention_days.into())
            }))
}

#[async_trait]
impl Store for MemoryStore {
    async fn fetch_app(
        &self,
        ctx: &RequestContext,
        app_id: i64,
    ) -> Result<Option<AppRecord>, Error> {
        self.call(ctx)?;

        Ok(self.apps.get(&app_id).map(|app| app.value().clone()))
    }

    async fn fetch_unit(
        &self,
        ctx: &RequestContext,
        query: &UnitQuery,
    ) -> Result<Option<UnitRecord>, Error> {
        self.call(ctx)?;

        Ok(self
            .units
            .iter()
            .filter(|unit| query.matches(unit.value()))
            .min_by_key(|unit| unit.id)
            .map(|unit| unit.value().clone()))
    }

    async fn find_rewarding_welcome_reward_configs(
        &self,
        ctx: &RequestContext,
        unit_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<WelcomeRewardConfigRecord>, Error> {
        self.call(ctx)?;

        let mut configs = self
            .welcome_reward_configs
            .iter()
            .filter(|config| is_rewarding(config.value(), unit_id, now))
            .map(|config| config.value().clone())
            .collect::<Vec<_>>();
        configs.sort_by_key(|config| config.id);

        Ok(configs)
    }

    async fn fetch_referral_reward_config(
        &self,
        ctx: &RequestContext,
        app_id: i64,
    ) -> Result<Option<ReferralRewardConfigRecord>, Error> {
        self.call(ctx)?;

        Ok(self
            .referral_reward_configs
            .get(&app_id)
            .map(|config| config.value().clone()))
    }
}
