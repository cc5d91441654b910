//! Testing utilities for the gateway, backed by the in-memory Store and Cache.
use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use primitives::{
    config::DEVELOPMENT_CONFIG,
    test_util::{discard_logger, DUMMY_UNIT},
    AdPolicy, App, ContentPolicy, ReferralRewardConfig,
};

use crate::{
    application::AppService,
    cache::MemoryCache,
    db::{
        AppRecord, MemoryStore, ReferralRewardConfigRecord, UnitRecord,
        WelcomeRewardConfigRecord,
    },
    repository::Repository,
};

/// A [`Repository`] with the development config, returned together with its Store and Cache.
pub fn setup_repository() -> (
    Repository<MemoryStore, MemoryCache>,
    Arc<MemoryStore>,
    Arc<MemoryCache>,
) {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(MemoryCache::new());

    let repository = Repository::new(
        store.clone(),
        cache.clone(),
        &DEVELOPMENT_CONFIG,
        discard_logger(),
    );

    (repository, store, cache)
}

pub fn setup_service() -> (
    AppService<MemoryStore, MemoryCache>,
    Arc<MemoryStore>,
    Arc<MemoryCache>,
) {
    let (repository, store, cache) = setup_repository();

    (AppService::new(repository), store, cache)
}

/// Cache writes happen in the background, this gives them the chance to complete.
pub async fn wait_for_cache_writes() {
    tokio::time::sleep(Duration::from_millis(10)).await
}

pub fn app_record(app: &App) -> AppRecord {
    AppRecord {
        id: app.id,
        latest_app_version: app.latest_app_version,
        is_enabled: app.is_enabled,
    }
}

/// The stored record of the [`DUMMY_UNIT`] with the given id, app and unit type code.
pub fn unit_record(id: i64, app_id: i64, unit_type: &str) -> UnitRecord {
    let unit = &*DUMMY_UNIT;

    UnitRecord {
        id,
        app_id,
        unit_type: unit_type.to_string(),
        ad_type: Some(match unit.ad_policy {
            AdPolicy::None => 0,
            AdPolicy::All => 1,
            AdPolicy::OldVersionOnly => 2,
        }),
        content_type: Some(match unit.content_policy {
            ContentPolicy::None => 0,
            ContentPolicy::All => 1,
            ContentPolicy::UnitOnly => 2,
        }),
        base_reward: Some(unit.base_reward),
        base_init_period: Some(unit.base_init_period),
        page_limit: Some(unit.page_limit),
        feed_ratio: unit.feed_ratio.to_string(),
        first_screen_ratio: unit.first_screen_ratio.to_string(),
        pager_ratio: unit.pager_ratio.to_string(),
        adserver_unit_id: unit.adserver_unit_id,
        landing_reward: unit.landing_reward,
        filtered_providers: unit.filtered_providers.clone(),
        init_hmac_key: unit.init_hmac_key.clone(),
        country: unit.country.clone(),
        platform: "A".to_string(),
        timezone: unit.timezone.clone(),
        organization_id: unit.organization_id,
        shuffle_option: unit.shuffle_option,
        postback_url: unit.postback.url.clone(),
        postback_aes_iv: unit.postback.aes_iv.clone(),
        postback_aes_key: unit.postback.aes_key.clone(),
        postback_headers: unit.postback.headers.clone(),
        postback_hmac_key: unit.postback.hmac_key.clone(),
        postback_params: unit.postback.params.clone(),
        postback_class: unit.postback.class.clone(),
        postback_config: unit.postback.config.clone(),
        is_active: if unit.is_active { "Y" } else { "N" }.to_string(),
    }
}

/// A global config with an `amount` of `100` which is neither terminated nor exhausted.
pub fn welcome_reward_config_record(
    id: i64,
    unit_id: i64,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    retention_days: i32,
) -> WelcomeRewardConfigRecord {
    WelcomeRewardConfigRecord {
        id,
        unit_id,
        country: None,
        start_time,
        end_time,
        name: format!("Welcome reward #{}", id),
        amount: 100,
        retention_days,
        is_terminated: false,
        is_exhausted: false,
        max_num_rewards: None,
    }
}

pub fn referral_reward_config_record(config: &ReferralRewardConfig) -> ReferralRewardConfigRecord {
    ReferralRewardConfigRecord {
        app_id: config.app_id,
        enabled: config.enabled,
        amount: config.amount,
        max_referral: config.max_referral,
        start_date: config.start_date,
        end_date: config.end_date,
        verify_url: config.verify_url.clone(),
        title_for_referee: config.title_for_referee.clone(),
        title_for_referrer: config.title_for_referrer.clone(),
        title_for_max_referrer: config.title_for_max_referrer.clone(),
        expire_hours: config.expire_hours,
        min_sdk_version: config.min_sdk_version,
    }
}
