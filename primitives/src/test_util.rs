//! Dummy Apps, Units and reward configs used throughout the tests.
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;

use crate::{
    app::{App, ReferralRewardConfig},
    unit::{AdPolicy, ContentPolicy, Platform, Postback, Unit, UnitDefaults, UnitKind},
    welcome_reward::WelcomeRewardConfig,
};

pub use crate::util::logging::discard_logger;

pub static DUMMY_APP: Lazy<App> = Lazy::new(|| App {
    id: 100_000_043,
    latest_app_version: Some(30_100),
    is_enabled: true,
});

pub static DUMMY_UNIT: Lazy<Unit> = Lazy::new(|| {
    let defaults = UnitDefaults::default();

    Unit {
        id: 7,
        app_id: DUMMY_APP.id,
        unit_kind: UnitKind::Lockscreen,
        ad_policy: AdPolicy::All,
        content_policy: ContentPolicy::All,
        base_reward: defaults.base_reward,
        base_init_period: defaults.base_init_period,
        page_limit: defaults.page_limit,
        feed_ratio: defaults.feed_ratio,
        first_screen_ratio: defaults.first_screen_ratio,
        pager_ratio: defaults.pager_ratio,
        adserver_unit_id: 5_566_778,
        landing_reward: 1,
        filtered_providers: None,
        init_hmac_key: "init-hmac-key".to_string(),
        country: "KR".to_string(),
        platform: Platform::Android,
        timezone: "Asia/Seoul".to_string(),
        organization_id: 1,
        shuffle_option: None,
        postback: Postback {
            url: "https://publisher.example/postback".to_string(),
            ..Postback::default()
        },
        is_active: true,
    }
});

pub static DUMMY_REFERRAL_REWARD_CONFIG: Lazy<ReferralRewardConfig> =
    Lazy::new(|| ReferralRewardConfig {
        app_id: DUMMY_APP.id,
        enabled: true,
        amount: 300,
        max_referral: 10,
        start_date: Some(
            DateTime::parse_from_rfc3339("2021-01-01T00:00:00Z")
                .expect("Valid RFC 3339 date")
                .with_timezone(&Utc),
        ),
        end_date: None,
        verify_url: "https://publisher.example/referral/verify".to_string(),
        title_for_referee: "Welcome!".to_string(),
        title_for_referrer: "Thanks for inviting".to_string(),
        title_for_max_referrer: "You've reached the limit".to_string(),
        expire_hours: 72,
        min_sdk_version: 1_600,
    });

/// A [`WelcomeRewardConfig`] of unit `1` with an `amount` of `100`
/// which is neither terminated nor exhausted.
pub fn welcome_reward_config(
    id: i64,
    country: Option<&str>,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    retention_days: i32,
) -> WelcomeRewardConfig {
    WelcomeRewardConfig {
        id,
        unit_id: 1,
        country: country.map(ToString::to_string),
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
