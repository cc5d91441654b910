//! Rows as they are stored, before being mapped to the `primitives` entities.
use chrono::{DateTime, Utc};
use tokio_postgres::Row;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRecord {
    pub id: i64,
    pub latest_app_version: Option<i32>,
    pub is_enabled: bool,
}

impl From<&Row> for AppRecord {
    fn from(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            latest_app_version: row.get("latest_app_version"),
            is_enabled: row.get("is_enabled"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitRecord {
    pub id: i64,
    pub app_id: i64,
    /// `L`, `N`, `BBN`, `BBF`, `BBI`, `BBP` or `ADTR`
    pub unit_type: String,
    pub ad_type: Option<i32>,
    pub content_type: Option<i32>,
    pub base_reward: Option<i32>,
    pub base_init_period: Option<i32>,
    pub page_limit: Option<i32>,
    /// `"ad:content"`, may be empty
    pub feed_ratio: String,
    pub first_screen_ratio: String,
    pub pager_ratio: String,
    pub adserver_unit_id: i64,
    pub landing_reward: i32,
    pub filtered_providers: Option<String>,
    pub init_hmac_key: String,
    pub country: String,
    /// `A`, `I` or `W`
    pub platform: String,
    pub timezone: String,
    pub organization_id: i64,
    pub shuffle_option: Option<i32>,
    pub postback_url: String,
    pub postback_aes_iv: String,
    pub postback_aes_key: String,
    pub postback_headers: String,
    pub postback_hmac_key: String,
    pub postback_params: String,
    pub postback_class: String,
    pub postback_config: String,
    /// `Y` or `N`
    pub is_active: String,
}

impl From<&Row> for UnitRecord {
    fn from(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            app_id: row.get("app_id"),
            unit_type: row.get("unit_type"),
            ad_type: row.get("ad_type"),
            content_type: row.get("content_type"),
            base_reward: row.get("base_reward"),
            base_init_period: row.get("base_init_period"),
            page_limit: row.get("page_limit"),
            feed_ratio: row.get("feed_ratio"),
            first_screen_ratio: row.get("first_screen_ratio"),
            pager_ratio: row.get("pager_ratio"),
            adserver_unit_id: row.get("adserver_unit_id"),
            landing_reward: row.get("landing_reward"),
            filtered_providers: row.get("filtered_providers"),
            init_hmac_key: row.get("init_hmac_key"),
            country: row.get("country"),
            platform: row.get("platform"),
            timezone: row.get("timezone"),
            organization_id: row.get("organization_id"),
            shuffle_option: row.get("shuffle_option"),
            postback_url: row.get("postback_url"),
            postback_aes_iv: row.get("postback_aes_iv"),
            postback_aes_key: row.get("postback_aes_key"),
            postback_headers: row.get("postback_headers"),
            postback_hmac_key: row.get("postback_hmac_key"),
            postback_params: row.get("postback_params"),
            postback_class: row.get("postback_class"),
            postback_config: row.get("postback_config"),
            is_active: row.get("is_active"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeRewardConfigRecord {
    pub id: i64,
    pub unit_id: i64,
    pub country: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub name: String,
    pub amount: i32,
    pub retention_days: i32,
    pub is_terminated: bool,
    pub is_exhausted: bool,
    pub max_num_rewards: Option<i32>,
}

impl From<&Row> for WelcomeRewardConfigRecord {
    fn from(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            unit_id: row.get("unit_id"),
            country: row.get("country"),
            start_time: row.get("start_time"),
            end_time: row.get("end_time"),
            name: row.get("name"),
            amount: row.get("amount"),
            retention_days: row.get("retention_days"),
            is_terminated: row.get("is_terminated"),
            is_exhausted: row.get("is_exhausted"),
            max_num_rewards: row.get("max_num_rewards"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralRewardConfigRecord {
    pub app_id: i64,
    pub enabled: bool,
    pub amount: i32,
    pub max_referral: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub verify_url: String,
    pub title_for_referee: String,
    pub title_for_referrer: String,
    pub title_for_max_referrer: String,
    pub expire_hours: i32,
    pub min_sdk_version: i32,
}

impl From<&Row> for ReferralRewardConfigRecord {
    fn from(row: &Row) -> Self {
        Self {
            app_id: row.get("app_id"),
            enabled: row.get("enabled"),
            amount: row.get("amount"),
            max_referral: row.get("max_referral"),
            start_date: row.get("start_date"),
            end_date: row.get("end_date"),
            verify_url: row.get("verify_url"),
            title_for_referee: row.get("title_for_referee"),
            title_for_referrer: row.get("title_for_referrer"),
            title_for_max_referrer: row.get("title_for_max_referrer"),
            expire_hours: row.get("expire_hours"),
            min_sdk_version: row.get("min_sdk_version"),
        }
    }
}
