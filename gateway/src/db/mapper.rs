//! Maps the stored records to the domain entities.
//!
//! Stored values are never trusted to be well-formed: unknown codes and
//! malformed or missing values fall back to the defaults.
use primitives::{
    unit::UnitDefaults, AdContentRatio, AdPolicy, App, ContentPolicy, Platform, Postback,
    ReferralRewardConfig, Unit, UnitKind, WelcomeRewardConfig,
};

use super::model::{AppRecord, ReferralRewardConfigRecord, UnitRecord, WelcomeRewardConfigRecord};

pub fn unit_kind_from_code(code: &str) -> UnitKind {
    match code {
        "L" => UnitKind::Lockscreen,
        "N" => UnitKind::Native,
        "BBN" => UnitKind::BenefitNative,
        "BBF" => UnitKind::BenefitFeed,
        "BBI" => UnitKind::BenefitInterstitial,
        "BBP" => UnitKind::BenefitPop,
        "ADTR" => UnitKind::AdapterRewardedVideo,
        _ => UnitKind::Unknown,
    }
}

pub fn unit_kind_code(unit_kind: UnitKind) -> &'static str {
    match unit_kind {
        UnitKind::Lockscreen => "L",
        UnitKind::Native => "N",
        UnitKind::BenefitNative => "BBN",
        UnitKind::BenefitFeed => "BBF",
        UnitKind::BenefitInterstitial => "BBI",
        UnitKind::BenefitPop => "BBP",
        UnitKind::AdapterRewardedVideo => "ADTR",
        UnitKind::Unknown => "U",
    }
}

pub fn ad_policy(ad_type: Option<i32>) -> AdPolicy {
    match ad_type {
        Some(0) => AdPolicy::None,
        Some(2) => AdPolicy::OldVersionOnly,
        _ => AdPolicy::All,
    }
}

pub fn content_policy(content_type: Option<i32>) -> ContentPolicy {
    match content_type {
        Some(0) => ContentPolicy::None,
        Some(2) => ContentPolicy::UnitOnly,
        _ => ContentPolicy::All,
    }
}

pub fn platform(code: &str) -> Platform {
    match code {
        "A" => Platform::Android,
        "I" => Platform::Ios,
        "W" => Platform::Web,
        _ => Platform::Unknown,
    }
}

/// `N` is the only inactive flag.
pub fn is_active(flag: &str) -> bool {
    flag != "N"
}

pub fn ratio_or(value: &str, default: AdContentRatio) -> AdContentRatio {
    value.trim().parse().unwrap_or(default)
}

impl From<AppRecord> for App {
    fn from(record: AppRecord) -> Self {
        Self {
            id: record.id,
            latest_app_version: record.latest_app_version,
            is_enabled: record.is_enabled,
        }
    }
}

impl UnitRecord {
    pub fn into_unit(self, defaults: &UnitDefaults) -> Unit {
        Unit {
            id: self.id,
            app_id: self.app_id,
            unit_kind: unit_kind_from_code(&self.unit_type),
            ad_policy: ad_policy(self.ad_type),
            content_policy: content_policy(self.content_type),
            base_reward: self.base_reward.unwrap_or(defaults.base_reward),
            base_init_period: self.base_init_period.unwrap_or(defaults.base_init_period),
            page_limit: self.page_limit.unwrap_or(defaults.page_limit),
            feed_ratio: ratio_or(&self.feed_ratio, defaults.feed_ratio),
            first_screen_ratio: ratio_or(&self.first_screen_ratio, defaults.first_screen_ratio),
            pager_ratio: ratio_or(&self.pager_ratio, defaults.pager_ratio),
            adserver_unit_id: self.adserver_unit_id,
            landing_reward: self.landing_reward,
            filtered_providers: self.filtered_providers,
            init_hmac_key: self.init_hmac_key,
            country: self.country,
            platform: platform(&self.platform),
            timezone: self.timezone,
            organization_id: self.organization_id,
            shuffle_option: self.shuffle_option,
            postback: Postback {
                url: self.postback_url,
                aes_iv: self.postback_aes_iv,
                aes_key: self.postback_aes_key,
                headers: self.postback_headers,
                hmac_key: self.postback_hmac_key,
                params: self.postback_params,
                class: self.postback_class,
                config: self.postback_config,
            },
            is_active: is_active(&self.is_active),
        }
    }
}

impl From<WelcomeRewardConfigRecord> for WelcomeRewardConfig {
    fn from(record: WelcomeRewardConfigRecord) -> Self {
        Self {
            id: record.id,
            unit_id: record.unit_id,
            country: record.country,
            start_time: record.start_time,
            end_time: record.end_time,
            name: record.name,
            amount: record.amount,
            retention_days: record.retention_days,
            is_terminated: record.is_terminated,
            is_exhausted: record.is_exhausted,
            max_num_rewards: record.max_num_rewards,
        }
    }
}

impl From<ReferralRewardConfigRecord> for ReferralRewardConfig {
    fn from(record: ReferralRewardConfigRecord) -> Self {
        Self {
            app_id: record.app_id,
            enabled: record.enabled,
            amount: record.amount,
            max_referral: record.max_referral,
            start_date: record.start_date,
            end_date: record.end_date,
            verify_url: record.verify_url,
            title_for_referee: record.title_for_referee,
            title_for_referrer: record.title_for_referrer,
            title_for_max_referrer: record.title_for_max_referrer,
            expire_hours: record.expire_hours,
            min_sdk_version: record.min_sdk_version,
        }
    }
}
