use chrono::{serde::ts_milliseconds_option, DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A publisher application integrating the lockscreen SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_app_version: Option<i32>,
    pub is_enabled: bool,
}

impl App {
    pub fn is_deactivated(&self) -> bool {
        !self.is_enabled
    }
}

/// Referral reward parameters of an [`App`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralRewardConfig {
    pub app_id: i64,
    pub enabled: bool,
    pub amount: i32,
    pub max_referral: i32,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "ts_milliseconds_option"
    )]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "ts_milliseconds_option"
    )]
    pub end_date: Option<DateTime<Utc>>,
    pub verify_url: String,
    pub title_for_referee: String,
    pub title_for_referrer: String,
    pub title_for_max_referrer: String,
    pub expire_hours: i32,
    pub min_sdk_version: i32,
}

impl ReferralRewardConfig {
    pub fn is_ended(&self) -> bool {
        self.is_ended_at(Utc::now())
    }

    pub fn is_ended_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.end_date, Some(end_date) if end_date < now)
    }
}
