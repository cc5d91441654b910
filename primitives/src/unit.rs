use std::convert::TryFrom;

use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

pub use ratio::AdContentRatio;

/// The kind of placement a [`Unit`] is serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr)]
#[serde(rename_all = "kebab-case")]
#[display(style = "kebab-case")]
pub enum UnitKind {
    Lockscreen,
    Native,
    BenefitNative,
    BenefitFeed,
    BenefitInterstitial,
    BenefitPop,
    AdapterRewardedVideo,
    Unknown,
}

impl UnitKind {
    pub fn is_benefit(&self) -> bool {
        matches!(
            self,
            UnitKind::BenefitNative
                | UnitKind::BenefitFeed
                | UnitKind::BenefitInterstitial
                | UnitKind::BenefitPop
        )
    }

    pub fn is_lockscreen(&self) -> bool {
        *self == UnitKind::Lockscreen
    }
}

impl Default for UnitKind {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Which ads a [`Unit`] may show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdPolicy {
    None,
    All,
    /// Ads are only allowed on outdated client versions
    OldVersionOnly,
}

impl Default for AdPolicy {
    fn default() -> Self {
        Self::All
    }
}

/// Which content a [`Unit`] may show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentPolicy {
    None,
    All,
    /// Only content campaigns targeted to the unit itself
    UnitOnly,
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self::All
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    Web,
    Unknown,
}

impl Default for Platform {
    fn default() -> Self {
        Self::Unknown
    }
}

mod ratio {
    use super::*;

    /// The ratio of ads to content in a feed, e.g. `1:5`.
    ///
    /// (De)serialized as the `"ad:content"` string.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromStr, Serialize, Deserialize)]
    #[display("{ad}:{content}")]
    #[serde(try_from = "String", into = "String")]
    pub struct AdContentRatio {
        pub ad: i32,
        pub content: i32,
    }

    impl AdContentRatio {
        pub const fn new(ad: i32, content: i32) -> Self {
            Self { ad, content }
        }
    }

    impl TryFrom<String> for AdContentRatio {
        type Error = parse_display::ParseError;

        fn try_from(value: String) -> Result<Self, Self::Error> {
            value.parse()
        }
    }

    impl From<AdContentRatio> for String {
        fn from(ratio: AdContentRatio) -> Self {
            ratio.to_string()
        }
    }
}

/// Where and how the publisher wants to be notified of rewards.
///
/// All values are opaque to us and passed as-is to the SDKs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Postback {
    pub url: String,
    pub aes_iv: String,
    pub aes_key: String,
    pub headers: String,
    pub hmac_key: String,
    pub params: String,
    pub class: String,
    pub config: String,
}

/// Default values for the nullable columns of a [`Unit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDefaults {
    pub base_reward: i32,
    /// In seconds
    pub base_init_period: i32,
    pub page_limit: i32,
    pub feed_ratio: AdContentRatio,
    pub first_screen_ratio: AdContentRatio,
    pub pager_ratio: AdContentRatio,
}

impl Default for UnitDefaults {
    fn default() -> Self {
        Self {
            base_reward: 2,
            base_init_period: 3600,
            page_limit: 20,
            feed_ratio: AdContentRatio::new(1, 5),
            first_screen_ratio: AdContentRatio::new(9, 1),
            pager_ratio: AdContentRatio::new(3, 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: i64,
    pub app_id: i64,
    pub unit_kind: UnitKind,
    pub ad_policy: AdPolicy,
    pub content_policy: ContentPolicy,
    pub base_reward: i32,
    /// In seconds
    pub base_init_period: i32,
    pub page_limit: i32,
    pub feed_ratio: AdContentRatio,
    pub first_screen_ratio: AdContentRatio,
    pub pager_ratio: AdContentRatio,
    /// The unit id registered on the upstream ad server
    pub adserver_unit_id: i64,
    pub landing_reward: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filtered_providers: Option<String>,
    pub init_hmac_key: String,
    pub country: String,
    pub platform: Platform,
    pub timezone: String,
    pub organization_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shuffle_option: Option<i32>,
    pub postback: Postback,
    pub is_active: bool,
}

impl Unit {
    pub fn is_android(&self) -> bool {
        self.platform == Platform::Android
    }

    pub fn is_ios(&self) -> bool {
        self.platform == Platform::Ios
    }

    pub fn is_mobile(&self) -> bool {
        self.is_android() || self.is_ios()
    }
}
