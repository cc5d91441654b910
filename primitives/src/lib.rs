#![deny(rust_2018_idioms)]
#![deny(clippy::all)]

pub mod app;
pub mod config;
pub mod unit;
pub mod welcome_reward;
pub mod util {
    pub mod logging;
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_util;

pub use self::app::{App, ReferralRewardConfig};
pub use self::config::Config;
pub use self::unit::{AdContentRatio, AdPolicy, ContentPolicy, Platform, Postback, Unit, UnitKind};
pub use self::welcome_reward::{WelcomeRewardConfig, WelcomeRewardConfigs, GLOBAL_COUNTRY};
