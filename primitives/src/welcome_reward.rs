//! Welcome rewards are time-bounded campaigns which reward newly registered devices.
//!
//! A [`WelcomeRewardConfig`] has three windows:
//!
//! - **active**: `(start, end)`, the campaign is accepting new devices.
//! - **rewarding**: `(start, end + retention days)`, devices registered while the
//!   campaign was active may still claim the reward after they've been retained.
//! - **registration**: `[start, end]`, when a device has to register to be eligible.
//!
//! A config without an `end` never ends and all of its windows are open-ended.
use std::{iter::FromIterator, ops::Deref};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The country value which means "no country", used for global campaigns.
pub const GLOBAL_COUNTRY: &str = "";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeRewardConfig {
    pub id: i64,
    pub unit_id: i64,
    /// `None` for global campaigns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// RFC 3339, keeps the full precision of the stored `timestamptz`
    pub start_time: DateTime<Utc>,
    /// `None` when the campaign never ends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub name: String,
    pub amount: i32,
    pub retention_days: i32,
    pub is_terminated: bool,
    pub is_exhausted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_num_rewards: Option<i32>,
}

impl WelcomeRewardConfig {
    pub fn is_end_infinite(&self) -> bool {
        self.end_time.is_none()
    }

    /// The end of the rewarding window, `None` if it never ends.
    pub fn rewarding_until(&self) -> Option<DateTime<Utc>> {
        self.end_time
            .map(|end| end + Duration::days(i64::from(self.retention_days)))
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.start_time < now && self.end_time.map_or(true, |end| end > now)
    }

    /// The campaign may give rewards at the given time
    pub fn is_rewarding_at(&self, now: DateTime<Utc>) -> bool {
        self.start_time < now && self.rewarding_until().map_or(true, |until| until > now)
    }

    /// Whether the device registration time falls inside the (inclusive) campaign period.
    pub fn is_registered_within(&self, registered_at: DateTime<Utc>) -> bool {
        registered_at >= self.start_time && self.end_time.map_or(true, |end| registered_at <= end)
    }

    /// A device registered at `registered_at` can claim the reward at `now`:
    /// the campaign is rewarding, the device registered during the campaign
    /// and it has been retained for at least `retention_days` full days.
    pub fn is_rewardable_at(&self, registered_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.is_rewarding_at(now)
            && self.is_registered_within(registered_at)
            && days_since(registered_at, now) >= i64::from(self.retention_days)
    }
}

/// Full days passed between `from` and `now`, truncated towards zero.
pub fn days_since(from: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - from).num_days()
}

/// A set of [`WelcomeRewardConfig`]s, usually all the rewarding ones of a single unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WelcomeRewardConfigs(Vec<WelcomeRewardConfig>);

impl WelcomeRewardConfigs {
    pub fn new(configs: Vec<WelcomeRewardConfig>) -> Self {
        Self(configs)
    }

    fn filter<F>(&self, predicate: F) -> Self
    where
        F: Fn(&WelcomeRewardConfig) -> bool,
    {
        self.0.iter().filter(|wrc| predicate(wrc)).cloned().collect()
    }

    /// For the [`GLOBAL_COUNTRY`] it keeps the global configs,
    /// otherwise it keeps the configs for the exact `country`.
    pub fn by_country(&self, country: &str) -> Self {
        self.filter(|wrc| match wrc.country.as_deref() {
            None => country == GLOBAL_COUNTRY,
            Some(wrc_country) => wrc_country == country,
        })
    }

    pub fn active_at(&self, now: DateTime<Utc>) -> Self {
        self.filter(|wrc| wrc.is_active_at(now))
    }

    pub fn rewardable_for_at(&self, registered_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        self.filter(|wrc| wrc.is_rewardable_at(registered_at, now))
    }

    /// Returns the config which ends the latest.
    ///
    /// A config with an infinite end wins right away,
    /// on equal ends the first one in the set is kept.
    pub fn pick_latest(&self) -> Option<&WelcomeRewardConfig> {
        let mut latest: Option<&WelcomeRewardConfig> = None;

        for wrc in self.0.iter() {
            let end = match wrc.end_time {
                Some(end) => end,
                None => return Some(wrc),
            };

            match latest.and_then(|latest| latest.end_time) {
                Some(latest_end) if end <= latest_end => {}
                _ => latest = Some(wrc),
            }
        }

        latest
    }
}

impl Deref for WelcomeRewardConfigs {
    type Target = [WelcomeRewardConfig];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<WelcomeRewardConfig>> for WelcomeRewardConfigs {
    fn from(configs: Vec<WelcomeRewardConfig>) -> Self {
        Self(configs)
    }
}

impl FromIterator<WelcomeRewardConfig> for WelcomeRewardConfigs {
    fn from_iter<I: IntoIterator<Item = WelcomeRewardConfig>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for WelcomeRewardConfigs {
    type Item = WelcomeRewardConfig;
    type IntoIter = std::vec::IntoIter<WelcomeRewardConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::welcome_reward_config;
    use pretty_assertions::assert_eq;

    fn days(days: i64) -> Duration {
        Duration::days(days)
    }

    #[test]
    fn active_and_rewarding_windows() {
        let now = Utc::now();

        let ongoing = welcome_reward_config(1, None, now - days(2), Some(now + days(1)), 0);
        assert!(ongoing.is_active_at(now));
        assert!(ongoing.is_rewarding_at(now));

        let not_started = welcome_reward_config(2, None, now + days(1), Some(now + days(3)), 0);
        assert!(!not_started.is_active_at(now));
        assert!(!not_started.is_rewarding_at(now));

        // ended a day ago, but 2 retention days keep it rewarding
        let retained = welcome_reward_config(3, None, now - days(5), Some(now - days(1)), 2);
        assert!(!retained.is_active_at(now));
        assert!(retained.is_rewarding_at(now));
        assert_eq!(Some(now + days(1)), retained.rewarding_until());

        let ended = welcome_reward_config(4, None, now - days(5), Some(now - days(3)), 2);
        assert!(!ended.is_rewarding_at(now));

        let infinite = welcome_reward_config(5, None, now - days(100), None, 7);
        assert!(infinite.is_end_infinite());
        assert!(infinite.is_active_at(now));
        assert!(infinite.is_rewarding_at(now));
        assert_eq!(None, infinite.rewarding_until());
    }

    #[test]
    fn registration_window_is_inclusive() {
        let now = Utc::now();
        let start = now - days(10);
        let end = now - days(2);
        let wrc = welcome_reward_config(1, None, start, Some(end), 0);

        assert!(wrc.is_registered_within(start));
        assert!(wrc.is_registered_within(end));
        assert!(!wrc.is_registered_within(start - Duration::seconds(1)));
        assert!(!wrc.is_registered_within(end + Duration::seconds(1)));

        let infinite = welcome_reward_config(2, None, start, None, 0);
        assert!(infinite.is_registered_within(now + days(365)));
        assert!(!infinite.is_registered_within(start - Duration::seconds(1)));
    }

    #[test]
    fn rewardable_after_retention() {
        let now = Utc::now();
        let wrc = welcome_reward_config(
            1,
            None,
            now - Duration::hours(72),
            Some(now - Duration::hours(24)),
            2,
        );
        let registered_at = now - Duration::hours(48);

        assert!(wrc.is_rewardable_at(registered_at, now));
        assert!(!wrc.is_active_at(now));

        // registered only a day ago, not retained long enough
        assert!(!wrc.is_rewardable_at(now - Duration::hours(30), now));
        // registered before the campaign started
        assert!(!wrc.is_rewardable_at(now - Duration::hours(73), now));
    }

    #[test]
    fn days_since_truncates() {
        let now = Utc::now();

        assert_eq!(0, days_since(now - Duration::hours(23), now));
        assert_eq!(1, days_since(now - Duration::hours(47), now));
        assert_eq!(2, days_since(now - Duration::hours(48), now));
        assert_eq!(0, days_since(now + Duration::hours(12), now));
    }

    #[test]
    fn rewardable_implies_rewarding() {
        let now = Utc::now();
        let offsets = [-30, -10, -3, -1, 0, 1, 3, 10];

        for start in offsets {
            for end in offsets.iter().map(|end| Some(*end)).chain([None]) {
                let end_time = match end {
                    Some(end) if end < start => continue,
                    Some(end) => Some(now + days(end)),
                    None => None,
                };

                for retention in [0, 1, 5] {
                    let wrc =
                        welcome_reward_config(1, None, now + days(start), end_time, retention);

                    for registered in offsets {
                        let registered_at = now + days(registered);

                        if wrc.is_rewardable_at(registered_at, now) {
                            assert!(wrc.is_rewarding_at(now), "{:?}", wrc);
                        }

                        if wrc.is_end_infinite() && registered_at >= wrc.start_time {
                            assert_eq!(wrc.start_time < now, wrc.is_rewarding_at(now));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn filters_by_country() {
        let now = Utc::now();
        let mut kr = welcome_reward_config(1, Some("KR"), now - days(1), None, 0);
        kr.amount = 100;
        let global = welcome_reward_config(2, None, now - days(1), None, 0);
        let jp = welcome_reward_config(3, Some("JP"), now - days(1), None, 0);

        let configs = WelcomeRewardConfigs::new(vec![kr.clone(), global.clone(), jp.clone()]);

        assert_eq!(&[kr], &*configs.by_country("KR"));
        assert_eq!(&[jp], &*configs.by_country("JP"));
        assert_eq!(&[global], &*configs.by_country(GLOBAL_COUNTRY));
        assert!(configs.by_country("US").is_empty());
    }

    #[test]
    fn picks_latest_end() {
        let now = Utc::now();
        let first = welcome_reward_config(1, None, now - days(3), Some(now + days(1)), 0);
        let latest = welcome_reward_config(2, None, now - days(3), Some(now + days(5)), 0);
        let same_end = welcome_reward_config(3, None, now - days(1), Some(now + days(5)), 0);
        let infinite = welcome_reward_config(4, None, now - days(3), None, 0);

        assert_eq!(None, WelcomeRewardConfigs::default().pick_latest());

        let configs =
            WelcomeRewardConfigs::new(vec![first.clone(), latest.clone(), same_end.clone()]);
        assert_eq!(Some(&latest), configs.pick_latest());

        let configs = WelcomeRewardConfigs::new(vec![first, infinite.clone(), latest]);
        assert_eq!(Some(&infinite), configs.pick_latest());
    }

    #[test]
    fn picked_config_belongs_to_the_set_and_country() {
        let now = Utc::now();
        let configs = WelcomeRewardConfigs::new(vec![
            welcome_reward_config(1, Some("KR"), now - days(3), Some(now + days(1)), 0),
            welcome_reward_config(2, None, now - days(3), Some(now + days(2)), 0),
            welcome_reward_config(3, Some("KR"), now - days(3), Some(now + days(4)), 0),
            welcome_reward_config(4, Some("JP"), now - days(3), None, 0),
        ]);

        for country in ["KR", "JP", "US", GLOBAL_COUNTRY] {
            if let Some(picked) = configs.by_country(country).pick_latest() {
                assert!(configs.contains(picked));

                match picked.country.as_deref() {
                    Some(picked_country) => assert_eq!(country, picked_country),
                    None => assert_eq!(GLOBAL_COUNTRY, country),
                }
            }
        }
    }

    #[test]
    fn active_only() {
        let now = Utc::now();
        let active = welcome_reward_config(1, None, now - days(3), Some(now + days(1)), 0);
        let retained = welcome_reward_config(2, None, now - days(3), Some(now - days(1)), 5);

        let configs = WelcomeRewardConfigs::new(vec![active.clone(), retained]);

        assert_eq!(&[active], &*configs.active_at(now));
    }

    #[test]
    fn dates_round_trip_with_full_precision() {
        let start_time = DateTime::parse_from_rfc3339("2026-10-17T23:27:17.141274644Z")
            .expect("Valid RFC 3339 date")
            .with_timezone(&Utc);
        let wrc = welcome_reward_config(1, Some("KR"), start_time, None, 0);

        let json = serde_json::to_value(&wrc).expect("Should serialize");
        let serialized_start = json["startTime"].as_str().expect("Should be a string");
        assert_eq!(
            start_time,
            DateTime::parse_from_rfc3339(serialized_start)
                .expect("Should be RFC 3339")
                .with_timezone(&Utc)
        );
        assert!(json.get("endTime").is_none());

        let mut ended = wrc.clone();
        ended.end_time = Some(start_time + Duration::nanoseconds(1_500));
        let configs = WelcomeRewardConfigs::new(vec![wrc, ended]);
        let json = serde_json::to_string(&configs).expect("Should serialize");
        assert!(json.starts_with('['));

        let deserialized: WelcomeRewardConfigs =
            serde_json::from_str(&json).expect("Should deserialize");
        assert_eq!(configs, deserialized);
    }
}
