//! Setup for the tests running against a Postgres server.
//!
//! The server is configured with the `POSTGRES_*` environment variables, see [`PostgresConfig`].
//! Every test works on its own ids, so the tests can share the database and run in parallel.
use once_cell::sync::Lazy;

use super::{
    model::{ReferralRewardConfigRecord, UnitRecord, WelcomeRewardConfigRecord},
    migrations, postgres_connection, AppRecord, DbPool, PostgresConfig,
};

pub static TEST_CONFIG: Lazy<PostgresConfig> =
    Lazy::new(|| PostgresConfig::from_env().expect("Should read the POSTGRES_* variables"));

/// Applied once for the whole test run.
static MIGRATIONS: Lazy<Result<(), String>> =
    Lazy::new(|| migrations(&TEST_CONFIG).map_err(|err| err.to_string()));

/// A new pool to the migrated test database.
pub async fn setup_test_pool() -> DbPool {
    tokio::task::spawn_blocking(|| (*MIGRATIONS).clone())
        .await
        .expect("Should join the migrations task")
        .expect("Migrations should succeed");

    postgres_connection(&TEST_CONFIG, 2).expect("Should create the pool")
}

pub async fn insert_app(pool: &DbPool, app: &AppRecord) {
    let client = pool.get().await.expect("Should get a client");

    client
        .execute("DELETE FROM apps WHERE id = $1", &[&app.id])
        .await
        .expect("Should delete");
    client
        .execute(
            "INSERT INTO apps (id, latest_app_version, is_enabled) VALUES ($1, $2, $3)",
            &[&app.id, &app.latest_app_version, &app.is_enabled],
        )
        .await
        .expect("Should insert");
}

/// Removes every unit of the app.
pub async fn clear_units(pool: &DbPool, app_id: i64) {
    let client = pool.get().await.expect("Should get a client");

    client
        .execute("DELETE FROM unit WHERE app_id = $1", &[&app_id])
        .await
        .expect("Should delete");
}

/// Only the columns the lookups filter on are inserted, the rest take the table defaults.
pub async fn insert_unit(pool: &DbPool, unit: &UnitRecord) {
    let client = pool.get().await.expect("Should get a client");

    client
        .execute("DELETE FROM unit WHERE id = $1", &[&unit.id])
        .await
        .expect("Should delete");
    client
        .execute(
            "INSERT INTO unit (id, app_id, unit_type, feed_ratio, platform, is_active) VALUES ($1, $2, $3, $4, $5, $6)",
            &[
                &unit.id,
                &unit.app_id,
                &unit.unit_type,
                &unit.feed_ratio,
                &unit.platform,
                &unit.is_active,
            ],
        )
        .await
        .expect("Should insert");
}

/// Removes every welcome reward config of the unit.
pub async fn clear_welcome_reward_configs(pool: &DbPool, unit_id: i64) {
    let client = pool.get().await.expect("Should get a client");

    client
        .execute(
            "DELETE FROM welcome_reward_config WHERE unit_id = $1",
            &[&unit_id],
        )
        .await
        .expect("Should delete");
}

pub async fn insert_welcome_reward_config(pool: &DbPool, config: &WelcomeRewardConfigRecord) {
    let client = pool.get().await.expect("Should get a client");

    client
        .execute(
            "DELETE FROM welcome_reward_config WHERE id = $1",
            &[&config.id],
        )
        .await
        .expect("Should delete");
    client
        .execute(
            "INSERT INTO welcome_reward_config (id, unit_id, country, start_time, end_time, name, amount, retention_days, is_terminated, is_exhausted, max_num_rewards) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            &[
                &config.id,
                &config.unit_id,
                &config.country,
                &config.start_time,
                &config.end_time,
                &config.name,
                &config.amount,
                &config.retention_days,
                &config.is_terminated,
                &config.is_exhausted,
                &config.max_num_rewards,
            ],
        )
        .await
        .expect("Should insert");
}

pub async fn insert_referral_reward_config(pool: &DbPool, config: &ReferralRewardConfigRecord) {
    let client = pool.get().await.expect("Should get a client");

    client
        .execute(
            "DELETE FROM referral_reward_config WHERE app_id = $1",
            &[&config.app_id],
        )
        .await
        .expect("Should delete");
    client
        .execute(
            "INSERT INTO referral_reward_config (app_id, enabled, amount, max_referral, start_date, end_date, verify_url, title_for_referee, title_for_referrer, title_for_max_referrer, expire_hours, min_sdk_version) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            &[
                &config.app_id,
                &config.enabled,
                &config.amount,
                &config.max_referral,
                &config.start_date,
                &config.end_date,
                &config.verify_url,
                &config.title_for_referee,
                &config.title_for_referrer,
                &config.title_for_max_referrer,
                &config.expire_hours,
                &config.min_sdk_version,
            ],
        )
        .await
        .expect("Should insert");
}

pub async fn delete_referral_reward_config(pool: &DbPool, app_id: i64) {
    let client = pool.get().await.expect("Should get a client");

    client
        .execute(
            "DELETE FROM referral_reward_config WHERE app_id = $1",
            &[&app_id],
        )
        .await
        .expect("Should delete");
}
