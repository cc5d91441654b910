use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Config, ManagerConfig, PoolConfig, RecyclingMethod, Runtime};
use serde::Deserialize;
use thiserror::Error;
use tokio_postgres::{types::ToSql, NoTls};

use primitives::UnitKind;

use crate::context::{Interrupted, RequestContext};

pub use self::model::{
    AppRecord, ReferralRewardConfigRecord, UnitRecord, WelcomeRewardConfigRecord,
};
pub use self::postgres::PostgresStore;
pub use deadpool_postgres::{CreatePoolError, Pool as DbPool, PoolError};

#[cfg(any(test, feature = "test-util"))]
pub use self::memory::MemoryStore;

pub mod mapper;
pub mod model;
pub mod postgres;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

#[cfg(test)]
pub mod tests_postgres;

#[derive(Debug, Error)]
pub enum Error {
    #[error("DB Pool error: {0}")]
    Pool(#[from] PoolError),
    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
    #[error("Store call was cancelled")]
    Cancelled,
    #[error("Store call timed out")]
    TimedOut,
    #[error("Store is unavailable: {0}")]
    Unavailable(String),
}

impl From<Interrupted> for Error {
    fn from(interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::Cancelled => Self::Cancelled,
            Interrupted::TimedOut => Self::TimedOut,
        }
    }
}

/// Postgres connection parameters read from the `POSTGRES_*` environment variables.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PostgresConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default)]
    pub db: Option<String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_user() -> String {
    "postgres".to_string()
}

fn default_password() -> String {
    "postgres".to_string()
}

impl PostgresConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("POSTGRES_").from_env()
    }
}

pub fn postgres_connection(
    config: &PostgresConfig,
    max_size: usize,
) -> Result<DbPool, CreatePoolError> {
    let mut pool_config = Config::new();
    pool_config.host = Some(config.host.clone());
    pool_config.port = Some(config.port);
    pool_config.user = Some(config.user.clone());
    pool_config.password = Some(config.password.clone());
    pool_config.dbname = config.db.clone();
    pool_config.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    pool_config.pool = Some(PoolConfig::new(max_size));

    pool_config.create_pool(Some(Runtime::Tokio1), NoTls)
}

/// Applies all embedded migrations which haven't been applied yet.
///
/// Uses a blocking connection, run it outside of the async runtime workers.
pub fn migrations(config: &PostgresConfig) -> Result<(), migrant_lib::Error> {
    use migrant_lib::{Config, Direction, Migrator, Settings};

    let mut settings = Settings::configure_postgres();
    settings
        .database_user(&config.user)
        .database_password(&config.password)
        .database_host(&config.host)
        .database_port(config.port);
    if let Some(db) = &config.db {
        settings.database_name(db);
    }
    let settings = settings.build()?;

    let mut migrations_config = Config::with_settings(&settings);
    migrations_config.use_cli_compatible_tags(true);
    migrations_config.setup()?;

    macro_rules! make_migration {
        ($tag:expr) => {
            migrant_lib::EmbeddedMigration::with_tag($tag)
                .up(include_str!(concat!("../migrations/", $tag, "/up.sql")))
                .down(include_str!(concat!("../migrations/", $tag, "/down.sql")))
                .boxed()
        };
    }

    migrations_config.use_migrations(&[make_migration!("20221018101500_initial_tables")])?;

    let migrations_config = migrations_config.reload()?;

    Migrator::with_config(&migrations_config)
        .direction(Direction::Up)
        .all(true)
        // by default this will set the `swallow_completion` to `false`
        // so no error will be returned if all migrations have already been ran
        .apply()?;

    Ok(())
}

pub type SqlParams = Vec<Box<dyn ToSql + Sync + Send>>;

/// Predicates for looking up a single unit.
///
/// Every predicate that is set must match, the unit with the lowest id wins.
/// With no predicates set the first unit is returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitQuery {
    pub id: Option<i64>,
    pub app_id: Option<i64>,
    pub unit_kind: Option<UnitKind>,
}

impl UnitQuery {
    pub fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_app_id(app_id: i64) -> Self {
        Self {
            app_id: Some(app_id),
            ..Self::default()
        }
    }

    pub fn by_app_id_and_kind(app_id: i64, unit_kind: UnitKind) -> Self {
        Self {
            app_id: Some(app_id),
            unit_kind: Some(unit_kind),
            ..Self::default()
        }
    }

    /// The `WHERE` clause (if any) and its parameters, numbered from `$1`.
    pub fn to_where_clause(&self) -> (String, SqlParams) {
        let mut conditions = vec![];
        let mut params: SqlParams = vec![];

        if let Some(id) = self.id {
            params.push(Box::new(id));
            conditions.push(format!("id = ${}", params.len()));
        }

        if let Some(app_id) = self.app_id {
            params.push(Box::new(app_id));
            conditions.push(format!("app_id = ${}", params.len()));
        }

        if let Some(unit_kind) = self.unit_kind {
            params.push(Box::new(mapper::unit_kind_code(unit_kind)));
            conditions.push(format!("unit_type = ${}", params.len()));
        }

        if conditions.is_empty() {
            (String::new(), params)
        } else {
            (format!("WHERE {}", conditions.join(" AND ")), params)
        }
    }

    pub fn matches(&self, record: &UnitRecord) -> bool {
        self.id.map_or(true, |id| record.id == id)
            && self.app_id.map_or(true, |app_id| record.app_id == app_id)
            && self
                .unit_kind
                .map_or(true, |kind| record.unit_type == mapper::unit_kind_code(kind))
    }
}

/// The persistent source of truth for Apps, Units and reward configs.
///
/// A missing row is `Ok(None)` (or an empty list), never an error.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn fetch_app(
        &self,
        ctx: &RequestContext,
        app_id: i64,
    ) -> Result<Option<AppRecord>, Error>;

    async fn fetch_unit(
        &self,
        ctx: &RequestContext,
        query: &UnitQuery,
    ) -> Result<Option<UnitRecord>, Error>;

    /// All configs of the unit which are currently rewarding, ordered by id.
    ///
    /// Configs with `max_num_rewards` set are returned even after their rewarding window,
    /// configs without an end time are only returned when they have `max_num_rewards` set.
    async fn find_rewarding_welcome_reward_configs(
        &self,
        ctx: &RequestContext,
        unit_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<WelcomeRewardConfigRecord>, Error>;

    async fn fetch_referral_reward_config(
        &self,
        ctx: &RequestContext,
        app_id: i64,
    ) -> Result<Option<ReferralRewardConfigRecord>, Error>;
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unit_query_where_clause() {
        let (clause, params) = UnitQuery::default().to_where_clause();
        assert_eq!("", clause);
        assert!(params.is_empty());

        let (clause, params) = UnitQuery::by_id(5).to_where_clause();
        assert_eq!("WHERE id = $1", clause);
        assert_eq!(1, params.len());

        let (clause, params) =
            UnitQuery::by_app_id_and_kind(100, UnitKind::BenefitFeed).to_where_clause();
        assert_eq!("WHERE app_id = $1 AND unit_type = $2", clause);
        assert_eq!(2, params.len());
    }

    #[test]
    fn interrupted_calls_are_store_errors() {
        assert!(matches!(Error::from(Interrupted::Cancelled), Error::Cancelled));
        assert!(matches!(Error::from(Interrupted::TimedOut), Error::TimedOut));
    }
}
