use std::{future::Future, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Client;
use slog::{debug, Logger};
use tokio_postgres::{types::ToSql, NoTls};

use crate::context::RequestContext;

use super::{
    model::{AppRecord, ReferralRewardConfigRecord, UnitRecord, WelcomeRewardConfigRecord},
    DbPool, Error, Store, UnitQuery,
};

static APP_STATEMENT: &str =
    "SELECT id, latest_app_version, is_enabled FROM apps WHERE id = $1";

static UNIT_COLUMNS: &str = "id, app_id, unit_type, ad_type, content_type, base_reward, base_init_period, page_limit, feed_ratio, first_screen_ratio, pager_ratio, adserver_unit_id, landing_reward, filtered_providers, init_hmac_key, country, platform, timezone, organization_id, shuffle_option, postback_url, postback_aes_iv, postback_aes_key, postback_headers, postback_hmac_key, postback_params, postback_class, postback_config, is_active";

/// ```text
/// SELECT ... FROM welcome_reward_config
/// WHERE unit_id = $1 AND is_exhausted = false AND is_terminated = false AND start_time < $2
/// AND (max_num_rewards IS NOT NULL OR $2 < end_time + retention_days days)
/// ORDER BY id ASC
/// ```
static REWARDING_WELCOME_REWARD_CONFIGS_STATEMENT: &str = "SELECT id, unit_id, country, start_time, end_time, name, amount, retention_days, is_terminated, is_exhausted, max_num_rewards FROM welcome_reward_config WHERE unit_id = $1 AND is_exhausted = false AND is_terminated = false AND start_time < $2 AND (max_num_rewards IS NOT NULL OR $2 < end_time + make_interval(days => retention_days)) ORDER BY id ASC";

static REFERRAL_REWARD_CONFIG_STATEMENT: &str = "SELECT app_id, enabled, amount, max_referral, start_date, end_date, verify_url, title_for_referee, title_for_referrer, title_for_max_referrer, expire_hours, min_sdk_version FROM referral_reward_config WHERE app_id = $1";

/// [`Store`] backed by a Postgres connection pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: DbPool,
    /// Applies to both getting a connection from the pool and running the query.
    timeout: Duration,
    logger: Logger,
}

impl PostgresStore {
    pub fn new(pool: DbPool, timeout: Duration, logger: Logger) -> Self {
        Self {
            pool,
            timeout,
            logger,
        }
    }

    /// Runs the `query` with a pooled client under the request context.
    ///
    /// If the request is cancelled or times out while the query runs,
    /// the query is cancelled on the server as well.
    async fn with_client<T, F, Fut>(&self, ctx: &RequestContext, query: F) -> Result<T, Error>
    where
        F: FnOnce(Client) -> Fut,
        Fut: Future<Output = Result<T, tokio_postgres::Error>>,
    {
        let client = ctx.run(self.timeout, self.pool.get()).await??;
        let cancel_token = client.cancel_token();

        match ctx.run(self.timeout, query(client)).await {
            Ok(result) => Ok(result?),
            Err(interrupted) => {
                let logger = self.logger.clone();
                tokio::spawn(async move {
                    if let Err(err) = cancel_token.cancel_query(NoTls).await {
                        debug!(&logger, "Cancelling the interrupted query failed: {}", err; "module" => "postgres_store");
                    }
                });

                Err(interrupted.into())
            }
        }
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn fetch_app(
        &self,
        ctx: &RequestContext,
        app_id: i64,
    ) -> Result<Option<AppRecord>, Error> {
        self.with_client(ctx, |client| async move {
            let statement = client.prepare(APP_STATEMENT).await?;
            let row = client.query_opt(&statement, &[&app_id]).await?;

            Ok(row.as_ref().map(AppRecord::from))
        })
        .await
    }

    async fn fetch_unit(
        &self,
        ctx: &RequestContext,
        query: &UnitQuery,
    ) -> Result<Option<UnitRecord>, Error> {
        let (where_clause, params) = query.to_where_clause();
        let sql = format!(
            "SELECT {} FROM unit {} ORDER BY id ASC LIMIT 1",
            UNIT_COLUMNS, where_clause
        );

        self.with_client(ctx, |client| async move {
            let params: Vec<&(dyn ToSql + Sync)> = params
                .iter()
                .map(|param| param.as_ref() as &(dyn ToSql + Sync))
                .collect();

            let statement = client.prepare(&sql).await?;
            let row = client.query_opt(&statement, &params).await?;

            Ok(row.as_ref().map(UnitRecord::from))
        })
        .await
    }

    async fn find_rewarding_welcome_reward_configs(
        &self,
        ctx: &RequestContext,
        unit_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<WelcomeRewardConfigRecord>, Error> {
        self.with_client(ctx, |client| async move {
            let statement = client
                .prepare(REWARDING_WELCOME_REWARD_CONFIGS_STATEMENT)
                .await?;
            let rows = client.query(&statement, &[&unit_id, &now]).await?;

            Ok(rows.iter().map(WelcomeRewardConfigRecord::from).collect())
        })
        .await
    }

    async fn fetch_referral_reward_config(
        &self,
        ctx: &RequestContext,
        app_id: i64,
    ) -> Result<Option<ReferralRewardConfigRecord>, Error> {
        self.with_client(ctx, |client| async move {
            let statement = client.prepare(REFERRAL_REWARD_CONFIG_STATEMENT).await?;
            let row = client.query_opt(&statement, &[&app_id]).await?;

            Ok(row.as_ref().map(ReferralRewardConfigRecord::from))
        })
        .await
    }
}

#[cfg(test)]
mod test {
    use chrono::Duration as ChronoDuration;
    use pretty_assertions::assert_eq;
    use primitives::{
        test_util::{discard_logger, DUMMY_APP, DUMMY_REFERRAL_REWARD_CONFIG},
        UnitKind,
    };

    use crate::{
        db::tests_postgres::{
            clear_units, clear_welcome_reward_configs, delete_referral_reward_config, insert_app,
            insert_referral_reward_config, insert_unit, insert_welcome_reward_config,
            setup_test_pool,
        },
        test_util::{
            app_record, referral_reward_config_record, unit_record, welcome_reward_config_record,
        },
    };

    use super::*;

    fn setup_store(pool: DbPool) -> PostgresStore {
        PostgresStore::new(pool, Duration::from_secs(5), discard_logger())
    }

    #[tokio::test]
    #[ignore] // Requires a running Postgres
    async fn fetches_an_app() {
        let pool = setup_test_pool().await;
        let store = setup_store(pool.clone());
        let ctx = RequestContext::new();
        insert_app(&pool, &app_record(&DUMMY_APP)).await;

        let app = store
            .fetch_app(&ctx, DUMMY_APP.id)
            .await
            .expect("Should fetch");
        let missing = store.fetch_app(&ctx, -1).await.expect("Should fetch");

        assert_eq!(Some(app_record(&DUMMY_APP)), app);
        assert_eq!(None, missing);
    }

    #[tokio::test]
    #[ignore] // Requires a running Postgres
    async fn fetches_the_first_matching_unit() {
        let pool = setup_test_pool().await;
        let store = setup_store(pool.clone());
        let ctx = RequestContext::new();
        let app_id = 900_001;

        clear_units(&pool, app_id).await;
        insert_unit(&pool, &unit_record(900_130, app_id, "BBF")).await;
        insert_unit(&pool, &unit_record(900_120, app_id, "L")).await;
        insert_unit(&pool, &unit_record(900_110, app_id, "BBF")).await;

        let by_id = store
            .fetch_unit(&ctx, &UnitQuery::by_id(900_130))
            .await
            .expect("Should fetch");
        assert_eq!(Some(900_130), by_id.map(|unit| unit.id));

        let by_app = store
            .fetch_unit(&ctx, &UnitQuery::by_app_id(app_id))
            .await
            .expect("Should fetch");
        assert_eq!(Some(900_110), by_app.map(|unit| unit.id));

        let by_kind = store
            .fetch_unit(&ctx, &UnitQuery::by_app_id_and_kind(app_id, UnitKind::Lockscreen))
            .await
            .expect("Should fetch")
            .expect("Should find the unit");
        assert_eq!(900_120, by_kind.id);
        assert_eq!("L", by_kind.unit_type);
        assert_eq!("Y", by_kind.is_active);

        let missing = store
            .fetch_unit(&ctx, &UnitQuery::by_app_id_and_kind(app_id, UnitKind::Native))
            .await
            .expect("Should fetch");
        assert_eq!(None, missing);
    }

    #[tokio::test]
    #[ignore] // Requires a running Postgres
    async fn finds_the_rewarding_welcome_reward_configs() {
        let pool = setup_test_pool().await;
        let store = setup_store(pool.clone());
        let ctx = RequestContext::new();
        let now = Utc::now();
        let unit_id = 900_200;

        // days relative to now
        let record = |id: i64, start: i64, end: Option<i64>, retention_days: i32| {
            welcome_reward_config_record(
                id,
                unit_id,
                now + ChronoDuration::days(start),
                end.map(|end| now + ChronoDuration::days(end)),
                retention_days,
            )
        };

        clear_welcome_reward_configs(&pool, unit_id).await;
        let configs = [
            // within the retention window
            record(900_201, -10, Some(-1), 3),
            // past the retention window
            record(900_202, -10, Some(-5), 3),
            // not started yet
            record(900_203, 1, Some(2), 0),
            // no end and no cap
            record(900_204, -1, None, 0),
            WelcomeRewardConfigRecord {
                max_num_rewards: Some(500),
                ..record(900_205, -1, None, 0)
            },
            // past the retention window with a cap
            WelcomeRewardConfigRecord {
                max_num_rewards: Some(500),
                ..record(900_206, -30, Some(-20), 1)
            },
            WelcomeRewardConfigRecord {
                is_terminated: true,
                ..record(900_207, -1, Some(1), 0)
            },
        ];
        for config in configs.iter() {
            insert_welcome_reward_config(&pool, config).await;
        }

        let rewarding = store
            .find_rewarding_welcome_reward_configs(&ctx, unit_id, now)
            .await
            .expect("Should fetch");
        let none = store
            .find_rewarding_welcome_reward_configs(&ctx, unit_id + 1, now)
            .await
            .expect("Should fetch");

        assert_eq!(
            vec![900_201, 900_205, 900_206],
            rewarding.iter().map(|config| config.id).collect::<Vec<_>>()
        );
        assert!(none.is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires a running Postgres
    async fn fetches_the_referral_reward_config() {
        let pool = setup_test_pool().await;
        let store = setup_store(pool.clone());
        let ctx = RequestContext::new();
        let expected = referral_reward_config_record(&DUMMY_REFERRAL_REWARD_CONFIG);
        let missing_app_id = 900_301;

        insert_referral_reward_config(&pool, &expected).await;
        delete_referral_reward_config(&pool, missing_app_id).await;

        let config = store
            .fetch_referral_reward_config(&ctx, expected.app_id)
            .await
            .expect("Should fetch");
        let missing = store
            .fetch_referral_reward_config(&ctx, missing_app_id)
            .await
            .expect("Should fetch");

        assert_eq!(Some(expected), config);
        assert_eq!(None, missing);
    }

    #[tokio::test]
    #[ignore] // Requires a running Postgres
    async fn cancelled_request_is_not_queried() {
        let pool = setup_test_pool().await;
        let store = setup_store(pool);
        let ctx = RequestContext::new();
        ctx.cancel();

        let result = store.fetch_app(&ctx, DUMMY_APP.id).await;

        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
