#![deny(rust_2018_idioms)]
#![deny(clippy::all)]

use std::{error::Error, sync::Arc, time::Duration};

use chrono::{TimeZone, Utc};
use clap::{crate_version, Arg, ArgMatches, Command};
use serde::Serialize;
use slog::{error, info};

use gateway::{
    cache::RedisCache,
    db::{migrations, postgres_connection, PostgresConfig, PostgresStore},
    AppService, EnvConfig, RequestContext,
};
use primitives::{
    config::configuration, util::logging::new_logger, UnitKind, GLOBAL_COUNTRY,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Command::new("Gateway")
        .version(crate_version!())
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("the config file for the gateway")
                .takes_value(true),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .short('t')
                .help("the request deadline in milliseconds")
                .takes_value(true),
        )
        .subcommand(Command::new("migrate").about("applies the database migrations"))
        .subcommand(
            Command::new("app")
                .about("looks up an app")
                .arg(Arg::new("id").required(true).takes_value(true)),
        )
        .subcommand(
            Command::new("unit")
                .about("looks up a unit by its id or by its app")
                .arg(
                    Arg::new("id")
                        .long("id")
                        .takes_value(true)
                        .conflicts_with_all(&["appId", "kind"])
                        .required_unless_present("appId"),
                )
                .arg(Arg::new("appId").long("app-id").takes_value(true))
                .arg(
                    Arg::new("kind")
                        .long("kind")
                        .help("e.g. lockscreen, benefit-feed")
                        .requires("appId")
                        .takes_value(true),
                ),
        )
        .subcommand(
            Command::new("welcome-reward")
                .about("selects the welcome reward a device can claim")
                .arg(Arg::new("unitId").required(true).takes_value(true))
                .arg(
                    Arg::new("country")
                        .long("country")
                        .help("the device country, global rewards only when omitted")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("registeredAt")
                        .long("registered-at")
                        .help("device registration time in seconds since the unix epoch")
                        .required(true)
                        .takes_value(true),
                ),
        )
        .subcommand(
            Command::new("active-welcome-rewards")
                .about("lists the active welcome rewards of a unit")
                .arg(Arg::new("unitId").required(true).takes_value(true)),
        )
        .subcommand(
            Command::new("referral-reward")
                .about("looks up the referral reward config of an app")
                .arg(Arg::new("appId").required(true).takes_value(true)),
        )
        .get_matches();

    let env_config = EnvConfig::from_env()?;
    let postgres_config = PostgresConfig::from_env()?;
    let config = configuration(env_config.env, cli.value_of("config"))?;
    let logger = new_logger("gateway");

    let (subcommand, matches) = match cli.subcommand() {
        Some(subcommand) => subcommand,
        None => return Err("a subcommand is required".into()),
    };

    if subcommand == "migrate" {
        tokio::task::spawn_blocking(move || migrations(&postgres_config)).await??;
        info!(&logger, "Migrations applied"; "main" => "migrate");

        return Ok(());
    }

    let pool = postgres_connection(&postgres_config, config.store_pool_size as usize)?;
    let redis = RedisCache::connect(env_config.redis_url.clone()).await?;
    let store = PostgresStore::new(pool, config.store_timeout(), logger.clone());
    let service =
        AppService::with_config(Arc::new(store), Arc::new(redis), &config, logger.clone());

    let ctx = match cli.value_of("timeout") {
        Some(timeout) => RequestContext::with_timeout(Duration::from_millis(timeout.parse()?)),
        None => RequestContext::new(),
    };
    let on_interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let result = run(subcommand, matches, &service, &ctx).await;

    // the runtime drops the pending cache refills on shutdown
    if let Err(err) = service.flush().await {
        error!(&logger, "Flushing the cache writes failed: {}", err; "main" => subcommand);
    }

    if let Err(err) = &result {
        error!(&logger, "{}", err; "main" => subcommand);
    }

    result
}

async fn run(
    subcommand: &str,
    matches: &ArgMatches,
    service: &AppService<PostgresStore, RedisCache>,
    ctx: &RequestContext,
) -> Result<(), Box<dyn Error>> {
    match subcommand {
        "app" => print(&service.get_app(ctx, parse_id(matches, "id")?).await?),
        "unit" => {
            let unit = match matches.value_of("id") {
                Some(id) => service.get_unit_by_id(ctx, id.parse()?).await?,
                None => {
                    let app_id = parse_id(matches, "appId")?;

                    match matches.value_of("kind") {
                        Some(kind) => {
                            let unit_kind = kind.parse::<UnitKind>()?;
                            service
                                .get_unit_by_app_id_and_kind(ctx, app_id, unit_kind)
                                .await?
                        }
                        None => service.get_unit_by_app_id(ctx, app_id).await?,
                    }
                }
            };

            print(&unit)
        }
        "welcome-reward" => {
            let unit_id = parse_id(matches, "unitId")?;
            let country = matches.value_of("country").unwrap_or(GLOBAL_COUNTRY);
            let registered_at = Utc
                .timestamp_opt(parse_id(matches, "registeredAt")?, 0)
                .single()
                .ok_or("--registered-at is out of range")?;

            print(
                &service
                    .get_rewardable_welcome_reward_config(ctx, unit_id, country, registered_at)
                    .await?,
            )
        }
        "active-welcome-rewards" => print(
            &service
                .get_active_welcome_reward_configs(ctx, parse_id(matches, "unitId")?)
                .await?,
        ),
        "referral-reward" => print(
            &service
                .get_referral_reward_config(ctx, parse_id(matches, "appId")?)
                .await?,
        ),
        unknown => Err(format!("unknown subcommand {}", unknown).into()),
    }
}

fn parse_id(matches: &ArgMatches, name: &str) -> Result<i64, Box<dyn Error>> {
    let value = matches
        .value_of(name)
        .ok_or_else(|| format!("{} is required", name))?;

    Ok(value.parse()?)
}

fn print<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);

    Ok(())
}
