//! Service entry point: configuration, backend connections, server run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use hydra_api::bus;
use hydra_api::config;
use hydra_api::http::{AppState, HttpServer};
use hydra_api::lifecycle::Shutdown;
use hydra_api::mail::Mailer;
use hydra_api::observability::{logging, metrics};
use hydra_api::store::cache::RedisAuthCache;
use hydra_api::store::counter::RedisCounterStore;
use hydra_api::store::sql;
use hydra_api::users::PgUserRepo;

/// Boilerplate REST API service.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to the TOML configuration file. Without it, defaults plus
    /// environment overrides apply.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => config::load_from_env()?,
    };

    logging::init(&config.observability);
    tracing::info!(
        app = %config.app.name,
        environment = %config.app.environment,
        version = env!("CARGO_PKG_VERSION"),
        "hydra-api starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_exporter(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Backends: relational store, auth cache (db0), rate-limit counters (db1).
    let pool = sql::connect(&config.sql).await?;
    if config.sql.run_migrations {
        sql::migrate(&pool).await?;
    }

    let cache_conn = redis::Client::open(config.auth_cache.url.as_str())?
        .get_connection_manager()
        .await?;
    let cache = Arc::new(RedisAuthCache::new(
        cache_conn,
        Duration::from_secs(config.auth_cache.ttl_secs),
    ));

    let counter_conn = redis::Client::open(config.rate_limit.url.as_str())?
        .get_connection_manager()
        .await?;
    let counters = Arc::new(RedisCounterStore::new(counter_conn));

    // Outbound side effects: mail worker behind the event bus.
    let shutdown = Shutdown::new();
    let mailer = Mailer::from_config(&config.smtp)?;
    let (event_bus, worker) = bus::start(mailer, &shutdown);

    let users = Arc::new(PgUserRepo::new(pool, cache.clone()));
    let bind_address = config.listener.bind_address.clone();
    let state = AppState::new(config, users, cache, counters, event_bus);

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %bind_address, "Listening for connections");

    let server = HttpServer::new(state);
    server.run(listener).await?;

    // Server drained; let the event worker flush its queue.
    shutdown.trigger();
    let _ = worker.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
