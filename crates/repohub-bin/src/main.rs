//! # RepoHub Server Binary
//!
//! Main entrypoint: loads configuration, wires the storage, cache, and event
//! drivers, and serves the REST API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use repohub_api::AppState;
use repohub_cache::{CacheStore, MemoryCache, RedisCache};
use repohub_config::{load_or_default, Config};
use repohub_core::{BreakerConfig, CircuitBreaker, RecordService, ServiceConfig, UserService};
use repohub_events::{EventPublisher, LogPublisher};
use repohub_observe::{init_logging, LogConfig, LogFormat};
use repohub_store::StorageFactory;

#[derive(Parser, Debug)]
#[command(name = "repohub")]
#[command(about = "RepoHub CRUD orchestration service", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "repohub.yaml")]
    config: String,

    /// Server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
}

fn breaker_config(config: &Config) -> BreakerConfig {
    BreakerConfig {
        failure_threshold: config.breaker.failure_threshold,
        cooldown: Duration::from_secs(config.breaker.cooldown_secs),
        reset_interval: Duration::from_secs(config.breaker.reset_interval_secs),
    }
}

async fn build_cache(config: &Config) -> Result<Arc<dyn CacheStore>> {
    match config.cache.driver.as_str() {
        "redis" => {
            let cache = RedisCache::new(&config.cache.redis_url).await?;
            tracing::info!(url = %config.cache.redis_url, "Using Redis cache");
            Ok(Arc::new(cache))
        }
        _ => {
            tracing::info!("Using in-memory cache");
            Ok(Arc::new(MemoryCache::new()))
        }
    }
}

fn build_publisher(config: &Config) -> Result<Arc<dyn EventPublisher>> {
    match config.events.driver.as_str() {
        "kafka" => {
            #[cfg(feature = "kafka")]
            {
                let publisher = repohub_events::KafkaPublisher::new(&config.events.brokers)?;
                tracing::info!(brokers = %config.events.brokers, "Using Kafka event publisher");
                Ok(Arc::new(publisher))
            }
            #[cfg(not(feature = "kafka"))]
            {
                anyhow::bail!("events driver 'kafka' requires the 'kafka' build feature")
            }
        }
        _ => {
            tracing::info!("Using log event publisher");
            Ok(Arc::new(LogPublisher::new()))
        }
    }
}

#[cfg(feature = "kafka")]
fn spawn_consumer(
    config: &Config,
) -> (tokio_util::sync::CancellationToken, tokio::task::JoinHandle<()>) {
    use repohub_events::{EventConsumer, TelegramNotifier};

    let notifier = match (&config.notify.telegram_bot_token, &config.notify.telegram_chat_id) {
        (Some(token), Some(chat_id)) => {
            tracing::info!("Telegram notifications enabled");
            Some(TelegramNotifier::new(token.clone(), chat_id.clone()))
        }
        _ => None,
    };

    let consumer = EventConsumer::new(
        config.events.brokers.clone(),
        config.events.consumer_group.clone(),
        vec!["user-events".to_string(), "repo-events".to_string()],
        notifier,
    );
    let token = consumer.shutdown_token();

    let handle = tokio::spawn(async move {
        if let Err(e) = consumer.run().await {
            tracing::error!(error = %e, "Event consumer exited with error");
        }
    });

    (token, handle)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_or_default(&args.config);

    if let Some(port) = args.port {
        config.server.port = port;
    }

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        std::process::exit(1);
    }

    let log_format: LogFormat =
        config.observability.log_format.parse().unwrap_or(LogFormat::Pretty);
    init_logging(LogConfig {
        format: log_format,
        filter: Some(config.observability.log_level.clone()),
        ..LogConfig::default()
    })?;

    tracing::info!("Starting RepoHub");

    let store = StorageFactory::from_str(
        &config.store.backend,
        config.store.connection_string.clone(),
    )
    .await?;
    tracing::info!(backend = %config.store.backend, "Storage backend ready");

    let cache = build_cache(&config).await?;
    let publisher = build_publisher(&config)?;

    let service_config = ServiceConfig {
        storage_timeout: Duration::from_millis(config.service.storage_timeout_ms),
        publish_timeout: Duration::from_millis(config.service.publish_timeout_ms),
    };

    let users = Arc::new(UserService::new(
        store.clone(),
        cache.clone(),
        publisher.clone(),
        CircuitBreaker::new("users", breaker_config(&config)),
        service_config.clone(),
    ));
    let records = Arc::new(RecordService::new(
        store.clone(),
        cache.clone(),
        publisher.clone(),
        CircuitBreaker::new("repositories", breaker_config(&config)),
        service_config,
    ));

    #[cfg(feature = "kafka")]
    let consumer = if config.events.consumer_enabled && config.events.driver == "kafka" {
        Some(spawn_consumer(&config))
    } else {
        None
    };
    #[cfg(not(feature = "kafka"))]
    if config.events.consumer_enabled {
        tracing::warn!("Consumer enabled in config but the 'kafka' feature is not compiled in");
    }

    let state = AppState { users, records, store, cache, publisher };

    repohub_api::serve(state, &config.server.host, config.server.port).await?;

    #[cfg(feature = "kafka")]
    if let Some((token, handle)) = consumer {
        token.cancel();
        let _ = handle.await;
    }

    tracing::info!("RepoHub stopped");
    Ok(())
}
