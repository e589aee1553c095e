use std::net::SocketAddr;
use std::sync::Arc;

use bourse_api::{app, AppState};
use bourse_core::{InMemoryStore, ListingRepository, MarketDataRepository, PricingRuleRepository};
use bourse_pricing::{PricingConfig, PricingEngine};
use bourse_store::app_config::Config;
use bourse_store::{
    DbClient, EventProducer, RedisClient, StoreListingRepository, StoreMarketDataRepository,
    StorePricingRuleRepository,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct Repositories {
    rules: Arc<dyn PricingRuleRepository>,
    market: Arc<dyn MarketDataRepository>,
    listings: Arc<dyn ListingRepository>,
}

async fn repositories(config: &Config) -> anyhow::Result<Repositories> {
    match &config.database {
        Some(db) => {
            let client = DbClient::new(&db.url, db.max_connections).await?;
            client.migrate().await?;
            tracing::info!("Connected to Postgres");

            Ok(Repositories {
                rules: Arc::new(StorePricingRuleRepository::new(client.pool.clone())),
                market: Arc::new(StoreMarketDataRepository::new(client.pool.clone())),
                listings: Arc::new(StoreListingRepository::new(client.pool)),
            })
        }
        None => {
            tracing::warn!("No database configured, using the in-memory store");
            let store = Arc::new(InMemoryStore::new());

            Ok(Repositories {
                rules: store.clone(),
                market: store.clone(),
                listings: store,
            })
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bourse_api=debug,bourse_pricing=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!("Starting Bourse API on port {}", config.server.port);

    let repos = repositories(&config).await?;
    let pricing_config = PricingConfig {
        analysis_window_days: config.pricing.analysis_window_days,
        demand_weight: config.pricing.demand_weight,
        trend_tilt: config.pricing.trend_tilt,
    };
    let engine = PricingEngine::new(repos.rules.clone(), repos.market, repos.listings, pricing_config);

    let mut state = AppState::new(Arc::new(engine), repos.rules);

    if let Some(redis) = &config.redis {
        let client = RedisClient::new(&redis.url).await?;
        state = state.with_redis(Arc::new(client), config.pricing.rate_limit_per_minute);
        tracing::info!("Rate limiting at {} requests/minute", config.pricing.rate_limit_per_minute);
    }

    if let Some(kafka) = &config.kafka {
        let producer = EventProducer::new(&kafka.brokers)?;
        state = state.with_events(Arc::new(producer), kafka.repriced_topic.clone());
        tracing::info!("Publishing repriced events to {}", kafka.repriced_topic);
    }

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
