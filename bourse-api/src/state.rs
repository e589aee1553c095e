use std::sync::Arc;

use bourse_core::{InMemoryStore, PricingRuleRepository};
use bourse_pricing::{PricingConfig, PricingEngine};
use bourse_store::{EventProducer, RedisClient};

pub const DEFAULT_REPRICED_TOPIC: &str = "pricing.listing_repriced";

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PricingEngine>,
    pub rules: Arc<dyn PricingRuleRepository>,
    /// Rate limiting is off without redis
    pub redis: Option<Arc<RedisClient>>,
    pub events: Option<Arc<EventProducer>>,
    pub repriced_topic: String,
    pub rate_limit_per_minute: i64,
}

impl AppState {
    pub fn new(engine: Arc<PricingEngine>, rules: Arc<dyn PricingRuleRepository>) -> Self {
        Self {
            engine,
            rules,
            redis: None,
            events: None,
            repriced_topic: DEFAULT_REPRICED_TOPIC.to_string(),
            rate_limit_per_minute: 120,
        }
    }

    /// Engine and rule administration backed by one in-memory store
    pub fn in_memory(store: Arc<InMemoryStore>, config: PricingConfig) -> Self {
        let engine = PricingEngine::new(store.clone(), store.clone(), store.clone(), config);
        Self::new(Arc::new(engine), store)
    }

    pub fn with_redis(mut self, redis: Arc<RedisClient>, limit_per_minute: i64) -> Self {
        self.redis = Some(redis);
        self.rate_limit_per_minute = limit_per_minute;
        self
    }

    pub fn with_events(mut self, events: Arc<EventProducer>, topic: impl Into<String>) -> Self {
        self.events = Some(events);
        self.repriced_topic = topic.into();
        self
    }
}
