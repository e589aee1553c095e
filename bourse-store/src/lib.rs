pub mod app_config;
pub mod database;
pub mod events;
pub mod listing_repo;
pub mod market_repo;
pub mod redis_repo;
pub mod rule_repo;

pub use database::DbClient;
pub use events::EventProducer;
pub use listing_repo::StoreListingRepository;
pub use market_repo::StoreMarketDataRepository;
pub use redis_repo::RedisClient;
pub use rule_repo::StorePricingRuleRepository;
