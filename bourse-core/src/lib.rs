pub mod memory;
pub mod repository;

pub use memory::InMemoryStore;
pub use repository::{ListingRepository, MarketDataRepository, PricingRuleRepository, RepoResult};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
}
