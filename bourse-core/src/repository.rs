use async_trait::async_trait;
use bourse_shared::{AssetOwnershipRecord, Listing, MarketSnapshot, PriceHistoryEntry, PricingRule, RuleStatus};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Repository trait for pricing rule access
#[async_trait]
pub trait PricingRuleRepository: Send + Sync {
    /// Active rules targeting `asset_type`, highest priority first, then oldest first.
    async fn list_active_rules(&self, asset_type: &str) -> RepoResult<Vec<PricingRule>>;

    /// Every rule, optionally narrowed to one asset type, in the same order.
    async fn list_rules(&self, asset_type: Option<&str>) -> RepoResult<Vec<PricingRule>>;

    async fn get_rule(&self, id: Uuid) -> RepoResult<Option<PricingRule>>;

    async fn create_rule(&self, rule: &PricingRule) -> RepoResult<Uuid>;

    /// Overwrite the editable fields. Returns false when the rule does not exist.
    async fn update_rule(&self, rule: &PricingRule) -> RepoResult<bool>;

    async fn set_rule_status(&self, id: Uuid, status: RuleStatus) -> RepoResult<bool>;

    /// Bump `usage_count` and stamp `last_triggered`.
    async fn record_rule_trigger(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<()>;
}

/// Repository trait for market aggregates and ownership records
#[async_trait]
pub trait MarketDataRepository: Send + Sync {
    async fn latest_snapshot(&self, asset_id: Uuid) -> RepoResult<Option<MarketSnapshot>>;

    /// Snapshots of the last `days` days, oldest first.
    async fn snapshot_history(&self, asset_id: Uuid, days: u32) -> RepoResult<Vec<MarketSnapshot>>;

    async fn get_ownership(&self, asset_id: Uuid) -> RepoResult<Option<AssetOwnershipRecord>>;
}

/// Repository trait for listing access
#[async_trait]
pub trait ListingRepository: Send + Sync {
    async fn get_listing(&self, id: Uuid) -> RepoResult<Option<Listing>>;

    async fn count_active_listings(&self, asset_type: &str) -> RepoResult<i64>;

    /// Asking prices of active listings of `asset_id`, minus `exclude`.
    async fn competitor_prices(&self, asset_id: Uuid, exclude: Option<Uuid>) -> RepoResult<Vec<f64>>;

    /// Persist a new asking price together with its history entry.
    async fn apply_price_change(&self, listing_id: Uuid, entry: &PriceHistoryEntry) -> RepoResult<Listing>;
}
