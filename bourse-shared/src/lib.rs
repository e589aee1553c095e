pub mod models;

pub use models::events::ListingRepricedEvent;
pub use models::listing::{Listing, ListingStatus, PriceHistoryEntry};
pub use models::market::{AssetOwnershipRecord, MarketSnapshot, TrendDirection};
pub use models::rule::{
    ActiveHours, CompetitorConditions, DemandConditions, InventoryConditions, PricingRule,
    RuleConditions, RuleStatus, RuleType, RuleValidationError, TimeConditions,
};
