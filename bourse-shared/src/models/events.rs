use uuid::Uuid;

use crate::models::listing::{Listing, PriceHistoryEntry};

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ListingRepricedEvent {
    pub listing_id: Uuid,
    pub asset_id: Uuid,
    pub asset_type: String,
    pub previous_price: f64,
    pub new_price: f64,
    pub rule_id: Uuid,
    pub reason: String,
    pub timestamp: i64,
}

impl ListingRepricedEvent {
    /// Builds the event from the listing's newest history entry.
    pub fn from_listing(listing: &Listing) -> Option<Self> {
        let entry: &PriceHistoryEntry = listing.price_history.last()?;
        Some(Self {
            listing_id: listing.id,
            asset_id: listing.asset_id,
            asset_type: listing.asset_type.clone(),
            previous_price: entry.previous_price,
            new_price: entry.price,
            rule_id: entry.rule_id,
            reason: entry.reason.clone(),
            timestamp: entry.timestamp.timestamp(),
        })
    }
}
