use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Active,
    Sold,
    Cancelled,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Sold => "sold",
            ListingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse_lossy(s: &str) -> Self {
        match s {
            "sold" => ListingStatus::Sold,
            "cancelled" => ListingStatus::Cancelled,
            _ => ListingStatus::Active,
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One asking-price change and the rule that caused it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceHistoryEntry {
    pub price: f64,
    pub previous_price: f64,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
    pub rule_id: Uuid,
}

/// A resale listing for an owned asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub asset_type: String,
    pub status: ListingStatus,
    pub asking_price: f64,
    pub price_history: Vec<PriceHistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    pub fn new(asset_id: Uuid, asset_type: impl Into<String>, asking_price: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            asset_id,
            asset_type: asset_type.into(),
            status: ListingStatus::Active,
            asking_price,
            price_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ListingStatus::Active
    }

    /// Set a new asking price.
    ///
    /// The only way the asking price changes: every call records exactly one
    /// history entry carrying the triggering rule.
    pub fn reprice(
        &mut self,
        price: f64,
        reason: impl Into<String>,
        rule_id: Uuid,
        at: DateTime<Utc>,
    ) -> &PriceHistoryEntry {
        let entry = PriceHistoryEntry {
            price,
            previous_price: self.asking_price,
            timestamp: at,
            reason: reason.into(),
            rule_id,
        };
        self.asking_price = price;
        self.updated_at = at;
        self.price_history.push(entry);
        &self.price_history[self.price_history.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reprice_appends_history() {
        let mut listing = Listing::new(Uuid::new_v4(), "ticket", 80.0);
        let rule_id = Uuid::new_v4();

        listing.reprice(95.0, "High demand (0.9)", rule_id, Utc::now());
        listing.reprice(90.0, "Competitive adjustment (market avg: 85.00)", rule_id, Utc::now());

        assert_eq!(listing.asking_price, 90.0);
        assert_eq!(listing.price_history.len(), 2);
        assert_eq!(listing.price_history[0].previous_price, 80.0);
        assert_eq!(listing.price_history[1].previous_price, 95.0);
        assert_eq!(listing.price_history[1].rule_id, rule_id);
    }
}
