use std::collections::HashMap;

use async_trait::async_trait;
use bourse_shared::{AssetOwnershipRecord, Listing, MarketSnapshot, PriceHistoryEntry, PricingRule, RuleStatus};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::repository::{ListingRepository, MarketDataRepository, PricingRuleRepository, RepoResult};
use crate::CoreError;

/// In-memory store implementing every repository trait.
///
/// Used when no database is configured and by tests. Rules keep insertion
/// order so that equal priorities resolve by creation order.
#[derive(Default)]
pub struct InMemoryStore {
    rules: RwLock<Vec<PricingRule>>,
    listings: RwLock<HashMap<Uuid, Listing>>,
    snapshots: RwLock<HashMap<Uuid, Vec<MarketSnapshot>>>,
    ownership: RwLock<HashMap<Uuid, AssetOwnershipRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_listing(&self, listing: Listing) {
        self.listings.write().await.insert(listing.id, listing);
    }

    pub async fn insert_snapshot(&self, snapshot: MarketSnapshot) {
        self.snapshots
            .write()
            .await
            .entry(snapshot.asset_id)
            .or_default()
            .push(snapshot);
    }

    pub async fn insert_ownership(&self, record: AssetOwnershipRecord) {
        self.ownership.write().await.insert(record.asset_id, record);
    }
}

fn sorted_by_priority(mut rules: Vec<PricingRule>) -> Vec<PricingRule> {
    // stable: equal priorities stay in creation order
    rules.sort_by_key(|r| std::cmp::Reverse(r.priority));
    rules
}

#[async_trait]
impl PricingRuleRepository for InMemoryStore {
    async fn list_active_rules(&self, asset_type: &str) -> RepoResult<Vec<PricingRule>> {
        let rules = self.rules.read().await;
        let matching = rules
            .iter()
            .filter(|r| r.is_active() && r.applies_to(asset_type))
            .cloned()
            .collect();
        Ok(sorted_by_priority(matching))
    }

    async fn list_rules(&self, asset_type: Option<&str>) -> RepoResult<Vec<PricingRule>> {
        let rules = self.rules.read().await;
        let matching = rules
            .iter()
            .filter(|r| asset_type.map_or(true, |t| r.applies_to(t)))
            .cloned()
            .collect();
        Ok(sorted_by_priority(matching))
    }

    async fn get_rule(&self, id: Uuid) -> RepoResult<Option<PricingRule>> {
        Ok(self.rules.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn create_rule(&self, rule: &PricingRule) -> RepoResult<Uuid> {
        let mut rules = self.rules.write().await;
        if rules.iter().any(|r| r.id == rule.id) {
            return Err(CoreError::ValidationError(format!(
                "Pricing rule {} already exists",
                rule.id
            ))
            .into());
        }
        rules.push(rule.clone());
        Ok(rule.id)
    }

    async fn update_rule(&self, rule: &PricingRule) -> RepoResult<bool> {
        let mut rules = self.rules.write().await;
        let Some(existing) = rules.iter_mut().find(|r| r.id == rule.id) else {
            return Ok(false);
        };

        // Engine-owned counters and the creation stamp survive edits
        let usage_count = existing.usage_count;
        let last_triggered = existing.last_triggered;
        let created_at = existing.created_at;

        *existing = rule.clone();
        existing.usage_count = usage_count;
        existing.last_triggered = last_triggered;
        existing.created_at = created_at;
        existing.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_rule_status(&self, id: Uuid, status: RuleStatus) -> RepoResult<bool> {
        let mut rules = self.rules.write().await;
        match rules.iter_mut().find(|r| r.id == id) {
            Some(rule) => {
                rule.status = status;
                rule.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_rule_trigger(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<()> {
        let mut rules = self.rules.write().await;
        let rule = rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| CoreError::NotFound(format!("pricing rule {}", id)))?;
        rule.usage_count += 1;
        rule.last_triggered = Some(at);
        Ok(())
    }
}

#[async_trait]
impl MarketDataRepository for InMemoryStore {
    async fn latest_snapshot(&self, asset_id: Uuid) -> RepoResult<Option<MarketSnapshot>> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots
            .get(&asset_id)
            .and_then(|s| s.iter().max_by_key(|s| s.snapshot_date))
            .cloned())
    }

    async fn snapshot_history(&self, asset_id: Uuid, days: u32) -> RepoResult<Vec<MarketSnapshot>> {
        let since = Utc::now().date_naive() - Duration::days(days as i64);
        let snapshots = self.snapshots.read().await;
        let mut history: Vec<MarketSnapshot> = snapshots
            .get(&asset_id)
            .map(|s| s.iter().filter(|s| s.snapshot_date >= since).cloned().collect())
            .unwrap_or_default();
        history.sort_by_key(|s| s.snapshot_date);
        Ok(history)
    }

    async fn get_ownership(&self, asset_id: Uuid) -> RepoResult<Option<AssetOwnershipRecord>> {
        Ok(self.ownership.read().await.get(&asset_id).cloned())
    }
}

#[async_trait]
impl ListingRepository for InMemoryStore {
    async fn get_listing(&self, id: Uuid) -> RepoResult<Option<Listing>> {
        Ok(self.listings.read().await.get(&id).cloned())
    }

    async fn count_active_listings(&self, asset_type: &str) -> RepoResult<i64> {
        let listings = self.listings.read().await;
        Ok(listings
            .values()
            .filter(|l| l.is_active() && l.asset_type == asset_type)
            .count() as i64)
    }

    async fn competitor_prices(&self, asset_id: Uuid, exclude: Option<Uuid>) -> RepoResult<Vec<f64>> {
        let listings = self.listings.read().await;
        Ok(listings
            .values()
            .filter(|l| l.is_active() && l.asset_id == asset_id && Some(l.id) != exclude)
            .map(|l| l.asking_price)
            .collect())
    }

    async fn apply_price_change(&self, listing_id: Uuid, entry: &PriceHistoryEntry) -> RepoResult<Listing> {
        let mut listings = self.listings.write().await;
        let listing = listings
            .get_mut(&listing_id)
            .ok_or_else(|| CoreError::NotFound(format!("listing {}", listing_id)))?;
        listing.reprice(entry.price, entry.reason.clone(), entry.rule_id, entry.timestamp);
        Ok(listing.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bourse_shared::{DemandConditions, RuleConditions, TrendDirection};

    fn demand_rule(name: &str, priority: i32) -> PricingRule {
        PricingRule::new(name, RuleConditions::DemandBased(DemandConditions::default()), ["ticket"])
            .with_priority(priority)
    }

    #[tokio::test]
    async fn test_active_rules_ordered_by_priority_then_creation() {
        let store = InMemoryStore::new();
        store.create_rule(&demand_rule("low", 1)).await.unwrap();
        store.create_rule(&demand_rule("first-high", 5)).await.unwrap();
        store.create_rule(&demand_rule("second-high", 5)).await.unwrap();
        store
            .create_rule(&demand_rule("inactive", 9).with_status(RuleStatus::Inactive))
            .await
            .unwrap();

        let names: Vec<String> = store
            .list_active_rules("ticket")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();

        assert_eq!(names, vec!["first-high", "second-high", "low"]);
        assert!(store.list_active_rules("voucher").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_trigger_and_update_keep_counters() {
        let store = InMemoryStore::new();
        let rule = demand_rule("surge", 3);
        store.create_rule(&rule).await.unwrap();

        let at = Utc::now();
        store.record_rule_trigger(rule.id, at).await.unwrap();
        store.record_rule_trigger(rule.id, at).await.unwrap();

        let mut edited = rule.clone();
        edited.name = "surge v2".to_string();
        assert!(store.update_rule(&edited).await.unwrap());

        let stored = store.get_rule(rule.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "surge v2");
        assert_eq!(stored.usage_count, 2);
        assert_eq!(stored.last_triggered, Some(at));
    }

    #[tokio::test]
    async fn test_latest_snapshot_and_competitors() {
        let store = InMemoryStore::new();
        let asset_id = Uuid::new_v4();
        let today = Utc::now().date_naive();

        for (offset, demand) in [(2, 0.3), (0, 0.9), (1, 0.5)] {
            store
                .insert_snapshot(MarketSnapshot {
                    asset_id,
                    asset_type: "ticket".to_string(),
                    snapshot_date: today - Duration::days(offset),
                    average_price: 100.0,
                    price_target: None,
                    demand_score: demand,
                    price_volatility: 0.1,
                    trend_direction: TrendDirection::Stable,
                    liquidity: 0.5,
                    trading_volume: 10,
                })
                .await;
        }

        let latest = store.latest_snapshot(asset_id).await.unwrap().unwrap();
        assert_eq!(latest.demand_score, 0.9);

        let history = store.snapshot_history(asset_id, 7).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].demand_score, 0.3);

        let own = Listing::new(asset_id, "ticket", 120.0);
        let other = Listing::new(asset_id, "ticket", 90.0);
        let own_id = own.id;
        store.insert_listing(own).await;
        store.insert_listing(other).await;

        let prices = store.competitor_prices(asset_id, Some(own_id)).await.unwrap();
        assert_eq!(prices, vec![90.0]);
        assert_eq!(store.count_active_listings("ticket").await.unwrap(), 2);
    }
}
